use crate::db::Storage;
use crate::service::broadcaster::BroadcasterHandle;
use crate::types::ws::WsMessage;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, warn};

/// Collect aggregate counts and push one `system_stats` message.
pub async fn publish_once(storage: &Storage, broadcaster: &BroadcasterHandle) {
    let counts = match storage.system_counts().await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "system stats query failed; skipping tick");
            return;
        }
    };
    let clients = match broadcaster.stats().await {
        Ok(s) => s.active,
        Err(e) => {
            warn!(error = %e, "broadcaster stats unavailable; skipping tick");
            return;
        }
    };
    if clients == 0 {
        debug!("no websocket clients; system stats not sent");
        return;
    }
    broadcaster.broadcast(WsMessage::system_stats(counts, clients));
}

/// Background task broadcasting `system_stats` every `period`.
pub fn spawn_ticker(
    storage: Storage,
    broadcaster: BroadcasterHandle,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = period.as_secs(), "System stats ticker started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick fires immediately; skip it so clients get their welcome first
        let mut ticks = IntervalStream::new(ticker).skip(1);
        while ticks.next().await.is_some() {
            publish_once(&storage, &broadcaster).await;
        }
    })
}

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info};

/// How often recovered keys are dropped from the login limiter.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Login attempts keyed by the submitted username.
pub type LoginLimiter = DefaultKeyedRateLimiter<String>;

pub fn login_limiter(attempts_per_minute: u32) -> LoginLimiter {
    let per_minute = NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::keyed(Quota::per_minute(per_minute))
}

/// Forget keys whose quota has fully recovered. Returns how many were dropped.
pub fn prune(limiter: &LoginLimiter) -> usize {
    let before = limiter.len();
    limiter.retain_recent();
    limiter.shrink_to_fit();
    before.saturating_sub(limiter.len())
}

/// Background task pruning the limiter every `period`, so usernames sprayed at the
/// login route cannot grow the key map without bound.
pub fn spawn_cleanup(limiter: Arc<LoginLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = period.as_secs(), "Login limiter cleanup started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(ticker).skip(1);
        while ticks.next().await.is_some() {
            let removed = prune(&limiter);
            if removed > 0 {
                debug!(removed, remaining = limiter.len(), "pruned login limiter keys");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_limiter() -> LoginLimiter {
        RateLimiter::keyed(Quota::with_period(Duration::from_millis(10)).unwrap())
    }

    #[tokio::test]
    async fn recovered_keys_are_dropped() {
        let limiter = fast_limiter();
        for i in 0..500 {
            let _ = limiter.check_key(&format!("user-{i}"));
        }
        assert_eq!(limiter.len(), 500);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(prune(&limiter), 500);
        assert!(limiter.is_empty());
    }

    #[test]
    fn throttled_keys_survive_pruning() {
        let limiter = login_limiter(1);
        assert!(limiter.check_key(&"alice".to_string()).is_ok());
        assert!(limiter.check_key(&"alice".to_string()).is_err());

        assert_eq!(prune(&limiter), 0);
        assert!(limiter.check_key(&"alice".to_string()).is_err());
    }

    #[tokio::test]
    async fn cleanup_task_prunes_periodically() {
        let limiter = Arc::new(fast_limiter());
        for i in 0..100 {
            let _ = limiter.check_key(&format!("user-{i}"));
        }
        let task = spawn_cleanup(limiter.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(limiter.is_empty());
        task.abort();
    }
}

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Environment keys picked up on top of the defaults.
const ENV_KEYS: &[&str] = &[
    "host",
    "port",
    "database_url",
    "loglevel",
    "jwt_secret",
    "jwt_expiry_secs",
    "cors_origins",
    "worker_key",
    "stats_interval_secs",
    "login_attempts_per_minute",
    "admin_username",
    "admin_password",
];

pub const DEFAULT_JWT_SECRET: &str = "secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub loglevel: String,
    pub jwt_secret: String,
    pub jwt_expiry_secs: u64,
    pub cors_origins: Vec<String>,
    /// Shared key presented by the detection worker when posting alerts.
    pub worker_key: Option<String>,
    /// Period of `system_stats` broadcasts; 0 disables them.
    pub stats_interval_secs: u64,
    pub login_attempts_per_minute: u32,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: "sqlite:face_detect_hub.db".to_string(),
            loglevel: "info".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiry_secs: 60 * 60 * 24 * 7,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            worker_key: None,
            stats_interval_secs: 30,
            login_attempts_per_minute: 10,
            admin_username: "admin".to_string(),
            admin_password: "secret".to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with matching environment variables (case-insensitive).
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(ENV_KEYS))
            .extract()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn jwt_expiry(&self) -> Duration {
        Duration::from_secs(self.jwt_expiry_secs)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("invalid configuration in environment"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_expectations() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.jwt_expiry(), Duration::from_secs(604_800));
        assert!(cfg.worker_key.is_none());
        assert_eq!(cfg.stats_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_interval_disables_stats() {
        let cfg = Config {
            stats_interval_secs: 0,
            ..Config::default()
        };
        assert!(cfg.stats_interval().is_none());
    }
}

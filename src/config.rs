use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub service_key: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let service_key = env_required("NOTIFIER_SERVICE_KEY")?;

        let host: IpAddr = env_or("NOTIFIER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid NOTIFIER_HOST: {e}"))?;

        let port: u16 = env_or("NOTIFIER_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid NOTIFIER_PORT: {e}"))?;

        let log_level = env_or("NOTIFIER_LOG_LEVEL", "info");

        let poll_interval_secs: u64 = env_or("NOTIFIER_POLL_INTERVAL_SECS", "1")
            .parse()
            .map_err(|e| format!("Invalid NOTIFIER_POLL_INTERVAL_SECS: {e}"))?;

        Ok(Config {
            database_url,
            service_key,
            host,
            port,
            log_level,
            poll_interval: Duration::from_secs(poll_interval_secs),
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

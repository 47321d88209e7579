use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// 定期同期の間隔（秒）
    pub sync_interval: u64,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    pub call_timeout_secs: u64,
    pub stale_syncing_secs: i64,
    pub max_queue_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// synced レコードの保持期間（日）
    pub retention_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// 到達性のポーリング間隔（ミリ秒）
    pub poll_interval_ms: u64,
    /// 遷移を確定させるまでの安定待ち時間（ミリ秒）
    pub debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/sensehub.db".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            sync: SyncConfig::default(),
            storage: StorageConfig { retention_days: 7 },
            connectivity: ConnectivityConfig {
                poll_interval_ms: 250,
                debounce_ms: 500,
            },
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: 300, // 5 minutes
            max_retries: 2,
            retry_backoff_secs: 1,
            call_timeout_secs: 15,
            stale_syncing_secs: 60,
            max_queue_len: 500,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SENSEHUB_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v;
            }
        }
        if let Ok(v) = std::env::var("SENSEHUB_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("SENSEHUB_SYNC_INTERVAL") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.sync_interval = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("SENSEHUB_MAX_QUEUE_LEN") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.max_queue_len = (value as usize).max(1);
            }
        }
        if let Ok(v) = std::env::var("SENSEHUB_RETENTION_DAYS") {
            if let Some(value) = parse_u64(&v) {
                cfg.storage.retention_days = value as i64;
            }
        }
        if let Ok(v) = std::env::var("SENSEHUB_DEBOUNCE_MS") {
            if let Some(value) = parse_u64(&v) {
                cfg.connectivity.debounce_ms = value;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.max_queue_len == 0 {
            return Err("Sync max_queue_len must be greater than 0".to_string());
        }
        if self.sync.call_timeout_secs == 0 {
            return Err("Sync call_timeout_secs must be greater than 0".to_string());
        }
        if self.connectivity.poll_interval_ms == 0 {
            return Err("Connectivity poll_interval_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.storage.retention_days, 7);
        assert_eq!(cfg.sync.max_retries, 2);
    }

    #[test]
    fn test_parse_bool_falls_back_to_default() {
        assert!(parse_bool("yes", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("garbage", true));
    }
}

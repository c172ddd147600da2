use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub messaging: MessagingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// 公開 URL の組み立てに使うベース（`{base}/{bucket}/{path}`）。
    pub public_base_url: String,
    pub event_bucket: String,
    pub avatar_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
    pub invalidation_channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub realtime_channel_capacity: usize,
    pub home_event_limit: usize,
    pub report_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database: DatabaseConfig {
                url: format!("sqlite://{}?mode=rwc", data_dir.join("sortie.db").display()),
                max_connections: 5,
            },
            storage: StorageConfig {
                data_dir,
                public_base_url: "file://sortie/storage".to_string(),
                event_bucket: "event".to_string(),
                avatar_bucket: "avatars".to_string(),
            },
            cache: CacheConfig {
                capacity: 512,
                ttl_secs: 300, // 5 minutes
                invalidation_channel_capacity: 256,
            },
            messaging: MessagingConfig {
                realtime_channel_capacity: 128,
                home_event_limit: 7,
                report_page_size: 10,
            },
            auth: AuthConfig {
                session_ttl_secs: 3600, // 1 hour
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SORTIE_DATA_DIR") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.storage.data_dir = PathBuf::from(trimmed);
                cfg.database.url = format!(
                    "sqlite://{}?mode=rwc",
                    cfg.storage.data_dir.join("sortie.db").display()
                );
            }
        }
        if let Ok(v) = std::env::var("SORTIE_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_parsed::<u32>("SORTIE_DATABASE_MAX_CONNECTIONS") {
            cfg.database.max_connections = value;
        }
        if let Ok(v) = std::env::var("SORTIE_PUBLIC_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.storage.public_base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Some(value) = env_parsed::<usize>("SORTIE_CACHE_CAPACITY") {
            cfg.cache.capacity = value;
        }
        if let Some(value) = env_parsed::<u64>("SORTIE_CACHE_TTL_SECS") {
            cfg.cache.ttl_secs = value;
        }
        if let Some(value) = env_parsed::<usize>("SORTIE_HOME_EVENT_LIMIT") {
            cfg.messaging.home_event_limit = value;
        }
        if let Some(value) = env_parsed::<usize>("SORTIE_REPORT_PAGE_SIZE") {
            cfg.messaging.report_page_size = value;
        }
        if let Some(value) = env_parsed::<usize>("SORTIE_REALTIME_CAPACITY") {
            cfg.messaging.realtime_channel_capacity = value;
        }
        if let Some(value) = env_parsed::<u64>("SORTIE_SESSION_TTL_SECS") {
            cfg.auth.session_ttl_secs = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.cache.capacity == 0 {
            return Err("Cache capacity must be greater than 0".to_string());
        }
        if self.cache.ttl_secs == 0 {
            return Err("Cache ttl_secs must be greater than 0".to_string());
        }
        if self.cache.invalidation_channel_capacity == 0 {
            return Err("Cache invalidation_channel_capacity must be greater than 0".to_string());
        }
        if self.messaging.realtime_channel_capacity == 0 {
            return Err("Messaging realtime_channel_capacity must be greater than 0".to_string());
        }
        if self.messaging.home_event_limit == 0 {
            return Err("Messaging home_event_limit must be greater than 0".to_string());
        }
        if self.messaging.report_page_size == 0 {
            return Err("Messaging report_page_size must be greater than 0".to_string());
        }
        if self.auth.session_ttl_secs == 0 {
            return Err("Auth session_ttl_secs must be greater than 0".to_string());
        }
        if self.storage.event_bucket.is_empty() || self.storage.avatar_bucket.is_empty() {
            return Err("Storage bucket names must not be empty".to_string());
        }
        Ok(())
    }

    pub fn blob_root(&self) -> PathBuf {
        self.storage.data_dir.join("blobs")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("sortie"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

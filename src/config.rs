//! Configuration types for catalog-mirror

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Remote catalog connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API; endpoint paths are appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (None = transport default, which never times out)
    #[serde(default, with = "optional_duration_serde")]
    pub timeout: Option<Duration>,

    /// Records requested per search page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: None,
            page_size: default_page_size(),
        }
    }
}

/// Pipeline pacing and behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay after each search page, success or failure (default: 5000 ms)
    #[serde(default = "default_stage_delay", with = "duration_serde")]
    pub page_delay: Duration,

    /// Delay after each product in the image stage, success or failure (default: 5000 ms)
    #[serde(default = "default_stage_delay", with = "duration_serde")]
    pub product_delay: Duration,

    /// Cap on simultaneous image downloads within one product (0 = all at once)
    #[serde(default)]
    pub max_concurrent_images: usize,

    /// Persist per-stage cursors and resume from them on the next run (default: false)
    #[serde(default)]
    pub resume: bool,

    /// Quality used when re-encoding non-JPEG payloads (1-100, default: 80)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_delay: default_stage_delay(),
            product_delay: default_stage_delay(),
            max_concurrent_images: 0,
            resume: false,
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// On-disk image tree location
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per product (default: "./images")
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./data/main.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for [`CatalogMirror`](crate::CatalogMirror)
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Pacing, concurrency and resume behaviour
    #[serde(default)]
    pub sync: SyncConfig,

    /// Image tree location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Database location
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.catalog.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL {:?}: {}", self.catalog.base_url, e),
            key: Some("catalog.base_url".to_string()),
        })?;

        if self.catalog.page_size == 0 {
            return Err(Error::Config {
                message: "page size must be at least 1".to_string(),
                key: Some("catalog.page_size".to_string()),
            });
        }

        if !(1..=100).contains(&self.sync.jpeg_quality) {
            return Err(Error::Config {
                message: format!(
                    "JPEG quality must be between 1 and 100, got {}",
                    self.sync.jpeg_quality
                ),
                key: Some("sync.jpeg_quality".to_string()),
            });
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://fbpprod.fts.at/api/v1/sht".to_string()
}

fn default_user_agent() -> String {
    concat!("catalog-mirror/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_page_size() -> u64 {
    100
}

fn default_stage_delay() -> Duration {
    Duration::from_millis(5000)
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/main.db")
}

// Durations are written as integer milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

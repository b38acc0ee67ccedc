//! # Sync Configuration
//!
//! Configuration management for the sync layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SWIFTCHECKOUT_GATEWAY_URL=https://api.example.com                  │
//! │     SWIFTCHECKOUT_DB_PATH=./checkout.db                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/swiftcheckout/sync.toml (Linux)                          │
//! │     ~/Library/Application Support/com.swiftcheckout.pos/sync.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [gateway]
//! base_url = "https://api.example.com"
//! api_key = "sk-..."
//! timeout_secs = 15
//!
//! [storage]
//! database_path = "./checkout.db"
//!
//! [sync]
//! auto_sync = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Gateway Settings
// =============================================================================

/// Configuration for the hosted sales gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL of the hosted backend (http:// or https://).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as a bearer token, when required.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    15
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Configuration for the local durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./checkout.db")
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: default_db_path(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Whether a connectivity transition to "online" schedules a sync pass
    /// automatically.
    #[serde(default = "default_true")]
    pub auto_sync: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            auto_sync: default_true(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync-layer configuration.
///
/// ## Example Config File
/// ```toml
/// [gateway]
/// base_url = "https://api.example.com"
/// timeout_secs = 15
///
/// [storage]
/// database_path = "./checkout.db"
///
/// [sync]
/// auto_sync = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Hosted gateway settings.
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Local store settings.
    #[serde(default)]
    pub storage: StorageSettings,

    /// Sync behavior settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.gateway.base_url.starts_with("http://")
            && !self.gateway.base_url.starts_with("https://")
        {
            return Err(SyncError::InvalidUrl(format!(
                "Gateway URL must start with http:// or https://, got: {}",
                self.gateway.base_url
            )));
        }
        // full parse catches malformed hosts
        url::Url::parse(&self.gateway.base_url)?;

        if self.gateway.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "gateway timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SWIFTCHECKOUT_GATEWAY_URL") {
            debug!(url = %url, "Overriding gateway URL from environment");
            self.gateway.base_url = url;
        }

        if let Ok(key) = std::env::var("SWIFTCHECKOUT_API_KEY") {
            self.gateway.api_key = Some(key);
        }

        if let Ok(path) = std::env::var("SWIFTCHECKOUT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = PathBuf::from(path);
        }

        if let Ok(auto) = std::env::var("SWIFTCHECKOUT_AUTO_SYNC") {
            match auto.to_lowercase().as_str() {
                "1" | "true" | "on" => self.sync.auto_sync = true,
                "0" | "false" | "off" => self.sync.auto_sync = false,
                other => warn!(value = %other, "Unknown SWIFTCHECKOUT_AUTO_SYNC value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "swiftcheckout", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }
}

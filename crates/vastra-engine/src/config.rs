//! # Engine Configuration
//!
//! Settings for the database, the barcode encoder and invoice defaults.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     VASTRA_DB_PATH=/srv/vastra/vastra.db                               │
//! │     VASTRA_CIPHER_MARKER=cipher                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/vastra/vastra.toml (Linux)                               │
//! │     ~/Library/Application Support/com.vastra.vastra/vastra.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # vastra.toml
//! [database]
//! path = "/srv/vastra/vastra.db"
//! max_connections = 5
//! min_connections = 1
//! busy_timeout_ms = 5000
//! run_migrations = true
//!
//! [barcode]
//! placeholder = "NA"
//! cipher_vendor_marker = "cipher"
//!
//! [tax]
//! default_freight_rate = "five"   # five | eighteen
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use vastra_core::barcode::BarcodeEncoder;
use vastra_core::cipher::CostCipher;
use vastra_core::{FreightRate, InvoiceAdjustments, DEFAULT_BARCODE_PLACEHOLDER, DEFAULT_CIPHER_VENDOR_MARKER};
use vastra_db::DbConfig;

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Where the database lives and how the pool behaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first connect.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long a save waits for another save's write lock (milliseconds).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "vastra", "vastra")
        .map(|dirs| dirs.data_dir().join("vastra.db"))
        .unwrap_or_else(|| PathBuf::from("vastra.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
            run_migrations: default_true(),
        }
    }
}

// =============================================================================
// Barcode Settings
// =============================================================================

/// Label composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarcodeSettings {
    /// Token printed for a missing group or vendor code.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Vendors whose name contains this (any case) get a ciphered cost.
    #[serde(default = "default_cipher_marker")]
    pub cipher_vendor_marker: String,
}

fn default_placeholder() -> String {
    DEFAULT_BARCODE_PLACEHOLDER.to_string()
}

fn default_cipher_marker() -> String {
    DEFAULT_CIPHER_VENDOR_MARKER.to_string()
}

impl Default for BarcodeSettings {
    fn default() -> Self {
        BarcodeSettings {
            placeholder: default_placeholder(),
            cipher_vendor_marker: default_cipher_marker(),
        }
    }
}

// =============================================================================
// Tax Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Freight slab prefilled on new invoices.
    #[serde(default)]
    pub default_freight_rate: FreightRate,
}

// =============================================================================
// Engine Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub barcode: BarcodeSettings,

    #[serde(default)]
    pub tax: TaxSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (vastra.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
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

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        if self.barcode.placeholder.trim().is_empty() {
            return Err(ConfigError::Invalid("barcode.placeholder must not be empty".into()));
        }
        if self.barcode.cipher_vendor_marker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "barcode.cipher_vendor_marker must not be empty".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `VASTRA_*` overrides from `lookup`. Unparseable numbers are
    /// logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("VASTRA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("VASTRA_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid VASTRA_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(ms) = lookup("VASTRA_DB_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid VASTRA_DB_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(placeholder) = lookup("VASTRA_BARCODE_PLACEHOLDER") {
            self.barcode.placeholder = placeholder;
        }

        if let Some(marker) = lookup("VASTRA_CIPHER_MARKER") {
            self.barcode.cipher_vendor_marker = marker;
        }

        if let Some(rate) = lookup("VASTRA_FREIGHT_RATE") {
            match rate.parse::<FreightRate>() {
                Ok(parsed) => self.tax.default_freight_rate = parsed,
                Err(e) => warn!(error = %e, "Ignoring invalid VASTRA_FREIGHT_RATE"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vastra", "vastra")
            .map(|dirs| dirs.config_dir().join("vastra.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database pool settings.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .run_migrations(self.database.run_migrations)
    }

    /// Barcode encoder built from `[barcode]`.
    pub fn encoder(&self) -> BarcodeEncoder {
        BarcodeEncoder::new(
            CostCipher::new(&self.barcode.cipher_vendor_marker),
            self.barcode.placeholder.clone(),
        )
    }

    /// Adjustments a new invoice starts from.
    pub fn default_adjustments(&self) -> InvoiceAdjustments {
        InvoiceAdjustments {
            freight_rate: self.tax.default_freight_rate,
            ..InvoiceAdjustments::default()
        }
    }
}

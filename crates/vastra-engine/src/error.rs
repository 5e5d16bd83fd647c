//! # Engine Error Types
//!
//! What callers of the engine see when something goes wrong.
//!
//! ## Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    InvoiceError                                         │
//! │                                                                         │
//! │  Validation   bad input, nothing touched         fix input, resubmit   │
//! │  Conflict     stock moved / no batch to reduce   reload, resubmit      │
//! │  Persistence  storage failed, tx rolled back     retry may succeed     │
//! │                                                                         │
//! │  Every failure after validation aborts the whole transaction, so a     │
//! │  retry never doubles a quantity.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use vastra_core::{CoreError, ValidationError};
use vastra_db::DbError;

// =============================================================================
// Invoice Error
// =============================================================================

/// Failure of an invoice save or a catalog write.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Input rejected before any mutation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A stock write could not be applied.
    ///
    /// ## When This Occurs
    /// - Negative delta for a SKU with no active batch
    /// - Batch version moved between read and conditional update
    #[error("Stock conflict: {0}")]
    Conflict(String),

    /// Storage failure. The transaction was rolled back.
    #[error("Persistence failed: {0}")]
    Persistence(DbError),
}

pub type InvoiceResult<T> = Result<T, InvoiceError>;

impl From<DbError> for InvoiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict { entity, id } => {
                InvoiceError::Conflict(format!("{} {} changed concurrently", entity, id))
            }
            err if err.is_unique_on("sku_fingerprint") => {
                InvoiceError::Conflict("another active batch was created for the same SKU".into())
            }
            DbError::UniqueViolation { field, value } => {
                InvoiceError::Validation(ValidationError::Duplicate { field, value })
            }
            DbError::ForeignKeyViolation { message } => {
                InvoiceError::Validation(ValidationError::InvalidFormat {
                    field: "reference".to_string(),
                    reason: message,
                })
            }
            other => InvoiceError::Persistence(other),
        }
    }
}

impl From<CoreError> for InvoiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::StockConflict { .. } => InvoiceError::Conflict(err.to_string()),
            CoreError::InvalidCostString { value, found } => {
                InvoiceError::Validation(ValidationError::InvalidFormat {
                    field: "cost_per_item".to_string(),
                    reason: format!("'{}' contains '{}'", value, found),
                })
            }
            CoreError::Validation(v) => InvoiceError::Validation(v),
        }
    }
}

impl From<sqlx::Error> for InvoiceError {
    fn from(err: sqlx::Error) -> Self {
        InvoiceError::from(DbError::from(err))
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl InvoiceError {
    /// Returns true if resubmitting the same invoice may succeed.
    ///
    /// ## Retryable
    /// - Conflicts (the next attempt reads fresh batch versions)
    /// - Lock waits that ran out, pool exhaustion, dropped connections
    ///
    /// ## Not Retryable
    /// - Validation failures
    /// - Missing rows, corrupt data, migrations
    pub fn is_retryable(&self) -> bool {
        match self {
            InvoiceError::Validation(_) => false,
            InvoiceError::Conflict(_) => true,
            InvoiceError::Persistence(db) => match db {
                DbError::PoolExhausted | DbError::ConnectionFailed(_) => true,
                DbError::QueryFailed(msg) => msg.contains("locked") || msg.contains("busy"),
                _ => false,
            },
        }
    }

    /// Offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            InvoiceError::Validation(v) => Some(v.field()),
            _ => None,
        }
    }

    /// Message safe to show an operator.
    ///
    /// Storage details are logged, not shown.
    pub fn user_message(&self) -> String {
        match self {
            InvoiceError::Validation(v) => v.to_string(),
            InvoiceError::Conflict(_) => {
                "Stock changed while saving. Reload the invoice and try again.".to_string()
            }
            InvoiceError::Persistence(e) => {
                tracing::error!(error = %e, "Invoice persistence failed");
                "The invoice could not be saved. Please try again.".to_string()
            }
        }
    }
}

// =============================================================================
// Config Error
// =============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation.
    #[error("Invalid engine configuration: {0}")]
    Invalid(String),

    /// Reading or parsing the config file failed.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Writing the config file failed.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

//! # Error Types
//!
//! Domain-specific error types for vastra-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vastra-core errors (this file)                                        │
//! │  ├── CoreError        - Reconciliation / cipher failures               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  vastra-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  vastra-engine errors                                                  │
//! │  └── InvoiceError     - Validation / Conflict / Persistence            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → InvoiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A negative delta targets a SKU that has no active batch.
    ///
    /// ## When This Occurs
    /// ```text
    /// Invoice edit: design D-101 / M reduced from 5 to 2
    ///      │
    ///      ▼
    /// delta = -3, look up active batch for the SKU
    ///      │
    ///      ▼
    /// No batch (deactivated, or stock never recorded)
    ///      │
    ///      ▼
    /// StockConflict { sku: "D-101/...", delta: -3 }
    /// ```
    #[error("Cannot apply delta {delta} to {sku}: no active batch")]
    StockConflict { sku: String, delta: i64 },

    /// A cost string contains a character outside the cipher alphabet.
    #[error("Invalid cost string '{value}': unexpected character '{found}'")]
    InvalidCostString { value: String, found: char },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any stock is touched. Every variant names the offending
/// field so the caller can re-prompt for just that input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., design registered twice for a vendor).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

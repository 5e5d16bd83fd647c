//! # vastra-db: Database Layer for Vastra
//!
//! SQLite storage for batches, purchase invoices, master data and the
//! barcode alias sequence, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vastra Data Flow                                 │
//! │                                                                         │
//! │  InvoiceService::save (vastra-engine)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vastra-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ BatchRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceRepo   │    │ 001_initial  │  │   │
//! │  │   │ Transactions  │    │ SequenceRepo  │    │  _schema.sql │  │   │
//! │  │   │               │    │ MasterRepo    │    │              │  │   │
//! │  │   │               │    │ AuditLogRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vastra_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/vastra.db")).await?;
//! let batch = db.batches().get_by_alias("00001234").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::{AuditEntry, AuditLogRepository};
pub use repository::batch::BatchRepository;
pub use repository::invoice::{InvoiceItemRecord, InvoiceRecord, InvoiceRepository, StoredInvoice};
pub use repository::master::MasterDataRepository;
pub use repository::sequence::SequenceRepository;

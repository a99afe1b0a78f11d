//! # pos-db: Database Layer for the Retail POS
//!
//! SQLite storage via sqlx, plus the one piece of business machinery that
//! cannot live in pos-core because it *is* a storage transaction: the
//! checkout engine.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Catalog (products) ──reads──► Cart (pos-core, per session)     │
//! │        ▲                            │                           │
//! │        │ atomic decrement           │ at checkout time only     │
//! │        │                            ▼                           │
//! │  ┌─────┴────────────────────────────────────┐                   │
//! │  │   CheckoutEngine::commit (ONE sqlx tx)   │                   │
//! │  │   re-validate → insert transaction       │                   │
//! │  │   → insert sale lines → decrement stock  │                   │
//! │  │   all-or-nothing                         │                   │
//! │  └─────┬────────────────────────────────────┘                   │
//! │        │ committed rows only                                    │
//! │        ▼                                                        │
//! │  LedgerReader (read-only reports, never sees cart state)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories (product, user, transaction)
//! - [`checkout`] - The atomic cart-to-transaction commit
//! - [`ledger`] - Read-only reporting queries and chart aggregation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pos.db")).await?;
//! let receipt = db
//!     .checkout()
//!     .commit(&mut cart, &cashier_id, PaymentMethod::Cash)
//!     .await?;
//! ```

pub mod checkout;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use checkout::{CheckoutEngine, Receipt, ReceiptLine};
pub use error::{DbError, DbResult};
pub use ledger::{ChartData, ChartType, LedgerReader, ReportFilter, ReportSummary, SaleFact};
pub use pool::{Database, DbConfig};

pub use repository::product::{ProductRepository, ProductStats};
pub use repository::transaction::{CashierDaySummary, TransactionRepository};
pub use repository::user::{UserRepository, UserStats};

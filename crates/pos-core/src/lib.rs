//! # pos-core: Pure Business Logic for the Retail POS
//!
//! This crate is the heart of the POS. It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Presentation layer (forms, templates, JSON endpoints)          │
//! │        │ consumes serializable types, performs role gating      │
//! │  ┌─────▼───────────────────────────────────────────────────┐    │
//! │  │              ★ pos-core (THIS CRATE) ★                  │    │
//! │  │                                                         │    │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌─────────┐ ┌──────┐ │    │
//! │  │  │ money  │ │ types  │ │  cart  │ │validation│ │access│ │    │
//! │  │  └────────┘ └────────┘ └────────┘ └─────────┘ └──────┘ │    │
//! │  │                                                         │    │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS     │    │
//! │  └─────┬───────────────────────────────────────────────────┘    │
//! │        │                                                        │
//! │  ┌─────▼───────────────────────────────────────────────────┐    │
//! │  │  pos-db: SQLite repositories, checkout engine, ledger   │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, always
//! 2. **Integer Money**: all monetary values are cents (i64), never floats
//! 3. **Explicit Errors**: all errors are typed enums, never strings or panics
//! 4. **Cart is a value**: the session cart is an explicit value object
//!    passed into operations, never ambient global state
//!
//! ## Example
//!
//! ```rust
//! use pos_core::money::Money;
//! use pos_core::VAT_RATE;
//!
//! let subtotal = Money::from_cents(3897); // R38.97
//! let vat = subtotal.vat(VAT_RATE);
//! assert_eq!(vat.cents(), 585); // R5.85, rounded half-up from R5.8455
//! assert_eq!((subtotal + vat).cents(), 4482); // R44.82
//! ```

pub mod access;
pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use access::Actor;
pub use cart::{Cart, CartLine, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, VatRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// The single flat VAT rate applied to every sale: 15%, in basis points.
///
/// Multi-rate and multi-currency tax regimes are out of scope; this is a
/// system-wide constant rather than a per-product setting.
pub const VAT_RATE: VatRate = VatRate::from_bps(1500);

/// Stock level below which a product is flagged as low stock.
///
/// Used for alerting only, never for blocking sales. A configuration
/// option of the system, not a per-product setting.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Maximum distinct lines allowed in a single cart.
///
/// Prevents runaway carts and keeps transactions a reasonable size.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in a cart.
///
/// Prevents accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

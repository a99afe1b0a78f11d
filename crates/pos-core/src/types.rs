//! # Domain Types
//!
//! Core domain types shared across the POS.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 — immutable surrogate key, used for relations
//! - Business key where one exists (`Product::code`, `User::email`) —
//!   human-readable and enforced unique
//!
//! ## Immutability
//! `Transaction` and `SaleLine` are historical records: once the checkout
//! engine commits them they are never edited. `SaleLine` carries the unit
//! price captured at sale time, deliberately decoupled from the product's
//! current price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::LOW_STOCK_THRESHOLD;

// =============================================================================
// Role
// =============================================================================

/// The closed set of roles supplied by the identity provider.
///
/// The core trusts a `(user_id, role)` pair per request; role comparison
/// is an enum match, never a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Catalog and user management, reporting.
    Admin,
    /// Cart and checkout (cashier).
    Staff,
}

// =============================================================================
// User
// =============================================================================

/// A staff member or administrator.
///
/// Authentication itself (password verification, sessions) is the identity
/// provider's concern; this record only stores what it hands us.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Opaque hash produced by the identity provider. Never logged.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Surrogate key (UUID v4).
    pub id: String,

    /// Business key, unique across the catalog (e.g. "COCOLA-500").
    pub code: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Category used for reporting breakdowns.
    pub category: String,

    /// Unit price in cents. Non-negative.
    pub price_cents: i64,

    /// Current stock level. Invariant: never negative — enforced by every
    /// mutator, not by a post-hoc check.
    pub stock_quantity: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the stock level is below the alert threshold.
    ///
    /// Alerting only — a low-stock product can still be sold down to zero.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity < LOW_STOCK_THRESHOLD
    }

    /// Advisory availability check used by the cart. The checkout engine
    /// re-validates against current stock inside its own transaction.
    #[inline]
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Recorded as a label only — no gateway involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    /// Parses the label the presentation layer submits.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Committed by the checkout engine. The only status it ever writes.
    Completed,
    /// Reserved for a future reversal workflow. No transition to this
    /// status is implemented; stock-restoration semantics are unspecified.
    Voided,
}

// =============================================================================
// Transaction
// =============================================================================

/// An immutable financial record produced by one successful checkout.
///
/// Invariants (also asserted in tests):
/// - `grand_total_cents == subtotal_cents + vat_cents` exactly
/// - `subtotal_cents == Σ line_total_cents` over its sale lines
/// - `vat_cents == round(subtotal × 15%)` in cents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,

    /// The cashier who rang up the sale. A historical reference, not
    /// ownership — deleting the user must never delete the transaction.
    pub cashier_id: String,

    pub subtotal_cents: i64,
    pub vat_cents: i64,
    pub grand_total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn vat(&self) -> Money {
        Money::from_cents(self.vat_cents)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One product's contribution to a committed transaction.
///
/// Owned by exactly one transaction (cascade-deleted with it). The unit
/// price is frozen at sale time for historical fidelity; later product
/// price changes never touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents. Stored, and re-derivable.
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            code: "COCOLA-500".to_string(),
            name: "Coca-Cola 500ml".to_string(),
            category: "Beverages".to_string(),
            price_cents: 1299,
            stock_quantity: stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_threshold() {
        assert!(product(0).is_low_stock());
        assert!(product(9).is_low_stock());
        assert!(!product(10).is_low_stock());
        assert!(!product(25).is_low_stock());
    }

    #[test]
    fn test_can_supply() {
        let p = product(4);
        assert!(p.can_supply(4));
        assert!(!p.can_supply(5));
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("cash"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("Card "), Some(PaymentMethod::Card));
        assert_eq!(PaymentMethod::parse("cheque"), None);
        assert_eq!(PaymentMethod::parse(""), None);
    }
}

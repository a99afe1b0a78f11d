//! # Cart
//!
//! The per-session shopping cart: a mutable value object holding
//! distinct-by-product lines with price snapshots.
//!
//! ## Session Semantics
//! A cart belongs to exactly one staff session. It never touches
//! persistent storage; if the session is lost the cart is reconstructed
//! empty. That loss is accepted semantics, not a bug.
//!
//! ## Advisory vs Authoritative Validation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  add / set_quantity                                             │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  advisory stock check against the Product the caller fetched    │
//! │  (fast feedback for the cashier; stock may change afterwards)   │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  CheckoutEngine::commit                                         │
//! │  authoritative re-check inside the storage transaction          │
//! │  (the only check that counts — concurrent cashiers exist)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::validate_quantity;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY, VAT_RATE};

// =============================================================================
// Cart Line
// =============================================================================

/// One distinct product in the cart.
///
/// Captures the unit price and low-stock flag at the moment of adding.
/// A price change in the catalog after this point does not alter an
/// in-progress sale — price stability for the sale's duration is
/// intentional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    /// Business code at time of adding (frozen).
    pub code: String,
    /// Product name at time of adding (frozen).
    pub name: String,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Low-stock flag snapshot, for cashier-side badges only.
    pub low_stock: bool,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            code: product.code.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            low_stock: product.is_low_stock(),
            added_at: Utc::now(),
        }
    }

    /// Line total in cents: unit price × quantity.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents())
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Computed totals for the current cart contents.
///
/// Always recomputed from the lines, never cached across mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal_cents: i64,
    pub vat_cents: i64,
    pub grand_total_cents: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// The session cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Every line quantity is ≥ 1 and within the advisory stock limit at
///   the time of the mutation
/// - At most `MAX_CART_LINES` distinct lines
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// The current lines, in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Adds a product to the cart, merging into an existing line.
    ///
    /// ## Validation (advisory)
    /// - quantity must be 1..=MAX_LINE_QUANTITY
    /// - merged quantity must not exceed the product's current stock
    ///
    /// On failure the cart is left unchanged.
    pub fn add(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_line_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let merged = line.quantity + quantity;
            validate_line_quantity(merged)?;
            if !product.can_supply(merged) {
                return Err(CoreError::InsufficientStock {
                    code: product.code.clone(),
                    available: product.stock_quantity,
                    requested: merged,
                });
            }
            line.quantity = merged;
            return Ok(());
        }

        if !product.can_supply(quantity) {
            return Err(CoreError::InsufficientStock {
                code: product.code.clone(),
                available: product.stock_quantity,
                requested: quantity,
            });
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Replaces a line's quantity after the same advisory validation.
    ///
    /// Fails with `LineNotFound` if the product has no line in the cart.
    /// The captured unit price is kept — only the quantity changes.
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_line_quantity(quantity)?;

        if !product.can_supply(quantity) {
            return Err(CoreError::InsufficientStock {
                code: product.code.clone(),
                available: product.stock_quantity,
                requested: quantity,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product.id)
            .ok_or_else(|| CoreError::LineNotFound {
                product_id: product.id.clone(),
            })?;

        line.quantity = quantity;
        Ok(())
    }

    /// Removes a product's line. Idempotent: removing a product that is
    /// not in the cart is a no-op, not an error.
    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Empties the cart unconditionally.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Computes subtotal, VAT, and grand total from the current lines.
    ///
    /// Pure function of the lines using each line's captured unit price;
    /// recomputed on every call so it can never go stale.
    pub fn totals(&self) -> CartTotals {
        let subtotal: i64 = self.lines.iter().map(|l| l.line_total_cents()).sum();
        let subtotal = Money::from_cents(subtotal);
        let vat = subtotal.vat(VAT_RATE);
        let grand_total = subtotal + vat;

        CartTotals {
            subtotal_cents: subtotal.cents(),
            vat_cents: vat.cents(),
            grand_total_cents: grand_total.cents(),
        }
    }
}

/// The range rule itself lives in [`crate::validation::validate_quantity`];
/// cart callers see it as `InvalidQuantity`, which carries the bounds.
fn validate_line_quantity(quantity: i64) -> CoreResult<()> {
    validate_quantity(quantity).map_err(|_| CoreError::InvalidQuantity {
        requested: quantity,
        max: MAX_LINE_QUANTITY,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            code: format!("CODE-{id}"),
            name: format!("Product {id}"),
            category: "Test".to_string(),
            price_cents,
            stock_quantity: stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_captures_price_snapshot() {
        let mut cart = Cart::new();
        let p = product("1", 1299, 25);

        cart.add(&p, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].unit_price_cents, 1299);
        assert_eq!(cart.lines()[0].line_total_cents(), 3897);
    }

    #[test]
    fn test_add_same_product_merges_lines() {
        let mut cart = Cart::new();
        let p = product("1", 999, 50);

        cart.add(&p, 2).unwrap();
        cart.add(&p, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_add_rejects_insufficient_stock_immediately() {
        let mut cart = Cart::new();
        let p = product("1", 999, 4);

        let err = cart.add(&p, 5).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                code: "CODE-1".to_string(),
                available: 4,
                requested: 5,
            }
        );
        // cart unchanged
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_cannot_exceed_stock() {
        let mut cart = Cart::new();
        let p = product("1", 999, 5);

        cart.add(&p, 3).unwrap();
        // 3 + 3 = 6 > stock 5
        assert!(matches!(
            cart.add(&p, 3),
            Err(CoreError::InsufficientStock { requested: 6, .. })
        ));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_add_rejects_nonpositive_quantity() {
        let mut cart = Cart::new();
        let p = product("1", 999, 10);

        assert!(matches!(
            cart.add(&p, 0),
            Err(CoreError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            cart.add(&p, -2),
            Err(CoreError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_quantity_rule_matches_validator() {
        // The cart and the standalone validator must accept and reject
        // exactly the same quantities.
        for qty in [-1, 0, 1, 2, MAX_LINE_QUANTITY, MAX_LINE_QUANTITY + 1] {
            let mut cart = Cart::new();
            let p = product("1", 100, 100_000);
            assert_eq!(
                cart.add(&p, qty).is_ok(),
                validate_quantity(qty).is_ok(),
                "cart and validator disagree on quantity {qty}"
            );
        }
    }

    #[test]
    fn test_set_quantity_replaces_after_validation() {
        let mut cart = Cart::new();
        let p = product("1", 999, 10);

        cart.add(&p, 2).unwrap();
        cart.set_quantity(&p, 7).unwrap();
        assert_eq!(cart.total_quantity(), 7);

        // stock 10, request 11
        assert!(matches!(
            cart.set_quantity(&p, 11),
            Err(CoreError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn test_set_quantity_missing_line() {
        let mut cart = Cart::new();
        let p = product("1", 999, 10);

        assert!(matches!(
            cart.set_quantity(&p, 1),
            Err(CoreError::LineNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = Cart::new();
        let p = product("1", 999, 10);

        cart.add(&p, 2).unwrap();
        cart.remove("not-in-cart");
        assert_eq!(cart.line_count(), 1);

        cart.remove(&p.id);
        assert!(cart.is_empty());

        // second remove is a no-op
        cart.remove(&p.id);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_standard_sale() {
        // Product(code="COCOLA-500", price=12.99, stock=25), quantity 3:
        // subtotal 38.97, vat 5.85 (rounded from 5.8455), grand 44.82
        let mut cart = Cart::new();
        let p = product("1", 1299, 25);

        cart.add(&p, 3).unwrap();
        let totals = cart.totals();

        assert_eq!(totals.subtotal_cents, 3897);
        assert_eq!(totals.vat_cents, 585);
        assert_eq!(totals.grand_total_cents, 4482);
    }

    #[test]
    fn test_totals_recomputed_after_mutation() {
        let mut cart = Cart::new();
        let a = product("1", 1000, 50);
        let b = product("2", 250, 50);

        cart.add(&a, 1).unwrap();
        cart.add(&b, 2).unwrap();
        assert_eq!(cart.totals().subtotal_cents, 1500);

        cart.remove("2");
        assert_eq!(cart.totals().subtotal_cents, 1000);

        cart.clear();
        assert_eq!(cart.totals().subtotal_cents, 0);
        assert_eq!(cart.totals().grand_total_cents, 0);
    }
}

//! # Product Repository
//!
//! Catalog operations: search, CRUD, restock, and the conditional stock
//! decrement the checkout engine commits with.
//!
//! ## Stock Mutation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read-then-write (lost update under concurrency)      │
//! │     let stock = SELECT stock_quantity ...;                      │
//! │     UPDATE products SET stock_quantity = {stock - n} ...;       │
//! │                                                                 │
//! │  ✅ CORRECT: conditional single-statement decrement             │
//! │     UPDATE products                                             │
//! │     SET stock_quantity = stock_quantity - ?n                    │
//! │     WHERE id = ?id AND stock_quantity >= ?n                     │
//! │     -- then check rows_affected                                 │
//! │                                                                 │
//! │  Two cashiers racing for the last units: the database           │
//! │  serializes the updates and exactly one passes the guard.       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pos_core::validation::{
    validate_category, validate_price_cents, validate_product_code, validate_product_name,
    validate_restock_amount, validate_search_query,
};
use pos_core::{CoreError, Product, LOW_STOCK_THRESHOLD};

const PRODUCT_COLUMNS: &str =
    "id, code, name, category, price_cents, stock_quantity, created_at, updated_at";

/// Catalog statistics for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStats {
    pub total_products: i64,
    pub low_stock_products: i64,
    /// Σ(price × stock) over the catalog, in cents.
    pub total_stock_value_cents: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches products by case-insensitive substring over name and code.
    ///
    /// An empty query returns the full catalog ordered by name. No side
    /// effects; results carry current stock for the cart's advisory checks.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query).map_err(CoreError::from)?;

        debug!(query = %query, "Searching products");

        if query.is_empty() {
            return self.list_all().await;
        }

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name LIKE '%' || ?1 || '%' COLLATE NOCASE \
                OR code LIKE '%' || ?1 || '%' COLLATE NOCASE \
             ORDER BY name"
        ))
        .bind(&query)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists the full catalog ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its surrogate id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Creates a new product.
    ///
    /// Validates the inputs, rejects a duplicate code, and returns the
    /// stored record. The UNIQUE index remains as a backstop for races
    /// between the pre-check and the insert.
    pub async fn create(
        &self,
        code: &str,
        name: &str,
        category: &str,
        price_cents: i64,
        stock_quantity: i64,
    ) -> DbResult<Product> {
        // Trim once so the duplicate pre-check and the insert agree on
        // the stored value.
        let code = code.trim();
        validate_product_code(code).map_err(CoreError::from)?;
        validate_product_name(name).map_err(CoreError::from)?;
        validate_category(category).map_err(CoreError::from)?;
        validate_price_cents(price_cents).map_err(CoreError::from)?;
        if stock_quantity < 0 {
            return Err(CoreError::InvalidAmount {
                amount: stock_quantity,
            }
            .into());
        }

        if self.get_by_code(code).await?.is_some() {
            return Err(DbError::duplicate("product code", code));
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.trim().to_string(),
            category: category.trim().to_string(),
            price_cents,
            stock_quantity,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            "INSERT INTO products (id, code, name, category, price_cents, stock_quantity, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Updates a product's editable attributes.
    ///
    /// A duplicate code check excludes the product itself, so saving an
    /// edit form without changing the code is not a collision.
    pub async fn update(
        &self,
        id: &str,
        code: &str,
        name: &str,
        category: &str,
        price_cents: i64,
        stock_quantity: i64,
    ) -> DbResult<Product> {
        let code = code.trim();
        validate_product_code(code).map_err(CoreError::from)?;
        validate_product_name(name).map_err(CoreError::from)?;
        validate_category(category).map_err(CoreError::from)?;
        validate_price_cents(price_cents).map_err(CoreError::from)?;
        if stock_quantity < 0 {
            return Err(CoreError::InvalidAmount {
                amount: stock_quantity,
            }
            .into());
        }

        if let Some(existing) = self.get_by_code(code).await? {
            if existing.id != id {
                return Err(DbError::duplicate("product code", code));
            }
        }

        let now = Utc::now();

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            "UPDATE products SET code = ?2, name = ?3, category = ?4, \
             price_cents = ?5, stock_quantity = ?6, updated_at = ?7 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(code)
        .bind(name.trim())
        .bind(category.trim())
        .bind(price_cents)
        .bind(stock_quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Increases a product's stock level. Single-statement increment;
    /// returns the new stock level.
    ///
    /// Fails with InvalidAmount if `amount <= 0`.
    pub async fn restock(&self, id: &str, amount: i64) -> DbResult<i64> {
        validate_restock_amount(amount).map_err(CoreError::from)?;

        let now = Utc::now();

        debug!(id = %id, amount = %amount, "Restocking product");

        let new_level: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET stock_quantity = stock_quantity + ?2, updated_at = ?3 \
             WHERE id = ?1 \
             RETURNING stock_quantity",
        )
        .bind(id)
        .bind(amount)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        new_level.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Conditionally decrements stock inside the checkout transaction.
    ///
    /// Returns `false` when the guard `stock_quantity >= amount` rejects
    /// the row — the caller must then abort the whole commit. Crate-private
    /// so nothing outside the checkout engine can decrement stock.
    pub(crate) async fn decrement_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - ?1, updated_at = ?2 \
             WHERE id = ?3 AND stock_quantity >= ?1",
        )
        .bind(amount)
        .bind(now)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a product.
    ///
    /// Rejected while historical sales reference the product: sale lines
    /// are immutable financial records and must keep a valid reference.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let referencing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE product_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referencing > 0 {
            return Err(DbError::still_referenced("Product", id));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, "Deleted product");
        Ok(())
    }

    /// Catalog statistics for the admin dashboard.
    pub async fn stats(&self) -> DbResult<ProductStats> {
        let (total_products, low_stock_products, total_stock_value_cents): (i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), \
                        COALESCE(SUM(stock_quantity < ?1), 0), \
                        COALESCE(SUM(price_cents * stock_quantity), 0) \
                 FROM products",
            )
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_one(&self.pool)
            .await?;

        Ok(ProductStats {
            total_products,
            low_stock_products,
            total_stock_value_cents,
        })
    }

    /// Distinct categories, for report filter dropdowns.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

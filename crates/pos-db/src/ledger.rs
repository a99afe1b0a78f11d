//! # Ledger Reader
//!
//! Read-only reporting over the committed transaction ledger.
//!
//! Everything here is a pure read: filters narrow the window, aggregation
//! summarizes it, and the chart builders bucket it for display. Nothing
//! in this module ever writes.
//!
//! ## Filter Combination
//! All filter dimensions AND together. The category filter selects
//! transactions that contain at least one sale line in that category
//! (via EXISTS), not individual lines, so a filtered transaction's
//! totals remain its full totals.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use pos_core::Transaction;

// =============================================================================
// Filter
// =============================================================================

/// Reporting window and dimensions. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cashier_id: Option<String>,
    pub category: Option<String>,
}

impl ReportFilter {
    /// A filter covering `[start, end)` with no other dimensions.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        ReportFilter {
            start,
            end,
            cashier_id: None,
            category: None,
        }
    }

    /// Narrows to one cashier's sales.
    pub fn cashier(mut self, cashier_id: impl Into<String>) -> Self {
        self.cashier_id = Some(cashier_id.into());
        self
    }

    /// Narrows to transactions containing at least one line in the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Headline figures for the filtered window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_revenue_cents: i64,
    pub total_vat_cents: i64,
    pub total_items: i64,
    pub transaction_count: i64,
}

/// One sale line denormalized with its transaction time and product
/// attributes, the unit every chart buckets from.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaleFact {
    pub sold_at: DateTime<Utc>,
    pub category: String,
    pub product_name: String,
    pub quantity: i64,
    pub line_total_cents: i64,
}

/// The chart shapes the reporting screen offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// Revenue per day across the window.
    Daily,
    /// Revenue per category.
    Category,
    /// Top products by units sold.
    Products,
}

impl ChartType {
    /// Parses the label the presentation layer submits.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(ChartType::Daily),
            "category" => Some(ChartType::Category),
            "products" => Some(ChartType::Products),
            _ => None,
        }
    }
}

/// Labelled series ready for the presentation layer to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub title: String,
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

// =============================================================================
// Ledger Reader
// =============================================================================

const TRANSACTION_COLUMNS: &str = "t.id, t.cashier_id, t.subtotal_cents, t.vat_cents, \
     t.grand_total_cents, t.payment_method, t.status, t.created_at";

/// Read-only queries over committed transactions.
#[derive(Debug, Clone)]
pub struct LedgerReader {
    pool: SqlitePool,
}

impl LedgerReader {
    /// Creates a new LedgerReader.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerReader { pool }
    }

    /// Transactions matching the filter, oldest first.
    pub async fn transactions(&self, filter: &ReportFilter) -> DbResult<Vec<Transaction>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t \
             WHERE t.status = 'completed' AND t.created_at >= "
        ));
        qb.push_bind(filter.start);
        qb.push(" AND t.created_at < ");
        qb.push_bind(filter.end);

        if let Some(cashier_id) = &filter.cashier_id {
            qb.push(" AND t.cashier_id = ");
            qb.push_bind(cashier_id);
        }
        if let Some(category) = &filter.category {
            qb.push(
                " AND EXISTS (SELECT 1 FROM sales s JOIN products p ON p.id = s.product_id \
                 WHERE s.transaction_id = t.id AND p.category = ",
            );
            qb.push_bind(category);
            qb.push(")");
        }

        qb.push(" ORDER BY t.created_at, t.id");

        let rows = qb.build_query_as::<Transaction>().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Ledger query returned transactions");
        Ok(rows)
    }

    /// Denormalized sale lines for the filtered window, oldest first.
    pub async fn sale_facts(&self, filter: &ReportFilter) -> DbResult<Vec<SaleFact>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT t.created_at AS sold_at, p.category, p.name AS product_name, \
             s.quantity, s.line_total_cents \
             FROM sales s \
             JOIN transactions t ON t.id = s.transaction_id \
             JOIN products p ON p.id = s.product_id \
             WHERE t.status = 'completed' AND t.created_at >= ",
        );
        qb.push_bind(filter.start);
        qb.push(" AND t.created_at < ");
        qb.push_bind(filter.end);

        if let Some(cashier_id) = &filter.cashier_id {
            qb.push(" AND t.cashier_id = ");
            qb.push_bind(cashier_id);
        }
        if let Some(category) = &filter.category {
            qb.push(" AND p.category = ");
            qb.push_bind(category);
        }

        qb.push(" ORDER BY t.created_at, s.id");

        let rows = qb.build_query_as::<SaleFact>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Headline figures for the filtered window.
    ///
    /// Computed from the same two queries the detail views use, so the
    /// numbers on screen always reconcile with the rows below them.
    pub async fn summary(&self, filter: &ReportFilter) -> DbResult<ReportSummary> {
        let transactions = self.transactions(filter).await?;
        let facts = self.sale_facts(filter).await?;

        Ok(ReportSummary {
            total_revenue_cents: transactions.iter().map(|t| t.grand_total_cents).sum(),
            total_vat_cents: transactions.iter().map(|t| t.vat_cents).sum(),
            total_items: facts.iter().map(|f| f.quantity).sum(),
            transaction_count: transactions.len() as i64,
        })
    }

    /// Builds the requested chart over the filtered window.
    pub async fn chart(&self, filter: &ReportFilter, chart: ChartType) -> DbResult<ChartData> {
        match chart {
            ChartType::Daily => {
                let transactions = self.transactions(filter).await?;
                Ok(bucket_daily(&transactions))
            }
            ChartType::Category => {
                let facts = self.sale_facts(filter).await?;
                Ok(bucket_categories(&facts))
            }
            ChartType::Products => {
                let facts = self.sale_facts(filter).await?;
                Ok(bucket_top_products(&facts))
            }
        }
    }
}

// =============================================================================
// Bucketing
// =============================================================================

/// How many products the top-sellers chart shows.
const TOP_PRODUCTS: usize = 10;

/// Revenue per calendar day (UTC). Days with no sales are absent, not zero.
fn bucket_daily(transactions: &[Transaction]) -> ChartData {
    let mut days: BTreeMap<String, i64> = BTreeMap::new();
    for t in transactions {
        *days.entry(t.created_at.date_naive().to_string()).or_insert(0) +=
            t.grand_total_cents;
    }

    let (labels, data) = days.into_iter().unzip();
    ChartData {
        title: "Daily revenue".to_string(),
        labels,
        data,
    }
}

/// Revenue per category, alphabetical.
fn bucket_categories(facts: &[SaleFact]) -> ChartData {
    let mut categories: BTreeMap<String, i64> = BTreeMap::new();
    for f in facts {
        *categories.entry(f.category.clone()).or_insert(0) += f.line_total_cents;
    }

    let (labels, data) = categories.into_iter().unzip();
    ChartData {
        title: "Revenue by category".to_string(),
        labels,
        data,
    }
}

/// Top products by units sold, descending, capped at [`TOP_PRODUCTS`].
/// Ties break alphabetically so the chart is stable across refreshes.
fn bucket_top_products(facts: &[SaleFact]) -> ChartData {
    let mut products: BTreeMap<String, i64> = BTreeMap::new();
    for f in facts {
        *products.entry(f.product_name.clone()).or_insert(0) += f.quantity;
    }

    let mut ranked: Vec<(String, i64)> = products.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_PRODUCTS);

    let (labels, data) = ranked.into_iter().unzip();
    ChartData {
        title: "Top products by units sold".to_string(),
        labels,
        data,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use pos_core::{Cart, PaymentMethod, Role};

    fn fact(category: &str, product: &str, quantity: i64, total: i64) -> SaleFact {
        SaleFact {
            sold_at: Utc::now(),
            category: category.to_string(),
            product_name: product.to_string(),
            quantity,
            line_total_cents: total,
        }
    }

    #[test]
    fn test_bucket_categories_sums_per_category() {
        let facts = vec![
            fact("Beverages", "Cola", 2, 2598),
            fact("Snacks", "Chips", 1, 899),
            fact("Beverages", "Pepsi", 3, 2997),
        ];

        let chart = bucket_categories(&facts);
        assert_eq!(chart.labels, vec!["Beverages", "Snacks"]);
        assert_eq!(chart.data, vec![2598 + 2997, 899]);
    }

    #[test]
    fn test_bucket_top_products_ranks_and_caps() {
        let mut facts = Vec::new();
        for i in 0..12 {
            facts.push(fact("Misc", &format!("Product {i:02}"), i + 1, 100));
        }
        // An extra sale pushes Product 00 from last place to first.
        facts.push(fact("Misc", "Product 00", 50, 100));

        let chart = bucket_top_products(&facts);
        assert_eq!(chart.labels.len(), 10);
        assert_eq!(chart.labels[0], "Product 00");
        assert_eq!(chart.data[0], 51);
    }

    #[test]
    fn test_bucket_daily_groups_by_date() {
        let day1 = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 3, 11, 14, 30, 0).unwrap();
        let make = |at: DateTime<Utc>, total: i64| Transaction {
            id: format!("t-{total}"),
            cashier_id: "c1".to_string(),
            subtotal_cents: total,
            vat_cents: 0,
            grand_total_cents: total,
            payment_method: PaymentMethod::Cash,
            status: pos_core::TransactionStatus::Completed,
            created_at: at,
        };

        let chart = bucket_daily(&[
            make(day1, 1000),
            make(day1 + Duration::hours(2), 500),
            make(day2, 2000),
        ]);

        assert_eq!(chart.labels, vec!["2026-03-10", "2026-03-11"]);
        assert_eq!(chart.data, vec![1500, 2000]);
    }

    #[test]
    fn test_chart_type_parse() {
        assert_eq!(ChartType::parse("daily"), Some(ChartType::Daily));
        assert_eq!(ChartType::parse(" Category "), Some(ChartType::Category));
        assert_eq!(ChartType::parse("pie"), None);
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Seeds two sales by two cashiers across two categories.
    async fn seed_ledger(db: &Database) -> (String, String) {
        let c1 = db
            .users()
            .create("Thandi", "thandi@example.com", "hash", Role::Staff)
            .await
            .unwrap()
            .id;
        let c2 = db
            .users()
            .create("Sipho", "sipho@example.com", "hash", Role::Staff)
            .await
            .unwrap()
            .id;

        let cola = db
            .products()
            .create("COCOLA-500", "Coca-Cola 500ml", "Beverages", 1299, 50)
            .await
            .unwrap();
        let chips = db
            .products()
            .create("CHIPS-120", "Salted Chips 120g", "Snacks", 899, 50)
            .await
            .unwrap();

        let mut cart = Cart::new();
        cart.add(&cola, 3).unwrap();
        db.checkout()
            .commit(&mut cart, &c1, PaymentMethod::Cash)
            .await
            .unwrap();

        let mut cart = Cart::new();
        cart.add(&chips, 2).unwrap();
        db.checkout()
            .commit(&mut cart, &c2, PaymentMethod::Card)
            .await
            .unwrap();

        (c1, c2)
    }

    fn window() -> ReportFilter {
        let now = Utc::now();
        ReportFilter::new(now - Duration::hours(1), now + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_summary_over_window() {
        let db = test_db().await;
        seed_ledger(&db).await;

        let summary = db.ledger().summary(&window()).await.unwrap();
        assert_eq!(summary.transaction_count, 2);
        assert_eq!(summary.total_items, 5);
        // 3 × 1299 = 3897 + 585 VAT; 2 × 899 = 1798 + 270 VAT
        assert_eq!(summary.total_revenue_cents, 4482 + 2068);
    }

    #[tokio::test]
    async fn test_cashier_filter() {
        let db = test_db().await;
        let (c1, _) = seed_ledger(&db).await;

        let summary = db.ledger().summary(&window().cashier(c1)).await.unwrap();
        assert_eq!(summary.transaction_count, 1);
        assert_eq!(summary.total_revenue_cents, 4482);
    }

    #[tokio::test]
    async fn test_category_filter_selects_whole_transactions() {
        let db = test_db().await;
        seed_ledger(&db).await;

        let transactions = db
            .ledger()
            .transactions(&window().category("Snacks"))
            .await
            .unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].grand_total_cents, 2068);
    }

    #[tokio::test]
    async fn test_empty_window() {
        let db = test_db().await;
        seed_ledger(&db).await;

        let past = ReportFilter::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
        );
        let summary = db.ledger().summary(&past).await.unwrap();
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.total_revenue_cents, 0);

        let chart = db.ledger().chart(&past, ChartType::Daily).await.unwrap();
        assert!(chart.labels.is_empty());
    }
}

//! # Seed Data Generator
//!
//! Populates a fresh database with default users and a starter catalog
//! for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p pos-db --bin seed
//!
//! # Specify database path
//! cargo run -p pos-db --bin seed -- --db ./data/pos.db
//! ```
//!
//! Creates two accounts (an administrator and a cashier — the password
//! hashes here are development placeholders, not real credentials) and a
//! catalog spread across categories with varied stock levels, including
//! a few below the low-stock threshold so the dashboard has something to
//! alert on.

use std::env;

use pos_core::Role;
use pos_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Starter catalog: (code, name, category, price in cents, stock).
const CATALOG: &[(&str, &str, &str, i64, i64)] = &[
    ("COCOLA-500", "Coca-Cola 500ml", "Beverages", 1299, 48),
    ("PEPSI-330", "Pepsi 330ml", "Beverages", 999, 36),
    ("SPRITE-500", "Sprite 500ml", "Beverages", 1250, 24),
    ("WATER-1L", "Still Water 1L", "Beverages", 850, 60),
    ("OJUICE-1L", "Orange Juice 1L", "Beverages", 2499, 18),
    ("CHIPS-120", "Salted Chips 120g", "Snacks", 899, 40),
    ("NACHOS-150", "Nacho Chips 150g", "Snacks", 1199, 30),
    ("CHOC-80", "Milk Chocolate 80g", "Snacks", 1549, 25),
    ("BISCUIT-200", "Tea Biscuits 200g", "Snacks", 1099, 8),
    ("PEANUT-250", "Roasted Peanuts 250g", "Snacks", 1899, 15),
    ("MILK-2L", "Full Cream Milk 2L", "Dairy", 2999, 20),
    ("YOGURT-500", "Plain Yoghurt 500ml", "Dairy", 2249, 12),
    ("CHEESE-400", "Cheddar Cheese 400g", "Dairy", 6499, 9),
    ("BUTTER-500", "Salted Butter 500g", "Dairy", 5299, 14),
    ("BREAD-W", "White Bread Loaf", "Bakery", 1799, 22),
    ("BREAD-B", "Brown Bread Loaf", "Bakery", 1899, 16),
    ("ROLLS-6", "Bread Rolls 6-Pack", "Bakery", 1599, 10),
    ("MUFFIN-4", "Bran Muffins 4-Pack", "Bakery", 2899, 6),
    ("RICE-2KG", "Long Grain Rice 2kg", "Grocery", 4599, 28),
    ("PASTA-500", "Spaghetti 500g", "Grocery", 1999, 34),
    ("SUGAR-1KG", "White Sugar 1kg", "Grocery", 2399, 26),
    ("FLOUR-1KG", "Cake Flour 1kg", "Grocery", 2199, 19),
    ("TEA-100", "Rooibos Tea 100 Bags", "Grocery", 3999, 11),
    ("COFFEE-250", "Ground Coffee 250g", "Grocery", 6999, 7),
    ("SOAP-BAR", "Bath Soap Bar", "Household", 1299, 45),
    ("DISHLIQ-750", "Dishwashing Liquid 750ml", "Household", 2799, 21),
    ("TPAPER-9", "Toilet Paper 9-Pack", "Household", 6499, 13),
    ("MATCHES-10", "Safety Matches 10-Pack", "Household", 899, 3),
];

/// Default accounts: (name, email, placeholder hash, role).
const USERS: &[(&str, &str, &str, Role)] = &[
    (
        "Administrator",
        "admin@store.local",
        "$dev$not-a-real-hash$admin",
        Role::Admin,
    ),
    (
        "Cashier",
        "cashier@store.local",
        "$dev$not-a-real-hash$cashier",
        Role::Staff,
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./pos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./pos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("POS Seed Data Generator");
    println!("=======================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let stats = db.products().stats().await?;
    if stats.total_products > 0 {
        println!("⚠ Database already has {} products", stats.total_products);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating default users...");
    for (name, email, hash, role) in USERS {
        match db.users().create(name, email, hash, *role).await {
            Ok(user) => println!("  ✓ {} ({:?})", user.email, user.role),
            Err(e) => eprintln!("  ✗ {}: {}", email, e),
        }
    }

    println!();
    println!("Creating catalog...");
    let mut created = 0;
    for (code, name, category, price_cents, stock) in CATALOG {
        match db
            .products()
            .create(code, name, category, *price_cents, *stock)
            .await
        {
            Ok(_) => created += 1,
            Err(e) => eprintln!("  ✗ {}: {}", code, e),
        }
    }
    println!("  ✓ Created {} products", created);

    let stats = db.products().stats().await?;
    println!();
    println!("✓ Seed complete!");
    println!("  Products: {}", stats.total_products);
    println!("  Low stock: {}", stats.low_stock_products);
    println!(
        "  Stock value: R{}.{:02}",
        stats.total_stock_value_cents / 100,
        stats.total_stock_value_cents % 100
    );

    Ok(())
}

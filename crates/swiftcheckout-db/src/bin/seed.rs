//! # Seed Data Generator
//!
//! Populates the local store with cached products and inventory for
//! development, so the register can be exercised fully offline.
//!
//! ## Usage
//! ```bash
//! # Seed 200 products for store 1 (defaults)
//! cargo run -p swiftcheckout-db --bin seed
//!
//! # Custom amount and store
//! cargo run -p swiftcheckout-db --bin seed -- --count 500 --store 7
//!
//! # Specify database path
//! cargo run -p swiftcheckout-db --bin seed -- --db ./data/checkout.db
//! ```
//!
//! ## Generated Data
//! Each product gets:
//! - A stable id: `{CATEGORY}-{INDEX}`
//! - 1-4 serialized device identifiers (`SN{...}`) with size labels
//! - Price: $49.99 - $1299.99 in cents
//! - A matching inventory row with available quantity = device count

use chrono::Utc;
use std::env;
use swiftcheckout_core::types::{CachedInventory, CachedProduct};
use swiftcheckout_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG=debug` for full query tracing; sqlx is noisy at info.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swiftcheckout=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Product families for realistic serialized-goods test data.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "PHN",
        &[
            "Galaxy A15", "Galaxy S24", "Pixel 8", "Pixel 8a", "iPhone 13",
            "iPhone 15", "Redmi Note 13", "Moto G84", "Nokia G42", "OnePlus 12R",
        ],
    ),
    (
        "TAB",
        &[
            "iPad 10th Gen", "iPad Air", "Galaxy Tab A9", "Galaxy Tab S9",
            "Lenovo Tab M10", "Fire HD 10",
        ],
    ),
    (
        "WBL",
        &[
            "Galaxy Watch 6", "Apple Watch SE", "Fitbit Charge 6",
            "Garmin Venu 3", "Amazfit GTS 4",
        ],
    ),
    (
        "ACC",
        &[
            "USB-C Charger 25W", "Lightning Cable", "Clear Case", "Screen Guard",
            "Car Mount", "Power Bank 10000", "BT Earbuds", "BT Speaker",
        ],
    ),
];

/// Storage size labels attached to serialized units.
const SIZES: &[&str] = &["64GB", "128GB", "256GB", "512GB"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut store_id: i64 = 1;
    let mut db_path = String::from("./checkout_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--store" | "-s" => {
                if i + 1 < args.len() {
                    store_id = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("SwiftCheckout Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -s, --store <ID>   Store id to seed (default: 1)");
                println!("  -d, --db <PATH>    Database file path (default: ./checkout_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 SwiftCheckout Seed Data Generator");
    println!("====================================");
    println!("Database: {}", db_path);
    println!("Store:    {}", store_id);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count_for_store(store_id).await?;
    if existing > 0 {
        println!("⚠ Store {} already has {} cached products", store_id, existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut products = Vec::new();
    let mut inventories = Vec::new();
    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (family_idx, (family_code, names)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for variant in 0..8 {
                if generated >= count {
                    break 'outer;
                }

                let seed = family_idx * 1000 + name_idx * 10 + variant;
                let (product, inventory) =
                    generate_product(family_code, name, store_id, seed);
                products.push(product);
                inventories.push(inventory);
                generated += 1;
            }
        }
    }

    db.products().cache_products(&products).await?;
    db.inventories().cache_inventories(&inventories).await?;

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    // Verify barcode resolution against a known device id
    if let Some(sample) = products.iter().find(|p| !p.device_ids.is_empty()) {
        let code = &sample.device_ids[0];
        let hit = db.products().get_by_barcode(code, store_id).await?;
        println!();
        println!("Verifying barcode lookup...");
        println!(
            "  Scan '{}': {}",
            code,
            hit.map(|p| p.name).unwrap_or_else(|| "NO MATCH".to_string())
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates one cached product with serialized units plus its inventory row.
fn generate_product(
    family: &str,
    name: &str,
    store_id: i64,
    seed: usize,
) -> (CachedProduct, CachedInventory) {
    let now = Utc::now();
    let id = format!("{}-{:04}", family, seed);

    // 1-4 serialized units per product
    let unit_count = 1 + seed % 4;
    let device_ids: Vec<String> = (0..unit_count)
        .map(|u| format!("SN{:05}{:02}", seed, u))
        .collect();
    let device_sizes: Vec<String> = (0..unit_count)
        .map(|u| SIZES[(seed + u) % SIZES.len()].to_string())
        .collect();

    // Price: $49.99 - $1299.99
    let price_cents = 4999 + ((seed * 331) % 125_000) as i64;
    let cost_cents = Some(price_cents * (60 + (seed % 20) as i64) / 100);

    let product = CachedProduct {
        id: id.clone(),
        store_id,
        name: name.to_string(),
        device_ids,
        device_sizes,
        price_cents,
        cost_cents,
        cached_at: now,
    };

    let inventory = CachedInventory {
        product_id: id,
        store_id,
        available_qty: unit_count as i64,
        total_sold: 0,
        cached_at: now,
    };

    (product, inventory)
}

use anyhow::Result;
use rusqlite::Connection;
use std::env;
use std::path::{Path, PathBuf};

// Use library instead of local modules
use cardforge::{import_csv, load_table, BinTable, CardGenerator, GenerateOptions, UNKNOWN};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => run_import(&args[2..])?,
        Some("lookup") => run_lookup(&args[2..])?,
        Some("generate") => run_generate(&args[2..])?,
        _ => print_usage(),
    }

    Ok(())
}

fn print_usage() {
    println!("💳 Cardforge - BIN lookup & test card generation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Usage:");
    println!("  cardforge import <dataset.csv> [db]   Import the BIN dataset");
    println!("  cardforge lookup <bin>                Look up a BIN prefix");
    println!("  cardforge generate <bin> [count]      Generate test cards");
    println!();
    println!("Database path defaults to ./cardforge.db (override: CARDFORGE_DB)");
}

/// Database path: CLI arg > CARDFORGE_DB > ./cardforge.db
fn db_path(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| env::var("CARDFORGE_DB").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("cardforge.db"))
}

fn open_table(db: &Path) -> Result<BinTable> {
    if !db.exists() {
        eprintln!("❌ Database not found at {:?}", db);
        eprintln!("   Run: cardforge import <dataset.csv>");
        eprintln!("   to import the BIN dataset first.");
        std::process::exit(1);
    }

    let conn = Connection::open(db)?;
    load_table(&conn)
}

fn run_import(args: &[String]) -> Result<()> {
    println!("🗄️  BIN Dataset Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let csv = match args.first() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("❌ Missing dataset path");
            eprintln!("   Usage: cardforge import <dataset.csv> [db]");
            std::process::exit(1);
        }
    };
    let db = db_path(args.get(1));

    // 1. Load + clean CSV, insert in one transaction
    println!("\n📂 Importing {:?}...", csv);
    let (parsed, inserted) = import_csv(&csv, &db)?;
    println!("✓ Parsed {} unique BIN records", parsed);
    println!("✓ Inserted {} new rows into {:?}", inserted, db);
    if inserted < parsed {
        println!("✓ Already present: {}", parsed - inserted);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Import complete!");

    Ok(())
}

fn run_lookup(args: &[String]) -> Result<()> {
    let prefix = match args.first() {
        Some(prefix) => prefix,
        None => {
            eprintln!("❌ Missing BIN prefix");
            eprintln!("   Usage: cardforge lookup <bin>");
            std::process::exit(1);
        }
    };

    let table = open_table(&db_path(args.get(1)))?;
    println!("🔍 Looking up {} ({} records loaded)", prefix, table.len());

    match table.lookup(prefix) {
        Ok(Some(record)) => {
            println!("\n✓ Match: {}", record.bin_display());
            println!("   Brand:    {}", record.brand.as_str());
            println!("   Type:     {}", record.card_type.as_str());
            println!("   Category: {}", record.category);
            println!("   Issuer:   {}", record.issuer);
            println!(
                "   Country:  {} ({})",
                record.country, record.country_code
            );
            println!("   Currency: {}", record.currency);
            if record.bank_phone != UNKNOWN {
                println!("   Phone:    {}", record.bank_phone);
            }
            if record.bank_url != UNKNOWN {
                println!("   URL:      {}", record.bank_url);
            }
        }
        Ok(None) => {
            println!("\n○ No match in the dataset (not an error)");
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_generate(args: &[String]) -> Result<()> {
    let bin = match args.first() {
        Some(bin) => bin,
        None => {
            eprintln!("❌ Missing BIN prefix");
            eprintln!("   Usage: cardforge generate <bin> [count]");
            std::process::exit(1);
        }
    };
    let count: usize = match args.get(1).map(|c| c.parse()).transpose() {
        Ok(count) => count.unwrap_or(1),
        Err(_) => {
            eprintln!("❌ Count must be a number");
            std::process::exit(1);
        }
    };

    let table = open_table(&db_path(args.get(2)))?;
    let generator = CardGenerator::new(&table);

    println!("🎲 Generating {} card(s) for BIN {}...", count, bin);

    match generator.generate_many(bin, count, &GenerateOptions::default()) {
        Ok(cards) => {
            for card in &cards {
                println!("\n💳 {}", card.formatted_number());
                if let (Some(month), Some(year)) = (card.expiry_month, card.expiry_year) {
                    println!("   📅 Expiry: {:02}/{}", month, year);
                }
                if let Some(cvv) = &card.cvv {
                    println!("   🔐 CVV:    {}", cvv);
                }
                println!(
                    "   🏦 {} / {} / {}",
                    card.brand, card.card_type, card.country
                );
                if !card.bin_matched {
                    println!("   ⚠️  BIN not in dataset - UNKNOWN metadata");
                }
            }
            println!("\n✅ {} card(s) generated, all Luhn-valid", cards.len());
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// 🗄️ BIN Dataset Store - CSV → SQLite + WAL, reload into the in-memory table
//
// The storage format is an implementation convenience, not a contract: the
// core only ever sees a fully built BinTable. SQLite keeps re-imports cheap
// and lets operators block BINs without editing the dataset CSV.

use crate::record::{normalize_field, BinRecord, CardBrand, CardType};
use crate::table::{key_string, normalize_prefix, BinTable};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // BIN data table (one row per range; exact BINs have bin_start == bin_end)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS bin_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bin_start INTEGER NOT NULL,
            bin_end INTEGER NOT NULL,
            brand TEXT NOT NULL,
            card_type TEXT NOT NULL,
            category TEXT NOT NULL,
            issuer TEXT NOT NULL,
            country TEXT NOT NULL,
            country_code TEXT NOT NULL,
            currency TEXT NOT NULL,
            bank_phone TEXT NOT NULL,
            bank_url TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(bin_start, bin_end)
        )",
        [],
    )?;

    // ==========================================================================
    // Operator-blocked BINs (6-digit prefix + reason)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS blocked_bins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bin TEXT UNIQUE NOT NULL,
            reason TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bin_data_start ON bin_data(bin_start)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bin_data_brand ON bin_data(brand)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bin_data_country ON bin_data(country)",
        [],
    )?;

    Ok(())
}

/// Insert records inside one transaction; duplicates (same range) are
/// ignored. Returns how many rows were actually inserted.
pub fn insert_records(conn: &mut Connection, records: &[BinRecord]) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut inserted = 0usize;

    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO bin_data (
                bin_start, bin_end, brand, card_type, category, issuer,
                country, country_code, currency, bank_phone, bank_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;

        for record in records {
            inserted += stmt.execute(params![
                record.bin_start,
                record.bin_end,
                record.brand.as_str(),
                record.card_type.as_str(),
                record.category,
                record.issuer,
                record.country,
                record.country_code,
                record.currency,
                record.bank_phone,
                record.bank_url,
            ])?;
        }
    }

    tx.commit()?;
    Ok(inserted)
}

/// Read every record back, in key order
pub fn load_records(conn: &Connection) -> Result<Vec<BinRecord>> {
    let mut stmt = conn.prepare(
        "SELECT bin_start, bin_end, brand, card_type, category, issuer,
                country, country_code, currency, bank_phone, bank_url
         FROM bin_data ORDER BY bin_start, bin_end",
    )?;

    let rows = stmt.query_map([], |row| {
        let brand: String = row.get(2)?;
        let card_type: String = row.get(3)?;

        let mut record = BinRecord::ranged(row.get(0)?, row.get(1)?);
        record.brand = CardBrand::parse(&brand);
        record.card_type = CardType::parse(&card_type);
        record.category = normalize_field(&row.get::<_, String>(4)?);
        record.issuer = normalize_field(&row.get::<_, String>(5)?);
        record.country = normalize_field(&row.get::<_, String>(6)?);
        record.country_code = normalize_field(&row.get::<_, String>(7)?);
        record.currency = normalize_field(&row.get::<_, String>(8)?);
        record.bank_phone = normalize_field(&row.get::<_, String>(9)?);
        record.bank_url = normalize_field(&row.get::<_, String>(10)?);
        Ok(record)
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Persist an operator block
pub fn insert_blocked(conn: &Connection, prefix: &str, reason: &str) -> Result<()> {
    let key = normalize_prefix(prefix)?;
    conn.execute(
        "INSERT OR REPLACE INTO blocked_bins (bin, reason) VALUES (?1, ?2)",
        params![key_string(key), reason],
    )?;
    Ok(())
}

/// Build the runtime table: records + persisted blocks (defaults included)
pub fn load_table(conn: &Connection) -> Result<BinTable> {
    let records = load_records(conn)?;
    let mut table = BinTable::from_records(records)?;

    let mut stmt = conn.prepare("SELECT bin, reason FROM blocked_bins")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (bin, reason) = row?;
        table.block(&bin, &reason)?;
    }

    Ok(table)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM bin_data", [], |row| row.get(0))?;
    Ok(count)
}

/// Full import pipeline: dataset CSV → SQLite. Returns (parsed, inserted).
pub fn import_csv(csv_path: &Path, db_path: &Path) -> Result<(usize, usize)> {
    let table = BinTable::load_csv(csv_path)
        .with_context(|| format!("Failed to load dataset from {:?}", csv_path))?;

    let mut conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {:?}", db_path))?;
    setup_database(&conn)?;

    let parsed = table.len();
    let inserted = insert_records(&mut conn, table.records())?;
    Ok((parsed, inserted))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UNKNOWN;

    fn fixture_records() -> Vec<BinRecord> {
        let mut visa = BinRecord::ranged(400000, 400999);
        visa.brand = CardBrand::Visa;
        visa.card_type = CardType::Credit;
        visa.country = "USA".to_string();
        visa.issuer = "CHASE".to_string();

        let mut amex = BinRecord::exact(374245);
        amex.brand = CardBrand::AmericanExpress;

        vec![visa, amex]
    }

    #[test]
    fn test_round_trip() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let inserted = insert_records(&mut conn, &fixture_records()).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(verify_count(&conn).unwrap(), 2);

        let records = load_records(&conn).unwrap();
        assert_eq!(records.len(), 2);

        let amex = &records[0]; // ordered by bin_start
        assert_eq!(amex.bin_start, 374245);
        assert_eq!(amex.brand, CardBrand::AmericanExpress);
        assert_eq!(amex.issuer, UNKNOWN);

        let visa = &records[1];
        assert_eq!((visa.bin_start, visa.bin_end), (400000, 400999));
        assert_eq!(visa.brand, CardBrand::Visa);
        assert_eq!(visa.card_type, CardType::Credit);
        assert_eq!(visa.country, "USA");
    }

    #[test]
    fn test_duplicate_ranges_ignored() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        insert_records(&mut conn, &fixture_records()).unwrap();
        let inserted = insert_records(&mut conn, &fixture_records()).unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(verify_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_load_table_with_blocks() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        insert_records(&mut conn, &fixture_records()).unwrap();
        insert_blocked(&conn, "400123", "issuer opt-out").unwrap();

        let table = load_table(&conn).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.lookup("400050").unwrap().is_some());
        assert_eq!(
            table.blocked_reason("400123").unwrap(),
            Some("issuer opt-out")
        );
        // Built-in test-BIN blocks survive the reload path too
        assert!(table.blocked_reason("411111").unwrap().is_some());
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();
        assert_eq!(verify_count(&conn).unwrap(), 0);
    }
}

// 🗂️ BIN Table - In-memory range table with containment lookup
//
// The table is an explicit, injected value: built once (CSV or SQLite),
// read-only afterwards, safe to share across request handlers behind an Arc.
// No module-level singleton.

use crate::error::{CardError, Result};
use crate::record::{normalize_field, BinRecord, CardBrand, CardType, CsvBinRow, KEY_WIDTH, UNKNOWN};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Published test BINs every payment sandbox documents - blocked for
/// generation by default, same list the original service shipped with.
const DEFAULT_BLOCKED_BINS: &[&str] = &[
    "411111", "555555", "378282", "378734", "371449", "601111", "630495",
    "630490", "360000", "305693", "385200", "601100", "353011", "356600",
];

const BLOCKED_DEFAULT_REASON: &str = "published test BIN";

/// Search result cap (mirrors the API's le=100 bound)
pub const SEARCH_LIMIT_MAX: usize = 100;
pub const SEARCH_LIMIT_DEFAULT: usize = 50;

// ============================================================================
// PREFIX NORMALIZATION
// ============================================================================

/// Normalize a lookup prefix to the table's 6-digit numeric key.
///
/// Accepts 4-8 ASCII digits. Longer prefixes truncate to the key width;
/// shorter ones are right-padded with zeros (so "4000" probes 400000).
pub fn normalize_prefix(prefix: &str) -> Result<u32> {
    let trimmed = prefix.trim();

    if trimmed.len() < 4 || trimmed.len() > 8 {
        return Err(CardError::InvalidInput(format!(
            "prefix must be 4-8 digits, got {} characters",
            trimmed.len()
        )));
    }

    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardError::InvalidInput(format!(
            "prefix must be ASCII digits only, got '{}'",
            trimmed
        )));
    }

    let mut key: u32 = 0;
    for i in 0..KEY_WIDTH {
        let digit = trimmed.as_bytes().get(i).map(|b| b - b'0').unwrap_or(0);
        key = key * 10 + digit as u32;
    }

    Ok(key)
}

/// Zero-padded string form of a 6-digit key (blocked-list key, display)
pub fn key_string(key: u32) -> String {
    format!("{:0width$}", key, width = KEY_WIDTH)
}

// ============================================================================
// SEARCH FILTER & STATS
// ============================================================================

/// Case-insensitive substring filters over the table
#[derive(Debug, Clone, Default)]
pub struct BinFilter {
    pub brand: Option<String>,
    pub country: Option<String>,
    pub issuer: Option<String>,
    pub card_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TableStats {
    pub total_bins: usize,
    pub brands: usize,
    pub countries: usize,
    pub issuers: usize,
}

// ============================================================================
// BIN TABLE
// ============================================================================

pub struct BinTable {
    /// Sorted by (bin_start, bin_end)
    records: Vec<BinRecord>,

    /// max_end[i] = max(records[0..=i].bin_end) - lets lookups walking
    /// backwards stop as soon as no earlier range can still contain the key
    max_end: Vec<u32>,

    /// 6-digit prefix -> block reason
    blocked: HashMap<String, String>,
}

impl BinTable {
    /// Empty table, default blocked list seeded
    pub fn new() -> Self {
        BinTable::from_records(Vec::new()).expect("empty table is always valid")
    }

    /// Build a table from loaded records.
    ///
    /// Rejects any record with bin_start > bin_end. Overlapping ranges are
    /// allowed (merged datasets have them); lookups resolve overlap by
    /// narrowest-range-wins, ties to the lowest bin_start.
    pub fn from_records(mut records: Vec<BinRecord>) -> Result<Self> {
        for record in &records {
            if record.bin_start > record.bin_end {
                return Err(CardError::InvalidInput(format!(
                    "record range inverted: {} > {}",
                    record.bin_start, record.bin_end
                )));
            }
        }

        records.sort_by(|a, b| {
            a.bin_start
                .cmp(&b.bin_start)
                .then(a.bin_end.cmp(&b.bin_end))
        });

        let mut max_end = Vec::with_capacity(records.len());
        let mut running = 0u32;
        for record in &records {
            running = running.max(record.bin_end);
            max_end.push(running);
        }

        let mut blocked = HashMap::new();
        for bin in DEFAULT_BLOCKED_BINS {
            blocked.insert(bin.to_string(), BLOCKED_DEFAULT_REASON.to_string());
        }

        Ok(BinTable {
            records,
            max_end,
            blocked,
        })
    }

    /// Load the merged BIN dataset CSV.
    ///
    /// Applies the same cleaning the original importer did: trim, require at
    /// least 6 digits, key on the first 6, drop malformed rows and exact
    /// duplicates.
    pub fn load_csv(csv_path: &Path) -> anyhow::Result<Self> {
        let mut rdr = csv::Reader::from_path(csv_path)
            .with_context(|| format!("Failed to open BIN dataset: {:?}", csv_path))?;

        let mut records = Vec::new();
        let mut seen: HashSet<(u32, u32)> = HashSet::new();

        for row in rdr.deserialize() {
            let row: CsvBinRow = row.context("Failed to deserialize BIN row")?;

            let record = match parse_row(&row) {
                Some(record) => record,
                None => continue, // malformed bin column - dropped, like the importer
            };

            if seen.insert((record.bin_start, record.bin_end)) {
                records.push(record);
            }
        }

        Ok(BinTable::from_records(records)?)
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Range-containment lookup.
    ///
    /// `Ok(None)` is the normal NotFound outcome; callers decide whether to
    /// proceed with UNKNOWN metadata or reject. Overlaps resolve to the
    /// narrowest containing range, ties to the lowest bin_start.
    pub fn lookup(&self, prefix: &str) -> Result<Option<&BinRecord>> {
        let key = normalize_prefix(prefix)?;
        Ok(self.lookup_key(key))
    }

    fn lookup_key(&self, key: u32) -> Option<&BinRecord> {
        // Last record whose range could start at or before the key
        let partition = self.records.partition_point(|r| r.bin_start <= key);
        if partition == 0 {
            return None;
        }

        let mut best: Option<&BinRecord> = None;

        for i in (0..partition).rev() {
            if self.max_end[i] < key {
                break; // nothing earlier reaches the key anymore
            }

            let record = &self.records[i];
            if !record.contains(key) {
                continue;
            }

            best = match best {
                Some(current) if record.width() > current.width() => Some(current),
                _ => Some(record),
            };

            if record.width() == 1 {
                break; // exact match, nothing can be narrower
            }
        }

        best
    }

    // ========================================================================
    // BLOCKED BINS
    // ========================================================================

    /// Returns the block reason if the prefix's 6-digit key is blocked
    pub fn blocked_reason(&self, prefix: &str) -> Result<Option<&str>> {
        let key = normalize_prefix(prefix)?;
        Ok(self.blocked.get(&key_string(key)).map(|s| s.as_str()))
    }

    /// Add an operator block (6-digit prefix) with a reason
    pub fn block(&mut self, prefix: &str, reason: &str) -> Result<()> {
        let key = normalize_prefix(prefix)?;
        self.blocked.insert(key_string(key), reason.to_string());
        Ok(())
    }

    // ========================================================================
    // SEARCH, STATS, LISTINGS
    // ========================================================================

    /// Filtered search over the table, capped at SEARCH_LIMIT_MAX rows
    pub fn search(&self, filter: &BinFilter) -> Vec<&BinRecord> {
        let limit = filter
            .limit
            .unwrap_or(SEARCH_LIMIT_DEFAULT)
            .clamp(1, SEARCH_LIMIT_MAX);

        let brand = filter.brand.as_deref().map(str::to_uppercase);
        let country = filter.country.as_deref().map(str::to_uppercase);
        let issuer = filter.issuer.as_deref().map(str::to_uppercase);
        let card_type = filter.card_type.as_deref().map(str::to_uppercase);

        self.records
            .iter()
            .filter(|r| matches_filter(r.brand.as_str(), &brand))
            .filter(|r| matches_filter(&r.country, &country))
            .filter(|r| matches_filter(&r.issuer, &issuer))
            .filter(|r| matches_filter(r.card_type.as_str(), &card_type))
            .take(limit)
            .collect()
    }

    /// Dataset statistics (sentinel values excluded from distinct counts)
    pub fn stats(&self) -> TableStats {
        let mut brands = HashSet::new();
        let mut countries = HashSet::new();
        let mut issuers = HashSet::new();

        for record in &self.records {
            if record.brand != CardBrand::Unknown {
                brands.insert(record.brand);
            }
            if record.country != UNKNOWN {
                countries.insert(record.country.as_str());
            }
            if record.issuer != UNKNOWN {
                issuers.insert(record.issuer.as_str());
            }
        }

        TableStats {
            total_bins: self.records.len(),
            brands: brands.len(),
            countries: countries.len(),
            issuers: issuers.len(),
        }
    }

    /// Sorted distinct brand names present in the table
    pub fn brands(&self) -> Vec<String> {
        let mut brands: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.brand != CardBrand::Unknown)
            .map(|r| r.brand.as_str().to_string())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        brands.sort();
        brands
    }

    /// Sorted distinct country names present in the table
    pub fn countries(&self) -> Vec<String> {
        let mut countries: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.country != UNKNOWN)
            .map(|r| r.country.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        countries.sort();
        countries
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in key order (SQLite persistence iterates this)
    pub fn records(&self) -> &[BinRecord] {
        &self.records
    }
}

impl Default for BinTable {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(value: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(needle) => value.to_uppercase().contains(needle.as_str()),
        None => true,
    }
}

/// Clean one CSV row into a record; None drops the row
fn parse_row(row: &CsvBinRow) -> Option<BinRecord> {
    let bin_start = clean_bin_column(&row.bin)?;

    let bin_end = match &row.bin_end {
        Some(raw) if !raw.trim().is_empty() => clean_bin_column(raw)?,
        _ => bin_start,
    };

    if bin_start > bin_end {
        return None;
    }

    let mut record = BinRecord::ranged(bin_start, bin_end);
    record.brand = CardBrand::parse(&row.brand);
    record.card_type = CardType::parse(&row.card_type);
    record.category = normalize_field(&row.category);
    record.issuer = normalize_field(&row.issuer);
    record.country = normalize_field(&row.country);
    record.country_code = normalize_field(&row.country_code);
    record.currency = normalize_field(&row.currency);
    record.bank_phone = normalize_field(&row.bank_phone);
    record.bank_url = normalize_field(&row.bank_url);
    Some(record)
}

/// Importer cleaning rule: at least 6 digits, keyed on the first 6
fn clean_bin_column(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.len() < KEY_WIDTH || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed[..KEY_WIDTH].parse().ok()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn visa_usa_fixture() -> BinRecord {
        let mut record = BinRecord::ranged(400000, 400999);
        record.brand = CardBrand::Visa;
        record.card_type = CardType::Credit;
        record.country = "USA".to_string();
        record
    }

    #[test]
    fn test_normalize_prefix_lengths() {
        assert_eq!(normalize_prefix("400050").unwrap(), 400050);
        assert_eq!(normalize_prefix("40005099").unwrap(), 400050); // truncated
        assert_eq!(normalize_prefix("4000509").unwrap(), 400050);
        assert_eq!(normalize_prefix("4000").unwrap(), 400000); // zero-padded
        assert_eq!(normalize_prefix("40005").unwrap(), 400050);
        assert_eq!(normalize_prefix(" 400050 ").unwrap(), 400050);
    }

    #[test]
    fn test_normalize_prefix_rejects() {
        assert!(normalize_prefix("400").is_err()); // too short
        assert!(normalize_prefix("400050999").is_err()); // too long
        assert!(normalize_prefix("40x050").is_err()); // non-digit
        assert!(normalize_prefix("").is_err());
    }

    #[test]
    fn test_lookup_range_containment() {
        let table = BinTable::from_records(vec![visa_usa_fixture()]).unwrap();

        let hit = table.lookup("400050").unwrap().expect("should match");
        assert_eq!(hit.brand, CardBrand::Visa);
        assert_eq!(hit.card_type, CardType::Credit);
        assert_eq!(hit.country, "USA");

        assert!(table.lookup("399999").unwrap().is_none());
        assert!(table.lookup("401000").unwrap().is_none());
        assert!(table.lookup("400000").unwrap().is_some()); // inclusive start
        assert!(table.lookup("400999").unwrap().is_some()); // inclusive end
    }

    #[test]
    fn test_lookup_exact_record() {
        let mut exact = BinRecord::exact(411112);
        exact.brand = CardBrand::Visa;
        let table = BinTable::from_records(vec![exact]).unwrap();

        assert!(table.lookup("411112").unwrap().is_some());
        assert!(table.lookup("411113").unwrap().is_none());
    }

    #[test]
    fn test_lookup_overlap_prefers_narrowest() {
        let mut wide = BinRecord::ranged(400000, 409999);
        wide.issuer = "WIDE".to_string();
        let mut narrow = BinRecord::ranged(400000, 400099);
        narrow.issuer = "NARROW".to_string();
        let mut exact = BinRecord::exact(400050);
        exact.issuer = "EXACT".to_string();

        let table = BinTable::from_records(vec![wide, narrow, exact]).unwrap();

        // All three contain 400050 - the exact record wins
        assert_eq!(table.lookup("400050").unwrap().unwrap().issuer, "EXACT");
        // Narrow beats wide everywhere else inside it
        assert_eq!(table.lookup("400060").unwrap().unwrap().issuer, "NARROW");
        // Only the wide range covers this key
        assert_eq!(table.lookup("405000").unwrap().unwrap().issuer, "WIDE");
    }

    #[test]
    fn test_lookup_overlap_equal_width_lowest_start_wins() {
        let mut a = BinRecord::ranged(400000, 400199);
        a.issuer = "A".to_string();
        let mut b = BinRecord::ranged(400100, 400299);
        b.issuer = "B".to_string();

        let table = BinTable::from_records(vec![b, a]).unwrap();

        // 400150 sits in both equally-wide ranges; tie-break is deterministic
        assert_eq!(table.lookup("400150").unwrap().unwrap().issuer, "A");
    }

    #[test]
    fn test_lookup_nested_before_wide_start() {
        // Regression shape: a wide range starting earlier than many narrow
        // ones must still be found when only it contains the key
        let wide = BinRecord::ranged(100000, 500000);
        let narrow = BinRecord::ranged(200000, 200010);

        let table = BinTable::from_records(vec![wide, narrow]).unwrap();
        let hit = table.lookup("450000").unwrap().unwrap();
        assert_eq!(hit.bin_start, 100000);
    }

    #[test]
    fn test_from_records_rejects_inverted_range() {
        let mut bad = BinRecord::exact(400999);
        bad.bin_start = 401000;

        assert!(BinTable::from_records(vec![bad]).is_err());
    }

    #[test]
    fn test_short_prefix_padded_lookup() {
        let table = BinTable::from_records(vec![visa_usa_fixture()]).unwrap();

        // "4000" pads to 400000, inside the range
        assert!(table.lookup("4000").unwrap().is_some());
        // "4009" pads to 400900, still inside
        assert!(table.lookup("4009").unwrap().is_some());
        // "4010" pads to 401000, outside
        assert!(table.lookup("4010").unwrap().is_none());
    }

    #[test]
    fn test_default_blocked_bins() {
        let table = BinTable::new();

        assert_eq!(
            table.blocked_reason("411111").unwrap(),
            Some("published test BIN")
        );
        // Longer input still keys on the first 6 digits
        assert_eq!(
            table.blocked_reason("41111105").unwrap(),
            Some("published test BIN")
        );
        assert_eq!(table.blocked_reason("400050").unwrap(), None);
    }

    #[test]
    fn test_operator_block() {
        let mut table = BinTable::new();
        table.block("490000", "issuer opt-out").unwrap();

        assert_eq!(
            table.blocked_reason("490000").unwrap(),
            Some("issuer opt-out")
        );
    }

    #[test]
    fn test_search_filters_and_limit() {
        let mut records = Vec::new();
        for i in 0..10 {
            let mut r = BinRecord::exact(410000 + i);
            r.brand = CardBrand::Visa;
            r.country = "UNITED STATES".to_string();
            r.issuer = "CHASE BANK".to_string();
            records.push(r);
        }
        let mut mc = BinRecord::exact(510000);
        mc.brand = CardBrand::Mastercard;
        mc.country = "GERMANY".to_string();
        records.push(mc);

        let table = BinTable::from_records(records).unwrap();

        let visas = table.search(&BinFilter {
            brand: Some("visa".to_string()),
            ..Default::default()
        });
        assert_eq!(visas.len(), 10);

        let limited = table.search(&BinFilter {
            brand: Some("VISA".to_string()),
            limit: Some(3),
            ..Default::default()
        });
        assert_eq!(limited.len(), 3);

        let chase_germany = table.search(&BinFilter {
            issuer: Some("chase".to_string()),
            country: Some("germany".to_string()),
            ..Default::default()
        });
        assert!(chase_germany.is_empty());

        let germany = table.search(&BinFilter {
            country: Some("GERM".to_string()),
            ..Default::default()
        });
        assert_eq!(germany.len(), 1);
        assert_eq!(germany[0].brand, CardBrand::Mastercard);
    }

    #[test]
    fn test_search_limit_clamped() {
        let mut records = Vec::new();
        for i in 0..150 {
            records.push(BinRecord::exact(400000 + i));
        }
        let table = BinTable::from_records(records).unwrap();

        let all = table.search(&BinFilter {
            limit: Some(10_000),
            ..Default::default()
        });
        assert_eq!(all.len(), SEARCH_LIMIT_MAX);

        let default = table.search(&BinFilter::default());
        assert_eq!(default.len(), SEARCH_LIMIT_DEFAULT);
    }

    #[test]
    fn test_stats_and_listings() {
        let mut visa = BinRecord::exact(400001);
        visa.brand = CardBrand::Visa;
        visa.country = "USA".to_string();
        visa.issuer = "CHASE".to_string();

        let mut mc = BinRecord::exact(510001);
        mc.brand = CardBrand::Mastercard;
        mc.country = "GERMANY".to_string();
        mc.issuer = "N26".to_string();

        let unknown = BinRecord::exact(620001); // all-UNKNOWN metadata

        let table = BinTable::from_records(vec![visa, mc, unknown]).unwrap();

        let stats = table.stats();
        assert_eq!(stats.total_bins, 3);
        assert_eq!(stats.brands, 2);
        assert_eq!(stats.countries, 2);
        assert_eq!(stats.issuers, 2);

        assert_eq!(table.brands(), vec!["MASTERCARD", "VISA"]);
        assert_eq!(table.countries(), vec!["GERMANY", "USA"]);
    }

    #[test]
    fn test_load_csv_cleaning() {
        use std::io::Write;

        let dir = std::env::temp_dir();
        let path = dir.join("cardforge_test_bins.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "bin,brand,type,category,issuer,country,alpha_2,currency,bank_phone,bank_url").unwrap();
        writeln!(file, "400050,VISA,CREDIT,CLASSIC,CHASE,UNITED STATES,US,USD,800-1234,chase.com").unwrap();
        writeln!(file, "40005099,VISA,CREDIT,,,,,,,").unwrap(); // dup after 6-digit truncation
        writeln!(file, "4000,VISA,,,,,,,,").unwrap(); // too short - dropped
        writeln!(file, "51xx00,MC,,,,,,,,").unwrap(); // non-digit - dropped
        writeln!(file, "510123,Mastercard,DEBIT,,,GERMANY,DE,EUR,,").unwrap();
        drop(file);

        let table = BinTable::load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.len(), 2);

        let visa = table.lookup("400050").unwrap().unwrap();
        assert_eq!(visa.brand, CardBrand::Visa);
        assert_eq!(visa.category, "CLASSIC");
        assert_eq!(visa.currency, "USD");

        let mc = table.lookup("510123").unwrap().unwrap();
        assert_eq!(mc.brand, CardBrand::Mastercard);
        assert_eq!(mc.card_type, CardType::Debit);
        assert_eq!(mc.issuer, UNKNOWN); // blank column -> sentinel
    }
}

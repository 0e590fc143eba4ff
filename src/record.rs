// 📦 Records - One row per entry, keyed by slug / URL / title
// Records are immutable once loaded; a RecordSet holds one source side.

use crate::config::ComparisonConfig;
use crate::error::{Diagnostic, IngestError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// SIDE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// Value of one field on one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Present(&'a str),
    Absent,
}

impl<'a> FieldValue<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            FieldValue::Present(value) => Some(value),
            FieldValue::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(key: &str) -> Self {
        Record {
            key: key.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder pattern: add a field
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn from_fields(key: &str, fields: BTreeMap<String, String>) -> Self {
        Record {
            key: key.to_string(),
            fields,
        }
    }

    /// Raw stored value, if the column exists at all
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field value with empty sentinels resolved to `Absent`
    pub fn field(&self, name: &str, config: &ComparisonConfig) -> FieldValue<'_> {
        match self.raw(name) {
            Some(value) if !config.is_empty_value(value) => FieldValue::Present(value),
            _ => FieldValue::Absent,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ============================================================================
// RECORD SET
// ============================================================================

/// All records from one source system, plus what went wrong loading them
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: BTreeMap<String, Record>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut set = RecordSet::new();
        for record in records {
            set.insert(record);
        }
        set
    }

    /// Insert a record; a later record with the same key replaces the earlier one
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.key.clone(), record)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_error(&mut self, err: IngestError) {
        warn!("{}", err);
        self.diagnostics.push(Diagnostic::from(&err));
    }

    /// Build a record from raw fields and insert it, honoring key rules
    pub fn ingest(
        &mut self,
        index: usize,
        key_column: &str,
        fields: BTreeMap<String, String>,
        config: &ComparisonConfig,
    ) {
        let key = fields
            .get(key_column)
            .map(|raw| config.key_transform.apply(raw))
            .unwrap_or_default();

        if key.is_empty() {
            self.record_error(IngestError::MissingKey {
                index,
                column: key_column.to_string(),
            });
            return;
        }
        if config.is_skipped_key(&key) {
            return;
        }

        self.insert(Record::from_fields(&key, fields));
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

/// Load one side from a CSV file with a header row
pub fn load_csv(csv_path: &Path, side: Side, config: &ComparisonConfig) -> Result<RecordSet> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    let set = read_csv(file, side, config)?;

    info!(
        "loaded {} {} records from {} ({} skipped)",
        set.len(),
        side.name(),
        csv_path.display(),
        set.diagnostics.len()
    );
    Ok(set)
}

/// Read one side from any CSV source
///
/// Rows that fail to parse are recorded as diagnostics; their key is then
/// simply absent from this side.
pub fn read_csv<R: Read>(reader: R, side: Side, config: &ComparisonConfig) -> Result<RecordSet> {
    let key_column = match side {
        Side::Left => &config.left_key,
        Side::Right => &config.right_key,
    };

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let mut set = RecordSet::new();
    for (index, result) in rdr.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                set.record_error(IngestError::SourceUnavailable {
                    index,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let fields: BTreeMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.trim().to_string(), value.to_string()))
            .collect();

        set.ingest(index, key_column, fields, config);
    }

    Ok(set)
}

/// Write records back to CSV with a fixed column order
pub fn write_csv(path: &Path, columns: &[&str], records: &RecordSet) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    wtr.write_record(columns)?;
    for record in records.records() {
        let row: Vec<&str> = columns
            .iter()
            .map(|column| record.raw(column).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn create_test_config() -> ComparisonConfig {
        ComparisonConfig::articles()
    }

    #[test]
    fn test_field_value_sentinels() {
        let config = create_test_config();
        let record = Record::new("/blog/a")
            .with_field("title", "GST Guide")
            .with_field("metaTitle", "N/A")
            .with_field("linkText", "  ");

        assert_eq!(record.field("title", &config), FieldValue::Present("GST Guide"));
        assert!(record.field("metaTitle", &config).is_absent());
        assert!(record.field("linkText", &config).is_absent());
        assert!(record.field("unknown", &config).is_absent());
        assert_eq!(record.raw("metaTitle"), Some("N/A"));
    }

    #[test]
    fn test_read_csv_keys_and_skips() {
        let config = create_test_config();
        let data = "linkUrl,title,content\n\
                    /blog/a ,Alpha,Body A\n\
                    ,Orphan,Body\n\
                    all,Listing,\n\
                    /blog/b,Beta,Body B\n";

        let set = read_csv(data.as_bytes(), Side::Left, &config).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.contains("/blog/a"));
        assert!(!set.contains("all"));
        assert_eq!(set.get("/blog/b").unwrap().raw("title"), Some("Beta"));
        assert_eq!(set.diagnostics.len(), 1);
        assert_eq!(set.diagnostics[0].kind, DiagnosticKind::MissingKey);
    }

    #[test]
    fn test_read_csv_uses_side_key_column() {
        let mut config = create_test_config();
        config.right_key = "slug".to_string();

        let data = "slug,title\nabc,Alpha\n";
        let set = read_csv(data.as_bytes(), Side::Right, &config).unwrap();
        assert!(set.contains("abc"));
    }

    #[test]
    fn test_read_csv_title_keys() {
        let config = ComparisonConfig::legal();
        let data = "Title,Content\n\"Privacy Policy!\",text\n";
        let set = read_csv(data.as_bytes(), Side::Left, &config).unwrap();
        assert!(set.contains("privacypolicy"));
    }

    #[test]
    fn test_bad_row_is_recorded_not_fatal() {
        let config = create_test_config();
        let mut data = b"linkUrl,title\n/blog/a,Alpha\n".to_vec();
        data.extend_from_slice(b"/blog/\xff\xfe,Bad\n");
        data.extend_from_slice(b"/blog/c,Gamma\n");

        let set = read_csv(data.as_slice(), Side::Left, &config).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.contains("/blog/c"));
        assert_eq!(set.diagnostics.len(), 1);
        assert_eq!(set.diagnostics[0].kind, DiagnosticKind::SourceUnavailable);
    }

    #[test]
    fn test_load_and_write_csv_files() {
        let config = create_test_config();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("left.csv");

        let set = RecordSet::from_records(vec![
            Record::new("/b").with_field("linkUrl", "/b").with_field("title", "Beta"),
            Record::new("/a").with_field("linkUrl", "/a").with_field("title", "Alpha, Inc"),
        ]);
        write_csv(&path, &["linkUrl", "title"], &set).unwrap();

        let loaded = load_csv(&path, Side::Left, &config).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("/a").unwrap().raw("title"), Some("Alpha, Inc"));
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let config = create_test_config();
        let result = load_csv(Path::new("/nonexistent/left.csv"), Side::Left, &config);
        assert!(result.is_err());
    }
}

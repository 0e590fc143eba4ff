// 📥 Source Ingestion - JSON export and saved API responses → RecordSet
//
// JSON export: {"items": [{"sys": {"id"}, "fields": {name: {"en-US": value}}}]}
//   The rich-text body is a node tree and goes through the Flattener.
// API dump:    {"data": [{"id", "attributes": {...}}]} (or an array of pages)
//   The body is a list of blocks carrying HTML, stripped to plain text.

use crate::config::ComparisonConfig;
use crate::error::IngestError;
use crate::normalize::value_to_string;
use crate::record::{RecordSet, Side};
use crate::rich_text::Flattener;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(\s[^<>]*)?/?>").expect("tag pattern is valid"));

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Locale unwrapped from localized fields (default: en-US)
    pub locale: String,

    /// Field holding the rich-text body (default: detailInfo)
    pub body_field: String,

    /// Column the flattened body is stored under
    pub content_column: String,

    /// Column the entry id is stored under
    pub id_column: String,
}

impl ExportOptions {
    /// Defaults for the JSON export side
    pub fn json_export() -> Self {
        ExportOptions {
            locale: "en-US".to_string(),
            body_field: "detailInfo".to_string(),
            content_column: "content".to_string(),
            id_column: "contentfulId".to_string(),
        }
    }

    /// Defaults for the API side
    pub fn api() -> Self {
        ExportOptions {
            locale: "en-US".to_string(),
            body_field: "detailInfo".to_string(),
            content_column: "strapi_content".to_string(),
            id_column: "id".to_string(),
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::json_export()
    }
}

/// Read and parse a JSON file
pub fn load_json_file(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

fn key_column(side: Side, config: &ComparisonConfig) -> &str {
    match side {
        Side::Left => &config.left_key,
        Side::Right => &config.right_key,
    }
}

// ============================================================================
// JSON EXPORT
// ============================================================================

/// Records from a JSON export document
pub fn records_from_export(
    document: &Value,
    side: Side,
    config: &ComparisonConfig,
    options: &ExportOptions,
) -> RecordSet {
    let mut set = RecordSet::new();
    let items = document
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for (index, item) in items.iter().enumerate() {
        let fields = match item.get("fields").and_then(Value::as_object) {
            Some(fields) => fields,
            None => {
                set.record_error(IngestError::SourceUnavailable {
                    index,
                    reason: "entry has no fields object".to_string(),
                });
                continue;
            }
        };

        let mut row = BTreeMap::new();
        if let Some(id) = item.pointer("/sys/id").and_then(Value::as_str) {
            row.insert(options.id_column.clone(), id.to_string());
        }

        for (name, value) in fields {
            let value = unwrap_locale(value, &options.locale);
            if *name == options.body_field {
                let outcome = Flattener::new().flatten_value(body_root(value));
                set.diagnostics.extend(outcome.diagnostics);
                row.insert(options.content_column.clone(), outcome.text);
            } else {
                row.insert(name.clone(), value_to_string(value));
            }
        }

        set.ingest(index, key_column(side, config), row, config);
    }

    info!("ingested {} {} entries from JSON export", set.len(), side.name());
    set
}

/// `{"en-US": v}` → `v`; anything else unchanged
fn unwrap_locale<'a>(value: &'a Value, locale: &str) -> &'a Value {
    match value {
        Value::Object(map) if is_locale_wrapper(map, locale) => &map[locale],
        _ => value,
    }
}

fn is_locale_wrapper(map: &Map<String, Value>, locale: &str) -> bool {
    map.len() == 1 && map.contains_key(locale)
}

/// Rich-text fields are either a document node or an object wrapping one
fn body_root(value: &Value) -> &Value {
    match value {
        Value::Object(map) if !map.contains_key("nodeType") => {
            map.get("content").unwrap_or(value)
        }
        _ => value,
    }
}

// ============================================================================
// API DUMP
// ============================================================================

/// Records from one saved API response, or an array of saved responses
pub fn records_from_api(
    document: &Value,
    side: Side,
    config: &ComparisonConfig,
    options: &ExportOptions,
) -> RecordSet {
    let pages: Vec<&Value> = match document {
        Value::Array(pages) => pages.iter().collect(),
        other => vec![other],
    };

    let mut set = RecordSet::new();
    let mut index = 0;
    for page in pages {
        let entries = page
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for entry in entries {
            let row = match api_entry_fields(entry, options) {
                Some(row) => row,
                None => {
                    set.record_error(IngestError::SourceUnavailable {
                        index,
                        reason: "entry has no attributes object".to_string(),
                    });
                    index += 1;
                    continue;
                }
            };
            set.ingest(index, key_column(side, config), row, config);
            index += 1;
        }
    }

    info!("ingested {} {} entries from API dump", set.len(), side.name());
    set
}

fn api_entry_fields(entry: &Value, options: &ExportOptions) -> Option<BTreeMap<String, String>> {
    let attributes = entry.get("attributes")?.as_object()?;

    let mut row = BTreeMap::new();
    if let Some(id) = entry.get("id") {
        row.insert(options.id_column.clone(), value_to_string(id));
    }

    for (name, value) in attributes {
        if *name == options.body_field {
            row.insert(options.content_column.clone(), html_blocks_text(value));
        } else {
            row.insert(name.clone(), attribute_text(value));
        }
    }

    Some(row)
}

/// Attribute value as text, with any HTML markup stripped
fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(s) if HTML_TAG.is_match(s) => strip_html(s),
        Value::Array(items) => items
            .iter()
            .map(attribute_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => value_to_string(other),
    }
}

/// Plain text of a list of `{"content": "<html>"}` blocks, joined by spaces
pub fn html_blocks_text(blocks: &Value) -> String {
    let blocks = match blocks {
        Value::Array(blocks) => blocks.as_slice(),
        _ => return String::new(),
    };

    blocks
        .iter()
        .filter_map(|block| block.get("content").and_then(Value::as_str))
        .map(strip_html)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content of an HTML fragment, whitespace collapsed
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// TESTS
// ============================================================================

// 🧹 Text Normalizer - Canonical form for field comparison
// Two CMS backends rarely agree on punctuation, casing or spacing.
// Normalization removes those differences before similarity is scored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// NORMALIZE MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizeMode {
    /// Strip everything outside [A-Za-z0-9 ], collapse whitespace, lowercase
    #[default]
    Aggressive,

    /// Collapse whitespace and lowercase, keep punctuation
    Preserving,

    /// Collapse whitespace only (case-sensitive)
    Raw,
}

impl NormalizeMode {
    pub fn name(&self) -> &str {
        match self {
            NormalizeMode::Aggressive => "aggressive",
            NormalizeMode::Preserving => "preserving",
            NormalizeMode::Raw => "raw",
        }
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mode: NormalizeMode,

    /// Map "yes"/"no" to "true"/"false" after normalization
    pub boolean_words: bool,
}

impl Normalizer {
    pub fn new(mode: NormalizeMode) -> Self {
        Normalizer {
            mode,
            boolean_words: false,
        }
    }

    /// Builder pattern: enable yes/no → true/false
    pub fn with_boolean_words(mut self, enabled: bool) -> Self {
        self.boolean_words = enabled;
        self
    }

    pub fn normalize(&self, raw: &str) -> String {
        let text = match self.mode {
            NormalizeMode::Aggressive => {
                let stripped: String = raw
                    .chars()
                    .map(|c| {
                        if c.is_ascii_alphanumeric() || c == ' ' {
                            c
                        } else {
                            ' '
                        }
                    })
                    .collect();
                collapse_whitespace(&stripped).to_lowercase()
            }
            NormalizeMode::Preserving => collapse_whitespace(raw).to_lowercase(),
            NormalizeMode::Raw => collapse_whitespace(raw),
        };

        if self.boolean_words {
            canonical_boolean(text)
        } else {
            text
        }
    }

    /// Normalize any JSON value by coercing it to its string form first
    pub fn normalize_json(&self, raw: &Value) -> String {
        self.normalize(&value_to_string(raw))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new(NormalizeMode::Aggressive).with_boolean_words(true)
    }
}

/// Aggressive normalization with boolean-word mapping
pub fn normalize(raw: &str) -> String {
    Normalizer::default().normalize(raw)
}

/// Coerce a JSON value to the text the comparison should see
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => value.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn canonical_boolean(text: String) -> String {
    match text.to_lowercase().as_str() {
        "yes" => "true".to_string(),
        "no" => "false".to_string(),
        _ => text,
    }
}

// ============================================================================
// TESTS
// ============================================================================

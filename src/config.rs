// ⚙️ Comparison Configuration - Which fields to compare, and how
// One Reconciler, parameterized by a list of FieldSpecs, replaces one script
// per backend pairing. Configs load from TOML or come from a built-in preset.

use crate::normalize::{NormalizeMode, Normalizer};
use crate::similarity::ComparisonMode;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lenient threshold for long free-text fields
pub const CONTENT_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Strict threshold for short metadata fields
pub const METADATA_SIMILARITY_THRESHOLD: f64 = 0.98;

// ============================================================================
// FIELD SPEC
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Name used in report columns
    pub label: String,

    /// Column name in the left source
    pub left: String,

    /// Column name in the right source
    pub right: String,

    pub mode: ComparisonMode,

    /// Scores at or above this (but below 1.0) are near matches
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Normalization override; defaults depend on `mode`
    #[serde(default)]
    pub normalize: Option<NormalizeMode>,

    /// Map yes/no to true/false before comparing
    #[serde(default)]
    pub boolean_words: bool,
}

impl FieldSpec {
    /// Same column name on both sides
    pub fn new(name: &str, mode: ComparisonMode) -> Self {
        FieldSpec::mapped(name, name, mode)
    }

    /// Different column names on each side; labelled by the left name
    pub fn mapped(left: &str, right: &str, mode: ComparisonMode) -> Self {
        FieldSpec {
            label: left.to_string(),
            left: left.to_string(),
            right: right.to_string(),
            mode,
            threshold: None,
            normalize: None,
            boolean_words: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_normalize(mut self, mode: NormalizeMode) -> Self {
        self.normalize = Some(mode);
        self
    }

    pub fn with_boolean_words(mut self) -> Self {
        self.boolean_words = true;
        self
    }

    pub fn effective_threshold(&self) -> f64 {
        self.threshold.unwrap_or(match self.mode {
            ComparisonMode::FuzzyContent => CONTENT_SIMILARITY_THRESHOLD,
            ComparisonMode::FuzzyMetadata | ComparisonMode::Exact => METADATA_SIMILARITY_THRESHOLD,
        })
    }

    pub fn normalizer(&self) -> Normalizer {
        let mode = self.normalize.unwrap_or(match self.mode {
            ComparisonMode::FuzzyContent => NormalizeMode::Aggressive,
            ComparisonMode::FuzzyMetadata => NormalizeMode::Preserving,
            ComparisonMode::Exact => NormalizeMode::Aggressive,
        });
        Normalizer::new(mode).with_boolean_words(self.boolean_words)
    }
}

// ============================================================================
// KEY TRANSFORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyTransform {
    /// Trim surrounding whitespace (slugs, URLs)
    #[default]
    Trim,

    /// Keep only alphanumerics, lowercased (title-derived keys)
    Alphanumeric,
}

impl KeyTransform {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            KeyTransform::Trim => raw.trim().to_string(),
            KeyTransform::Alphanumeric => raw
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_lowercase(),
        }
    }
}

// ============================================================================
// COMPARISON CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default = "default_left_label")]
    pub left_label: String,

    #[serde(default = "default_right_label")]
    pub right_label: String,

    /// Key column in the left source
    pub left_key: String,

    /// Key column in the right source
    pub right_key: String,

    #[serde(default)]
    pub key_transform: KeyTransform,

    /// Values treated as absent (compared case-insensitively after trimming)
    #[serde(default = "default_empty_sentinels")]
    pub empty_sentinels: Vec<String>,

    /// Keys dropped at load time (e.g. listing pages)
    #[serde(default)]
    pub skip_keys: Vec<String>,

    pub fields: Vec<FieldSpec>,
}

fn default_left_label() -> String {
    "contentful".to_string()
}

fn default_right_label() -> String {
    "strapi".to_string()
}

fn default_empty_sentinels() -> Vec<String> {
    ["", "N/A", "MISSING", "nan"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ComparisonConfig {
    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ComparisonConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in config by name
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "articles" => Ok(Self::articles()),
            "faq" => Ok(Self::faq()),
            "legal" => Ok(Self::legal()),
            other => bail!("Unknown preset '{}' (expected articles, faq or legal)", other),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            bail!("Config must declare at least one field");
        }

        let mut labels = std::collections::BTreeSet::new();
        for field in &self.fields {
            if !labels.insert(field.label.as_str()) {
                bail!("Duplicate field label '{}'", field.label);
            }
            let threshold = field.effective_threshold();
            if !(0.0..=1.0).contains(&threshold) {
                bail!(
                    "Threshold for '{}' must be between 0.0 and 1.0, got {}",
                    field.label,
                    threshold
                );
            }
        }

        Ok(())
    }

    pub fn is_empty_value(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        self.empty_sentinels
            .iter()
            .any(|sentinel| sentinel.trim().eq_ignore_ascii_case(trimmed))
    }

    pub fn is_skipped_key(&self, key: &str) -> bool {
        self.skip_keys.iter().any(|skip| skip.eq_ignore_ascii_case(key))
    }

    // ========================================================================
    // PRESETS
    // ========================================================================

    /// Blog articles: JSON export vs API, keyed by article URL
    pub fn articles() -> Self {
        ComparisonConfig {
            left_label: default_left_label(),
            right_label: default_right_label(),
            left_key: "linkUrl".to_string(),
            right_key: "linkUrl".to_string(),
            key_transform: KeyTransform::Trim,
            empty_sentinels: default_empty_sentinels(),
            skip_keys: vec!["all".to_string()],
            fields: vec![
                FieldSpec::new("contentfulId", ComparisonMode::Exact)
                    .with_normalize(NormalizeMode::Raw),
                FieldSpec::new("title", ComparisonMode::FuzzyMetadata),
                FieldSpec::new("metaTitle", ComparisonMode::FuzzyMetadata),
                FieldSpec::new("metaDescription", ComparisonMode::FuzzyMetadata),
                FieldSpec::new("linkText", ComparisonMode::FuzzyMetadata),
                FieldSpec::new("categoryName", ComparisonMode::Exact),
                FieldSpec::new("timeDuration", ComparisonMode::Exact),
                FieldSpec::new("isThisAFeaturedArticle", ComparisonMode::Exact)
                    .with_boolean_words(),
                FieldSpec::new("isThisAPrimaryArticle", ComparisonMode::Exact)
                    .with_boolean_words(),
                FieldSpec::mapped("content", "strapi_content", ComparisonMode::FuzzyContent),
            ],
        }
    }

    /// FAQ entries keyed by slug
    pub fn faq() -> Self {
        ComparisonConfig {
            left_label: default_left_label(),
            right_label: default_right_label(),
            left_key: "Slug".to_string(),
            right_key: "Slug".to_string(),
            key_transform: KeyTransform::Trim,
            empty_sentinels: default_empty_sentinels(),
            skip_keys: Vec::new(),
            fields: vec![
                FieldSpec::new("Title", ComparisonMode::FuzzyMetadata),
                FieldSpec::new("Description", ComparisonMode::FuzzyContent),
                FieldSpec::new("Meta Title", ComparisonMode::FuzzyMetadata),
                FieldSpec::new("Meta Description", ComparisonMode::FuzzyMetadata),
            ],
        }
    }

    /// Legal pages keyed by a title-derived key
    pub fn legal() -> Self {
        let metadata = |name: &str| {
            FieldSpec::new(name, ComparisonMode::FuzzyMetadata).with_normalize(NormalizeMode::Aggressive)
        };

        ComparisonConfig {
            left_label: default_left_label(),
            right_label: default_right_label(),
            left_key: "Title".to_string(),
            right_key: "Title".to_string(),
            key_transform: KeyTransform::Alphanumeric,
            empty_sentinels: default_empty_sentinels(),
            skip_keys: Vec::new(),
            fields: vec![
                metadata("Title"),
                metadata("Name"),
                metadata("Meta Title"),
                metadata("Meta Description"),
                metadata("Canonical"),
                metadata("Mapping Name"),
                metadata("Content Menu"),
                FieldSpec::new("Content", ComparisonMode::FuzzyContent),
            ],
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

// ⚖️ Reconciliation Engine - Join both CMS sides by key and compare fields
// Every key in either source gets exactly one row:
//   missing on a side → Missing
//   any field below its threshold → Mismatch
//   otherwise → Match

use crate::config::{ComparisonConfig, FieldSpec};
use crate::normalize::{NormalizeMode, Normalizer};
use crate::record::{FieldValue, Record, RecordSet, Side};
use crate::report::sentence_differences;
use crate::similarity::SimilarityEngine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// FIELD VERDICT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Identical after normalization (score 1.0)
    Match,

    /// Below 1.0 but at or above the field threshold
    NearMatch,

    /// Below the field threshold
    Mismatch,

    /// Value absent on exactly one side, or the whole key is
    Missing,
}

impl Verdict {
    pub fn label(&self) -> &str {
        match self {
            Verdict::Match => "MATCH",
            Verdict::NearMatch => "NEAR_MATCH",
            Verdict::Mismatch => "MISMATCH",
            Verdict::Missing => "MISSING",
        }
    }

    /// Classify a rounded score against a threshold
    pub fn classify(score: f64, threshold: f64) -> Self {
        if score >= 1.0 {
            Verdict::Match
        } else if score >= threshold {
            Verdict::NearMatch
        } else {
            Verdict::Mismatch
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldVerdict {
    pub label: String,

    /// Normalized left value (None = absent)
    pub left: Option<String>,

    /// Normalized right value (None = absent)
    pub right: Option<String>,

    /// Score rounded to 3 decimals (None = not comparable)
    pub similarity: Option<f64>,

    pub verdict: Verdict,

    /// Sentence-level differences of a mismatch, on punctuation-preserving text
    #[serde(default)]
    pub differences: Vec<String>,
}

impl FieldVerdict {
    pub fn is_mismatch(&self) -> bool {
        self.verdict == Verdict::Mismatch
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    Match,
    Mismatch,
    /// Key absent from the given side
    Missing(Side),
}

impl KeyStatus {
    pub fn label(&self) -> &str {
        match self {
            KeyStatus::Match => "MATCH",
            KeyStatus::Mismatch => "MISMATCH",
            KeyStatus::Missing(Side::Left) => "MISSING_LEFT",
            KeyStatus::Missing(Side::Right) => "MISSING_RIGHT",
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, KeyStatus::Missing(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub key: String,
    pub in_left: bool,
    pub in_right: bool,
    pub fields: Vec<FieldVerdict>,
    pub status: KeyStatus,
}

impl ReportRow {
    pub fn mismatch_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_mismatch()).count()
    }

    pub fn field(&self, label: &str) -> Option<&FieldVerdict> {
        self.fields.iter().find(|f| f.label == label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub left_label: String,
    pub right_label: String,
    pub field_labels: Vec<String>,

    /// One row per key, sorted by key
    pub rows: Vec<ReportRow>,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn row(&self, key: &str) -> Option<&ReportRow> {
        self.rows
            .binary_search_by(|row| row.key.as_str().cmp(key))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    pub fn count_status(&self, predicate: impl Fn(&KeyStatus) -> bool) -> usize {
        self.rows.iter().filter(|row| predicate(&row.status)).count()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Reconciliation of {} vs {}: {} keys, {} matched, {} mismatched, {} missing in {}, {} missing in {}",
            self.left_label,
            self.right_label,
            self.rows.len(),
            self.count_status(|s| *s == KeyStatus::Match),
            self.count_status(|s| *s == KeyStatus::Mismatch),
            self.count_status(|s| *s == KeyStatus::Missing(Side::Left)),
            self.left_label,
            self.count_status(|s| *s == KeyStatus::Missing(Side::Right)),
            self.right_label,
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler {
    pub config: ComparisonConfig,
    pub engine: SimilarityEngine,
}

impl Reconciler {
    pub fn new(config: ComparisonConfig) -> Self {
        Reconciler {
            config,
            engine: SimilarityEngine::new(),
        }
    }

    pub fn with_engine(config: ComparisonConfig, engine: SimilarityEngine) -> Self {
        Reconciler { config, engine }
    }

    /// Compare both sides over the union of their keys
    pub fn reconcile(&self, left: &RecordSet, right: &RecordSet) -> ReconciliationReport {
        let universe: BTreeSet<&str> = left.keys().chain(right.keys()).collect();

        let rows = universe
            .into_iter()
            .map(|key| self.reconcile_key(key, left.get(key), right.get(key)))
            .collect();

        ReconciliationReport {
            left_label: self.config.left_label.clone(),
            right_label: self.config.right_label.clone(),
            field_labels: self.config.fields.iter().map(|f| f.label.clone()).collect(),
            rows,
            reconciled_at: Utc::now(),
        }
    }

    /// One report row for a key and whatever records each side has for it
    pub fn reconcile_key(&self, key: &str, left: Option<&Record>, right: Option<&Record>) -> ReportRow {
        let fields: Vec<FieldVerdict> = self
            .config
            .fields
            .iter()
            .map(|spec| {
                let left_value = left.map_or(FieldValue::Absent, |r| r.field(&spec.left, &self.config));
                let right_value = right.map_or(FieldValue::Absent, |r| r.field(&spec.right, &self.config));

                if left.is_some() && right.is_some() {
                    self.compare_field(spec, left_value, right_value)
                } else {
                    self.missing_field(spec, left_value, right_value)
                }
            })
            .collect();

        let status = match (left.is_some(), right.is_some()) {
            (true, false) => KeyStatus::Missing(Side::Right),
            (false, _) => KeyStatus::Missing(Side::Left),
            (true, true) if fields.iter().any(FieldVerdict::is_mismatch) => KeyStatus::Mismatch,
            (true, true) => KeyStatus::Match,
        };

        ReportRow {
            key: key.to_string(),
            in_left: left.is_some(),
            in_right: right.is_some(),
            fields,
            status,
        }
    }

    /// Normalize, score and classify one field of a pair present on both sides
    pub fn compare_field(&self, spec: &FieldSpec, left: FieldValue, right: FieldValue) -> FieldVerdict {
        let normalizer = spec.normalizer();
        let left_norm = left.as_str().map(|v| normalizer.normalize(v));
        let right_norm = right.as_str().map(|v| normalizer.normalize(v));

        let (similarity, verdict) = match (&left_norm, &right_norm) {
            (None, None) => (Some(1.0), Verdict::Match),
            (Some(_), None) | (None, Some(_)) => (None, Verdict::Missing),
            (Some(a), Some(b)) => {
                let score = round3(self.engine.score(spec.mode, a, b));
                (Some(score), Verdict::classify(score, spec.effective_threshold()))
            }
        };

        // Aggressive normalization drops the periods sentences are split on
        let differences = match (verdict, left.as_str(), right.as_str()) {
            (Verdict::Mismatch, Some(a), Some(b)) => {
                let readable = Normalizer::new(NormalizeMode::Preserving);
                sentence_differences(&readable.normalize(a), &readable.normalize(b))
            }
            _ => Vec::new(),
        };

        FieldVerdict {
            label: spec.label.clone(),
            left: left_norm,
            right: right_norm,
            similarity,
            verdict,
            differences,
        }
    }

    fn missing_field(&self, spec: &FieldSpec, left: FieldValue, right: FieldValue) -> FieldVerdict {
        let normalizer = spec.normalizer();
        FieldVerdict {
            label: spec.label.clone(),
            left: left.as_str().map(|v| normalizer.normalize(v)),
            right: right.as_str().map(|v| normalizer.normalize(v)),
            similarity: None,
            verdict: Verdict::Missing,
            differences: Vec::new(),
        }
    }
}

fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizeMode;
    use crate::similarity::ComparisonMode;

    fn create_test_config(fields: Vec<FieldSpec>) -> ComparisonConfig {
        let mut config = ComparisonConfig::articles();
        config.fields = fields;
        config
    }

    fn create_test_set(records: Vec<Record>) -> RecordSet {
        RecordSet::from_records(records)
    }

    #[test]
    fn test_whitespace_and_case_match() {
        let config = create_test_config(vec![
            FieldSpec::new("title", ComparisonMode::FuzzyMetadata).with_threshold(0.98),
        ]);
        let left = create_test_set(vec![Record::new("k1").with_field("title", "Hello World")]);
        let right = create_test_set(vec![Record::new("k1").with_field("title", "hello  world")]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let row = report.row("k1").unwrap();

        assert_eq!(row.status, KeyStatus::Match);
        assert_eq!(row.fields[0].verdict, Verdict::Match);
        assert_eq!(row.fields[0].similarity, Some(1.0));

        println!("✅ Test passed: {}", report.summary_line());
    }

    #[test]
    fn test_key_only_in_left() {
        let config = create_test_config(vec![FieldSpec::new("title", ComparisonMode::FuzzyMetadata)]);
        let left = create_test_set(vec![Record::new("k1").with_field("title", "Only Here")]);
        let right = create_test_set(vec![]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let row = report.row("k1").unwrap();

        assert_eq!(row.status, KeyStatus::Missing(Side::Right));
        assert!(row.in_left);
        assert!(!row.in_right);
        assert_eq!(row.fields[0].left.as_deref(), Some("only here"));
        assert_eq!(row.fields[0].right, None);
        assert_eq!(row.fields[0].similarity, None);
        assert_eq!(row.fields[0].verdict, Verdict::Missing);
    }

    #[test]
    fn test_key_only_in_right() {
        let config = create_test_config(vec![FieldSpec::new("title", ComparisonMode::FuzzyMetadata)]);
        let left = create_test_set(vec![]);
        let right = create_test_set(vec![Record::new("k2").with_field("title", "New Page")]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        assert_eq!(report.rows[0].status, KeyStatus::Missing(Side::Left));
        assert_eq!(report.rows[0].status.label(), "MISSING_LEFT");
    }

    #[test]
    fn test_exact_field_policy_per_normalization() {
        let folded = create_test_config(vec![FieldSpec::new("categoryName", ComparisonMode::Exact)]);
        let raw = create_test_config(vec![
            FieldSpec::new("categoryName", ComparisonMode::Exact).with_normalize(NormalizeMode::Raw),
        ]);
        let left = create_test_set(vec![Record::new("k").with_field("categoryName", "Finance")]);
        let right = create_test_set(vec![Record::new("k").with_field("categoryName", "finance ")]);

        let folded_report = Reconciler::new(folded).reconcile(&left, &right);
        assert_eq!(folded_report.rows[0].fields[0].verdict, Verdict::Match);

        let raw_report = Reconciler::new(raw).reconcile(&left, &right);
        assert_eq!(raw_report.rows[0].fields[0].verdict, Verdict::Mismatch);
        assert_eq!(raw_report.rows[0].fields[0].similarity, Some(0.0));
        assert_eq!(raw_report.rows[0].status, KeyStatus::Mismatch);
    }

    #[test]
    fn test_near_match_and_mismatch() {
        let config = create_test_config(vec![
            FieldSpec::new("title", ComparisonMode::FuzzyMetadata).with_threshold(0.9),
            FieldSpec::new("metaTitle", ComparisonMode::FuzzyMetadata),
        ]);
        let left = create_test_set(vec![Record::new("k")
            .with_field("title", "Business loans for MSMEs")
            .with_field("metaTitle", "Apply today")]);
        let right = create_test_set(vec![Record::new("k")
            .with_field("title", "Business loans for MSME")
            .with_field("metaTitle", "Something else entirely")]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let row = &report.rows[0];

        assert_eq!(row.field("title").unwrap().verdict, Verdict::NearMatch);
        assert_eq!(row.field("metaTitle").unwrap().verdict, Verdict::Mismatch);
        assert_eq!(row.status, KeyStatus::Mismatch);
        assert_eq!(row.mismatch_count(), 1);
    }

    #[test]
    fn test_field_missing_on_one_side() {
        let config = create_test_config(vec![
            FieldSpec::new("title", ComparisonMode::FuzzyMetadata),
            FieldSpec::new("metaDescription", ComparisonMode::FuzzyMetadata),
        ]);
        let left = create_test_set(vec![Record::new("k")
            .with_field("title", "Same")
            .with_field("metaDescription", "Described")]);
        let right = create_test_set(vec![Record::new("k")
            .with_field("title", "Same")
            .with_field("metaDescription", "N/A")]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let row = &report.rows[0];

        let meta = row.field("metaDescription").unwrap();
        assert_eq!(meta.verdict, Verdict::Missing);
        assert_eq!(meta.similarity, None);
        assert_eq!(meta.right, None);
        // A missing field alone does not make the key a mismatch
        assert_eq!(row.status, KeyStatus::Match);
    }

    #[test]
    fn test_field_absent_on_both_sides() {
        let config = create_test_config(vec![FieldSpec::new("linkText", ComparisonMode::FuzzyMetadata)]);
        let left = create_test_set(vec![Record::new("k").with_field("linkText", "")]);
        let right = create_test_set(vec![Record::new("k")]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let field = &report.rows[0].fields[0];
        assert_eq!(field.verdict, Verdict::Match);
        assert_eq!(field.similarity, Some(1.0));
    }

    #[test]
    fn test_mapped_fields_and_boolean_words() {
        let config = create_test_config(vec![
            FieldSpec::mapped("content", "strapi_content", ComparisonMode::FuzzyContent),
            FieldSpec::new("isThisAFeaturedArticle", ComparisonMode::Exact).with_boolean_words(),
        ]);
        let left = create_test_set(vec![Record::new("k")
            .with_field("content", "Step 1: register. Step 2: apply!")
            .with_field("isThisAFeaturedArticle", "Yes")]);
        let right = create_test_set(vec![Record::new("k")
            .with_field("strapi_content", "step 1 register step 2 apply")
            .with_field("isThisAFeaturedArticle", "true")]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let row = &report.rows[0];

        assert_eq!(row.field("content").unwrap().verdict, Verdict::Match);
        assert_eq!(row.field("isThisAFeaturedArticle").unwrap().verdict, Verdict::Match);
        assert_eq!(row.status, KeyStatus::Match);
    }

    #[test]
    fn test_rows_sorted_and_complete() {
        let config = create_test_config(vec![FieldSpec::new("title", ComparisonMode::FuzzyMetadata)]);
        let left = create_test_set(vec![
            Record::new("c").with_field("title", "C"),
            Record::new("a").with_field("title", "A"),
        ]);
        let right = create_test_set(vec![
            Record::new("b").with_field("title", "B"),
            Record::new("a").with_field("title", "A"),
        ]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let keys: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();

        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(report.count_status(|s| s.is_missing()), 2);
        assert_eq!(report.field_labels, vec!["title".to_string()]);
    }

    #[test]
    fn test_content_differences_keep_sentence_breaks() {
        let config = create_test_config(vec![FieldSpec::mapped(
            "content",
            "strapi_content",
            ComparisonMode::FuzzyContent,
        )]);
        let left = create_test_set(vec![Record::new("k").with_field(
            "content",
            "Register on the portal. Upload your documents. Wait for approval from the bank. Receive the funds in your account.",
        )]);
        let right = create_test_set(vec![Record::new("k").with_field(
            "strapi_content",
            "Register on the portal. Wait for approval from the bank. Something totally different appears here now.",
        )]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        let field = report.rows[0].field("content").unwrap();

        assert_eq!(field.verdict, Verdict::Mismatch);
        assert!(field.differences.contains(&"- upload your documents".to_string()));
        assert!(field
            .differences
            .contains(&"+ something totally different appears here now".to_string()));
        assert!(!field.differences.iter().any(|d| d.contains("register on the portal")));
    }

    #[test]
    fn test_no_differences_without_mismatch() {
        let config = create_test_config(vec![FieldSpec::new("title", ComparisonMode::FuzzyMetadata)]);
        let left = create_test_set(vec![Record::new("k").with_field("title", "Same. Title")]);
        let right = create_test_set(vec![Record::new("k").with_field("title", "same. title")]);

        let report = Reconciler::new(config).reconcile(&left, &right);
        assert!(report.rows[0].fields[0].differences.is_empty());
    }

    #[test]
    fn test_classify() {
        assert_eq!(Verdict::classify(1.0, 0.95), Verdict::Match);
        assert_eq!(Verdict::classify(0.95, 0.95), Verdict::NearMatch);
        assert_eq!(Verdict::classify(0.949, 0.95), Verdict::Mismatch);
    }

    #[test]
    fn test_rounding_applies_before_classification() {
        assert_eq!(round3(0.99951), 1.0);
        assert_eq!(round3(0.97949), 0.979);
    }
}

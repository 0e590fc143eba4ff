// 📊 Report Output - CSV rows, text summary, sentence-level differences

use crate::reconciliation::{KeyStatus, ReconciliationReport, ReportRow, Verdict};
use crate::record::Side;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Written wherever a value or score is absent
pub const MISSING: &str = "MISSING";

/// Most sentence differences listed per field
const MAX_DIFFERENCES_PER_FIELD: usize = 20;

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_keys: usize,
    pub matched_keys: usize,
    pub mismatched_keys: usize,
    pub missing_left: usize,
    pub missing_right: usize,

    /// Field comparisons on keys present on both sides
    pub field_comparisons: usize,
    pub perfect_fields: usize,
    pub near_fields: usize,
    pub mismatched_fields: usize,
    pub missing_fields: usize,

    /// Keys with the most mismatching fields, worst first (top 5)
    pub top_keys: Vec<(String, usize)>,

    /// Every field with at least one mismatch, worst first
    pub field_mismatches: Vec<(String, usize)>,
}

impl ReportSummary {
    pub fn from_report(report: &ReconciliationReport) -> Self {
        let mut summary = ReportSummary {
            total_keys: report.rows.len(),
            ..Default::default()
        };
        let mut per_field: BTreeMap<&str, usize> = BTreeMap::new();

        for row in &report.rows {
            match row.status {
                KeyStatus::Match => summary.matched_keys += 1,
                KeyStatus::Mismatch => summary.mismatched_keys += 1,
                KeyStatus::Missing(Side::Left) => summary.missing_left += 1,
                KeyStatus::Missing(Side::Right) => summary.missing_right += 1,
            }
            if row.status.is_missing() {
                continue;
            }

            for field in &row.fields {
                summary.field_comparisons += 1;
                match field.verdict {
                    Verdict::Match => summary.perfect_fields += 1,
                    Verdict::NearMatch => summary.near_fields += 1,
                    Verdict::Missing => summary.missing_fields += 1,
                    Verdict::Mismatch => {
                        summary.mismatched_fields += 1;
                        *per_field.entry(field.label.as_str()).or_insert(0) += 1;
                    }
                }
            }

            let mismatches = row.mismatch_count();
            if mismatches > 0 {
                summary.top_keys.push((row.key.clone(), mismatches));
            }
        }

        // Stable sorts keep key / field order among ties
        summary.top_keys.sort_by(|a, b| b.1.cmp(&a.1));
        summary.top_keys.truncate(5);

        summary.field_mismatches = per_field
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        summary.field_mismatches.sort_by(|a, b| b.1.cmp(&a.1));

        summary
    }

    /// Share of keys that fully match, as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_keys == 0 {
            0.0
        } else {
            self.matched_keys as f64 / self.total_keys as f64 * 100.0
        }
    }

    fn field_rate(&self, count: usize) -> f64 {
        if self.field_comparisons == 0 {
            0.0
        } else {
            count as f64 / self.field_comparisons as f64 * 100.0
        }
    }

    pub fn render(&self, report: &ReconciliationReport) -> String {
        let mut out = String::new();
        let rule = "=".repeat(50);

        out.push_str(&format!(
            "Content Comparison Report - {}\n",
            report.reconciled_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("{}\n\n", rule));
        out.push_str(&format!("Total Keys Compared: {}\n", self.total_keys));
        out.push_str(&format!("Perfect Matches: {}\n", self.matched_keys));
        out.push_str(&format!("Mismatches Found: {}\n", self.mismatched_keys));
        out.push_str(&format!("Missing in {}: {}\n", report.left_label, self.missing_left));
        out.push_str(&format!("Missing in {}: {}\n", report.right_label, self.missing_right));
        out.push_str(&format!("Overall Match Rate: {:.2}%\n\n", self.match_rate()));

        out.push_str(&format!("Total Field Comparisons: {}\n", self.field_comparisons));
        out.push_str(&format!(
            "Perfect Field Matches: {} ({:.2}%)\n",
            self.perfect_fields,
            self.field_rate(self.perfect_fields)
        ));
        out.push_str(&format!(
            "Near Matches: {} ({:.2}%)\n",
            self.near_fields,
            self.field_rate(self.near_fields)
        ));
        out.push_str(&format!(
            "Missing Data Instances: {} ({:.2}%)\n",
            self.missing_fields,
            self.field_rate(self.missing_fields)
        ));
        out.push_str(&format!(
            "Low Similarity Cases: {} ({:.2}%)\n\n",
            self.mismatched_fields,
            self.field_rate(self.mismatched_fields)
        ));

        if !self.top_keys.is_empty() {
            out.push_str("Top Keys with Most Mismatches:\n");
            for (key, count) in &self.top_keys {
                out.push_str(&format!(" - {}: {} mismatches\n", key, count));
            }
            out.push('\n');
        }

        if !self.field_mismatches.is_empty() {
            out.push_str("Fields with Most Mismatches:\n");
            for (field, count) in &self.field_mismatches {
                out.push_str(&format!(" - {}: {} mismatches\n", field, count));
            }
        }

        out
    }
}

impl ReconciliationReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_report(self)
    }
}

// ============================================================================
// DIFFERENCES
// ============================================================================

/// Sentences missing on the right ("- ") and extra on the right ("+ ")
pub fn sentence_differences(left: &str, right: &str) -> Vec<String> {
    let left_sentences = split_sentences(left);
    let right_sentences = split_sentences(right);
    let diff = TextDiff::from_lines(&left_sentences, &right_sentences);

    diff.iter_all_changes()
        .filter_map(|change| {
            let sentence = change.value().trim();
            if sentence.is_empty() {
                return None;
            }
            match change.tag() {
                ChangeTag::Delete => Some(format!("- {}", sentence)),
                ChangeTag::Insert => Some(format!("+ {}", sentence)),
                ChangeTag::Equal => None,
            }
        })
        .collect()
}

/// One sentence per newline-terminated line, split on ". "
fn split_sentences(text: &str) -> String {
    text.split(". ")
        .map(|s| s.trim().trim_end_matches('.').trim_end())
        .filter(|s| !s.is_empty())
        .map(|s| format!("{}\n", s))
        .collect()
}

fn row_differences(row: &ReportRow) -> String {
    let mut lines = Vec::new();

    for field in row.fields.iter().filter(|f| f.is_mismatch()) {
        for diff in field.differences.iter().take(MAX_DIFFERENCES_PER_FIELD) {
            lines.push(format!("{}: {}", field.label, diff));
        }
    }

    lines.join("\n")
}

// ============================================================================
// CSV OUTPUT
// ============================================================================

/// Column headers: key, status, presence flags, per-field quadruples, differences
pub fn report_headers(report: &ReconciliationReport) -> Vec<String> {
    let mut headers = vec![
        "key".to_string(),
        "status".to_string(),
        "present_left".to_string(),
        "present_right".to_string(),
    ];

    for label in &report.field_labels {
        headers.push(format!("{}_{}", label, report.left_label));
        headers.push(format!("{}_{}", label, report.right_label));
        headers.push(format!("{}_similarity", label));
        headers.push(format!("{}_status", label));
    }

    headers.push("differences".to_string());
    headers
}

pub fn report_record(row: &ReportRow) -> Vec<String> {
    let mut record = vec![
        row.key.clone(),
        row.status.label().to_string(),
        row.in_left.to_string(),
        row.in_right.to_string(),
    ];

    for field in &row.fields {
        record.push(field.left.clone().unwrap_or_else(|| MISSING.to_string()));
        record.push(field.right.clone().unwrap_or_else(|| MISSING.to_string()));
        record.push(
            field
                .similarity
                .map(|s| format!("{}", s))
                .unwrap_or_else(|| MISSING.to_string()),
        );
        record.push(field.verdict.label().to_string());
    }

    record.push(row_differences(row));
    record
}

/// Write the report as CSV to any writer
pub fn write_report<W: Write>(writer: W, report: &ReconciliationReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(report_headers(report))?;
    for row in &report.rows {
        wtr.write_record(report_record(row))?;
    }
    wtr.flush()?;

    Ok(())
}

pub fn write_report_csv(path: &Path, report: &ReconciliationReport) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    write_report(file, report)
}

pub fn write_summary(path: &Path, report: &ReconciliationReport) -> Result<()> {
    let text = report.summary().render(report);
    std::fs::write(path, text).with_context(|| format!("Failed to write summary {}", path.display()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComparisonConfig, FieldSpec};
    use crate::reconciliation::Reconciler;
    use crate::record::{Record, RecordSet};
    use crate::similarity::ComparisonMode;

    fn create_test_report() -> ReconciliationReport {
        let mut config = ComparisonConfig::articles();
        config.fields = vec![
            FieldSpec::new("title", ComparisonMode::FuzzyMetadata),
            FieldSpec::new("categoryName", ComparisonMode::Exact),
        ];

        let left = RecordSet::from_records(vec![
            Record::new("/a").with_field("title", "Alpha").with_field("categoryName", "Tax"),
            Record::new("/b").with_field("title", "Beta").with_field("categoryName", "Loans"),
            Record::new("/c").with_field("title", "Gamma").with_field("categoryName", "Tax"),
        ]);
        let right = RecordSet::from_records(vec![
            Record::new("/a").with_field("title", "Alpha").with_field("categoryName", "Tax"),
            Record::new("/b").with_field("title", "Bravo").with_field("categoryName", "Credit"),
            Record::new("/d").with_field("title", "Delta").with_field("categoryName", "N/A"),
        ]);

        Reconciler::new(config).reconcile(&left, &right)
    }

    #[test]
    fn test_summary_counts() {
        let report = create_test_report();
        let summary = ReportSummary::from_report(&report);

        assert_eq!(summary.total_keys, 4);
        assert_eq!(summary.matched_keys, 1);
        assert_eq!(summary.mismatched_keys, 1);
        assert_eq!(summary.missing_left, 1);
        assert_eq!(summary.missing_right, 1);
        assert_eq!(summary.field_comparisons, 4);
        assert_eq!(summary.perfect_fields, 2);
        assert_eq!(summary.mismatched_fields, 2);
        assert_eq!(summary.top_keys, vec![("/b".to_string(), 2)]);
        assert_eq!(summary.field_mismatches.len(), 2);
        assert_eq!(summary.match_rate(), 25.0);
    }

    #[test]
    fn test_summary_render() {
        let report = create_test_report();
        let text = ReportSummary::from_report(&report).render(&report);

        assert!(text.starts_with("Content Comparison Report - "));
        assert!(text.contains("Total Keys Compared: 4"));
        assert!(text.contains("Missing in contentful: 1"));
        assert!(text.contains(" - /b: 2 mismatches"));
        assert!(text.contains("Overall Match Rate: 25.00%"));
    }

    #[test]
    fn test_empty_summary() {
        let mut report = create_test_report();
        report.rows.clear();
        let summary = ReportSummary::from_report(&report);
        assert_eq!(summary.match_rate(), 0.0);
        assert!(summary.render(&report).contains("Total Keys Compared: 0"));
    }

    #[test]
    fn test_sentence_differences() {
        let left = "register on the portal. upload documents. wait for approval";
        let right = "register on the portal. wait for approval. get funds";
        let diffs = sentence_differences(left, right);

        assert_eq!(diffs, vec!["- upload documents", "+ get funds"]);
        assert!(sentence_differences(left, left).is_empty());
    }

    #[test]
    fn test_report_csv() {
        let report = create_test_report();
        let mut buffer = Vec::new();
        write_report(&mut buffer, &report).unwrap();

        let mut rdr = csv::Reader::from_reader(buffer.as_slice());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "key");
        assert_eq!(&headers[2], "present_left");
        assert_eq!(&headers[4], "title_contentful");
        assert_eq!(&headers[7], "title_status");
        assert_eq!(headers.len(), report_headers(&report).len());

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);

        // "/c" exists only on the left
        assert_eq!(&rows[2][0], "/c");
        assert_eq!(&rows[2][1], "MISSING_RIGHT");
        assert_eq!(&rows[2][5], MISSING);
        assert_eq!(&rows[2][6], MISSING);

        // "/b" mismatches on both fields and lists differences
        assert_eq!(&rows[1][1], "MISMATCH");
        assert!(rows[1][12].contains("title: - beta"));
    }

    #[test]
    fn test_differences_column_lists_changed_sentences() {
        let mut config = ComparisonConfig::articles();
        config.fields = vec![FieldSpec::mapped("content", "strapi_content", ComparisonMode::FuzzyContent)];
        let left = RecordSet::from_records(vec![Record::new("/a").with_field(
            "content",
            "Check your eligibility online. Upload your documents. Wait for approval from the bank.",
        )]);
        let right = RecordSet::from_records(vec![Record::new("/a").with_field(
            "strapi_content",
            "Check your eligibility online. Wait for approval from the bank. Visit a branch near you.",
        )]);
        let report = Reconciler::new(config).reconcile(&left, &right);

        let record = report_record(&report.rows[0]);
        let differences = record.last().unwrap();
        assert_eq!(
            differences,
            "content: - upload your documents\ncontent: + visit a branch near you"
        );
    }

    #[test]
    fn test_write_files() {
        let report = create_test_report();
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("report.csv");
        let summary_path = dir.path().join("summary.txt");

        write_report_csv(&csv_path, &report).unwrap();
        write_summary(&summary_path, &report).unwrap();

        assert!(std::fs::read_to_string(&csv_path).unwrap().starts_with("key,status"));
        assert!(std::fs::read_to_string(&summary_path)
            .unwrap()
            .contains("Fields with Most Mismatches:"));
    }
}

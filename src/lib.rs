// CMS Reconcile - Core Library
// Exposes the comparison pipeline for the CLI and tests:
//   load (CSV / JSON export / API dump) → normalize → score → classify → report

pub mod config;         // Field specs, thresholds, presets
pub mod error;          // Error taxonomy + per-item diagnostics
pub mod export;         // JSON export / API dump ingestion
pub mod normalize;      // Text normalization modes
pub mod reconciliation; // Join by key, classify fields
pub mod record;         // Records, record sets, CSV I/O
pub mod report;         // CSV report, summary, differences
pub mod rich_text;      // Rich-text tree flattening
pub mod similarity;     // Ratio / TF-IDF cosine scoring

#[cfg(feature = "tui")]
pub mod ui;             // Terminal report browser

// Re-export commonly used types
pub use config::{
    ComparisonConfig, FieldSpec, KeyTransform,
    CONTENT_SIMILARITY_THRESHOLD, METADATA_SIMILARITY_THRESHOLD,
};
pub use error::{Diagnostic, DiagnosticKind, FlattenError, IngestError, SimilarityError};
pub use export::{load_json_file, records_from_api, records_from_export, strip_html, ExportOptions};
pub use normalize::{normalize, NormalizeMode, Normalizer};
pub use reconciliation::{
    FieldVerdict, KeyStatus, ReconciliationReport, Reconciler, ReportRow, Verdict,
};
pub use record::{load_csv, read_csv, write_csv, FieldValue, Record, RecordSet, Side};
pub use report::{sentence_differences, write_report, write_report_csv, write_summary, ReportSummary};
pub use rich_text::{flatten, flatten_value, ContentNode, FlattenOutcome, Flattener, TableRow};
pub use similarity::{similarity, ComparisonMode, SimilarityEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

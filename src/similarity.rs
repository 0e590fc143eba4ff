// 📏 Field Similarity Engine - Score two normalized strings in [0, 1]
// Short values: character-level Ratcliff/Obershelp ratio
// Long values:  TF-IDF cosine over the pair, falling back to the ratio

use crate::error::SimilarityError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token pattern is valid"));

// ============================================================================
// COMPARISON MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonMode {
    /// Long free text, lenient threshold
    FuzzyContent,

    /// Short text (titles, descriptions), strict threshold
    FuzzyMetadata,

    /// Identifier-like values (category, duration, flags): identical or not
    Exact,
}

impl ComparisonMode {
    pub fn name(&self) -> &str {
        match self {
            ComparisonMode::FuzzyContent => "fuzzy-content",
            ComparisonMode::FuzzyMetadata => "fuzzy-metadata",
            ComparisonMode::Exact => "exact",
        }
    }

    pub fn is_fuzzy(&self) -> bool {
        !matches!(self, ComparisonMode::Exact)
    }
}

// ============================================================================
// SIMILARITY ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    /// Below this many characters (both sides) the character ratio is used (default: 50)
    pub length_threshold: usize,
}

impl SimilarityEngine {
    pub fn new() -> Self {
        SimilarityEngine {
            length_threshold: 50,
        }
    }

    pub fn with_length_threshold(length_threshold: usize) -> Self {
        SimilarityEngine { length_threshold }
    }

    /// Score according to the field's comparison mode
    pub fn score(&self, mode: ComparisonMode, a: &str, b: &str) -> f64 {
        match mode {
            ComparisonMode::Exact => exact_similarity(a, b),
            ComparisonMode::FuzzyContent | ComparisonMode::FuzzyMetadata => self.similarity(a, b),
        }
    }

    /// Fuzzy similarity of two normalized strings
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }

        let a_len = a.chars().count();
        let b_len = b.chars().count();
        if a_len < self.length_threshold && b_len < self.length_threshold {
            return sequence_ratio(a, b);
        }

        match tfidf_cosine(a, b) {
            Ok(score) => score,
            Err(err) => {
                debug!("{}; using character ratio", err);
                sequence_ratio(a, b)
            }
        }
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Fuzzy similarity with the default 50-character threshold
pub fn similarity(a: &str, b: &str) -> f64 {
    SimilarityEngine::new().similarity(a, b)
}

/// 1.0 when identical, 0.0 otherwise
pub fn exact_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// CHARACTER RATIO (Ratcliff/Obershelp)
// ============================================================================

/// 2·M / T where M is the number of chars in recursively found longest common blocks
///
/// The pair is ordered (shorter first, then lexicographically) before matching,
/// so the score does not depend on argument order.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let (first, second) = if (a.len(), &a) <= (b.len(), &b) {
        (&a, &b)
    } else {
        (&b, &a)
    };

    let matches = matching_chars(first, second);
    (2.0 * matches as f64 / total as f64).clamp(0.0, 1.0)
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }

        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block in a[alo..ahi] × b[blo..bhi]; earliest in `a`, then in `b`
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo;
            if a[i] == b[j] {
                let k = prev[col] + 1;
                curr[col + 1] = k;
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            } else {
                curr[col + 1] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}

// ============================================================================
// TF-IDF COSINE
// ============================================================================

/// Cosine similarity of smoothed TF-IDF vectors built from exactly this pair
pub fn tfidf_cosine(a: &str, b: &str) -> Result<f64, SimilarityError> {
    let a_terms = term_counts(a);
    let b_terms = term_counts(b);

    if a_terms.is_empty() && b_terms.is_empty() {
        return Err(SimilarityError::Vectorization("empty vocabulary".to_string()));
    }
    if a_terms.is_empty() || b_terms.is_empty() {
        return Err(SimilarityError::Vectorization(
            "one side has no terms".to_string(),
        ));
    }

    let vocabulary: BTreeSet<&str> = a_terms
        .keys()
        .chain(b_terms.keys())
        .map(String::as_str)
        .collect();

    let shared = vocabulary
        .iter()
        .filter(|term| a_terms.contains_key(**term) && b_terms.contains_key(**term))
        .count();
    if shared == 0 {
        return Err(SimilarityError::Vectorization(
            "no shared terms".to_string(),
        ));
    }

    // Smoothed idf over a two-document corpus: ln((1 + n) / (1 + df)) + 1
    let docs = 2.0_f64;
    let mut dot = 0.0;
    let mut a_norm = 0.0;
    let mut b_norm = 0.0;

    for term in vocabulary {
        let a_count = a_terms.get(term).copied().unwrap_or(0) as f64;
        let b_count = b_terms.get(term).copied().unwrap_or(0) as f64;
        let df = (a_count > 0.0) as u8 as f64 + (b_count > 0.0) as u8 as f64;
        let idf = ((1.0 + docs) / (1.0 + df)).ln() + 1.0;

        let a_weight = a_count * idf;
        let b_weight = b_count * idf;
        dot += a_weight * b_weight;
        a_norm += a_weight * a_weight;
        b_norm += b_weight * b_weight;
    }

    let denominator = a_norm.sqrt() * b_norm.sqrt();
    if denominator == 0.0 {
        return Err(SimilarityError::Vectorization("zero-length vector".to_string()));
    }

    Ok((dot / denominator).clamp(0.0, 1.0))
}

fn term_counts(text: &str) -> BTreeMap<String, usize> {
    let lowered = text.to_lowercase();
    let mut counts = BTreeMap::new();
    for token in TOKEN_PATTERN.find_iter(&lowered) {
        *counts.entry(token.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

// ============================================================================
// TESTS
// ============================================================================

//! Bag-of-n-grams TF-IDF vectorizer over normalized feature strings.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Stop words dropped from the token stream before n-gram construction.
const STOP_WORDS: [&str; 48] = [
    "a", "about", "after", "all", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by",
    "can", "do", "for", "from", "had", "has", "have", "if", "in", "into", "is", "it", "its", "my",
    "no", "not", "of", "on", "or", "our", "so", "some", "such", "than", "that", "the", "their",
    "then", "there", "this", "to", "was", "will", "with",
];

/// Fitting options for [`TfidfVectorizer`].
#[derive(Debug, Clone)]
pub struct VectorizerOptions {
    /// Vocabulary cap; most frequent terms win, ties break lexicographically.
    pub max_features: usize,
    /// Smallest n-gram length, in words.
    pub ngram_min: usize,
    /// Largest n-gram length, in words.
    pub ngram_max: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum document-frequency fraction a term may have.
    pub max_df: f32,
}

impl Default for VectorizerOptions {
    fn default() -> Self {
        Self {
            max_features: 2000,
            ngram_min: 1,
            ngram_max: 3,
            min_df: 1,
            max_df: 0.95,
        }
    }
}

/// Fitted TF-IDF vectorizer state. Serialized as one of the two pipeline
/// blobs; [`TfidfVectorizer::validate`] guards reloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Term to column index, dense over `0..len`.
    vocabulary: BTreeMap<String, usize>,
    /// Smoothed inverse document frequency per column.
    idf: Vec<f32>,
    /// N-gram range the vocabulary was built with.
    ngram_min: usize,
    ngram_max: usize,
}

impl TfidfVectorizer {
    /// Fit a vocabulary and idf weights over normalized documents.
    pub fn fit(documents: &[String], options: &VectorizerOptions) -> Result<Self, String> {
        if documents.is_empty() {
            return Err("Cannot fit vectorizer on an empty corpus".to_string());
        }
        if options.ngram_min == 0 || options.ngram_min > options.ngram_max {
            return Err("Invalid n-gram range".to_string());
        }

        let n_docs = documents.len();
        let mut doc_frequency: HashMap<String, usize> = HashMap::new();
        let mut total_frequency: HashMap<String, u64> = HashMap::new();
        for document in documents {
            let mut counts: HashMap<String, u64> = HashMap::new();
            for term in extract_ngrams(document, options.ngram_min, options.ngram_max) {
                *counts.entry(term).or_insert(0) += 1;
            }
            for (term, count) in counts {
                *total_frequency.entry(term.clone()).or_insert(0) += count;
                *doc_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let df_cap = (options.max_df * n_docs as f32).floor() as usize;
        let mut candidates: Vec<(String, u64, usize)> = doc_frequency
            .into_iter()
            .filter(|(_, df)| *df >= options.min_df && *df <= df_cap.max(1))
            .map(|(term, df)| {
                let tf = total_frequency.get(&term).copied().unwrap_or(0);
                (term, tf, df)
            })
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(options.max_features);
        if candidates.is_empty() {
            return Err("Vectorizer vocabulary is empty after frequency filtering".to_string());
        }

        // Column order is alphabetical so fitting is order-independent.
        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(candidates.len());
        for (index, (term, _, df)) in candidates.into_iter().enumerate() {
            vocabulary.insert(term, index);
            idf.push(((1 + n_docs) as f32 / (1 + df) as f32).ln() + 1.0);
        }

        Ok(Self {
            vocabulary,
            idf,
            ngram_min: options.ngram_min,
            ngram_max: options.ngram_max,
        })
    }

    /// Transform one normalized document into an L2-normalized dense row.
    pub fn transform(&self, document: &str) -> Vec<f32> {
        let mut row = vec![0.0f32; self.idf.len()];
        for term in extract_ngrams(document, self.ngram_min, self.ngram_max) {
            if let Some(&index) = self.vocabulary.get(&term) {
                row[index] += 1.0;
            }
        }
        for (index, value) in row.iter_mut().enumerate() {
            *value *= self.idf[index];
        }
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }
        row
    }

    /// Number of vocabulary columns.
    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// Structural check applied after deserializing persisted state.
    pub fn validate(&self) -> Result<(), String> {
        if self.vocabulary.len() != self.idf.len() {
            return Err("Vocabulary and idf lengths differ".to_string());
        }
        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            return Err("Invalid n-gram range in persisted vectorizer".to_string());
        }
        let mut seen = vec![false; self.idf.len()];
        for &index in self.vocabulary.values() {
            if index >= self.idf.len() || seen[index] {
                return Err("Vocabulary indices are not dense".to_string());
            }
            seen[index] = true;
        }
        Ok(())
    }
}

/// Extract word n-grams after stop-word removal. Input is expected to be
/// normalized already; tokens are whatever whitespace-separated runs remain.
fn extract_ngrams(document: &str, ngram_min: usize, ngram_max: usize) -> Vec<String> {
    let tokens: Vec<&str> = document
        .split_whitespace()
        .filter(|token| !STOP_WORDS.contains(token))
        .collect();
    let mut terms = Vec::new();
    for n in ngram_min..=ngram_max {
        if n == 0 || n > tokens.len() {
            continue;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

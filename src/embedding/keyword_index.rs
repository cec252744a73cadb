/// BM25 keyword statistics over the chunk collection
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeywordIndexError {
    #[error("Cannot build a keyword index over an empty collection")]
    EmptyCollection,

    #[error("Keyword index covers {index} chunks but the collection holds {chunks}")]
    Misaligned { index: usize, chunks: usize },

    #[error("Invalid BM25 parameter: {0}")]
    InvalidParameter(String),

    #[error("Inconsistent keyword index: {0}")]
    Inconsistent(String),
}

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    /// Fraction of the average idf given to terms whose idf would be negative
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Term occurrence inside one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub position: usize,
    pub tf: u32,
}

/// Scored keyword hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordHit {
    pub position: usize,
    pub score: f64,
}

/// Okapi BM25 index addressed by chunk position
///
/// Ordered maps keep the serialized form stable across rebuilds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordIndex {
    params: Bm25Params,
    doc_lengths: Vec<u32>,
    avgdl: f64,
    postings: BTreeMap<String, Vec<Posting>>,
    idf: BTreeMap<String, f64>,
}

impl KeywordIndex {
    /// Build from one token list per chunk, in chunk order
    pub fn build(documents: &[Vec<String>], params: Bm25Params) -> Result<Self, KeywordIndexError> {
        if documents.is_empty() {
            return Err(KeywordIndexError::EmptyCollection);
        }
        if params.k1 < 0.0 || !(0.0..=1.0).contains(&params.b) || params.epsilon < 0.0 {
            return Err(KeywordIndexError::InvalidParameter(format!(
                "k1={}, b={}, epsilon={}",
                params.k1, params.b, params.epsilon
            )));
        }

        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut total_len: u64 = 0;

        for (position, tokens) in documents.iter().enumerate() {
            doc_lengths.push(tokens.len() as u32);
            total_len += tokens.len() as u64;

            let mut counts: HashMap<&str, u32> = HashMap::new();
            for token in tokens {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings
                    .entry(term.to_string())
                    .or_default()
                    .push(Posting { position, tf });
            }
        }

        // Positions are visited in order, so every list is already sorted
        let n = documents.len() as f64;
        let avgdl = total_len as f64 / n;

        let mut idf = BTreeMap::new();
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, list) in &postings {
            let df = list.len() as f64;
            let value = ((n - df + 0.5) / (df + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }

        let floor = params.epsilon * idf_sum / postings.len().max(1) as f64;
        for term in negative {
            idf.insert(term, floor);
        }

        Ok(Self {
            params,
            doc_lengths,
            avgdl,
            postings,
            idf,
        })
    }

    /// Number of chunks covered
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// BM25 score of every chunk for the query
    ///
    /// Repeated query tokens contribute once per occurrence; unknown tokens
    /// contribute nothing.
    pub fn scores(&self, query_tokens: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.len()];
        if self.avgdl == 0.0 {
            return scores;
        }

        let Bm25Params { k1, b, .. } = self.params;
        for token in query_tokens {
            let (Some(idf), Some(list)) = (self.idf.get(token), self.postings.get(token)) else {
                continue;
            };
            for posting in list {
                let Some(&dl) = self.doc_lengths.get(posting.position) else {
                    continue;
                };
                let tf = posting.tf as f64;
                let norm = tf + k1 * (1.0 - b + b * dl as f64 / self.avgdl);
                if let Some(score) = scores.get_mut(posting.position) {
                    *score += idf * (tf * (k1 + 1.0)) / norm;
                }
            }
        }
        scores
    }

    /// The `k` highest-scoring chunks, ties broken by lower position
    ///
    /// Zero-score chunks are not filtered; they fill remaining slots in
    /// position order.
    pub fn top_k(&self, query_tokens: &[String], k: usize) -> Vec<KeywordHit> {
        let mut hits: Vec<KeywordHit> = self
            .scores(query_tokens)
            .into_iter()
            .enumerate()
            .map(|(position, score)| KeywordHit { position, score })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }

    /// Check internal consistency of a deserialized index
    ///
    /// Every posting must point inside the collection and every posted
    /// term must carry an idf.
    pub fn validate(&self) -> Result<(), KeywordIndexError> {
        if !self.avgdl.is_finite() || self.avgdl < 0.0 {
            return Err(KeywordIndexError::Inconsistent(format!(
                "average chunk length is {}",
                self.avgdl
            )));
        }

        for (term, list) in &self.postings {
            if !self.idf.contains_key(term) {
                return Err(KeywordIndexError::Inconsistent(format!(
                    "term '{}' has postings but no idf",
                    term
                )));
            }
            if let Some(posting) = list.iter().find(|p| p.position >= self.len()) {
                return Err(KeywordIndexError::Inconsistent(format!(
                    "term '{}' posts to position {} of {}",
                    term,
                    posting.position,
                    self.len()
                )));
            }
        }
        Ok(())
    }

    /// Fail unless the index covers exactly `chunks` positions
    pub fn ensure_aligned(&self, chunks: usize) -> Result<(), KeywordIndexError> {
        if self.len() != chunks {
            return Err(KeywordIndexError::Misaligned {
                index: self.len(),
                chunks,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<Vec<String>> {
        texts
            .iter()
            .map(|t| t.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    fn query(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_rejects_empty_collection() {
        assert!(matches!(
            KeywordIndex::build(&[], Bm25Params::default()),
            Err(KeywordIndexError::EmptyCollection)
        ));
    }

    #[test]
    fn test_idf_matches_okapi_formula() {
        let corpus = docs(&["alpha beta", "beta gamma", "gamma delta", "delta alpha"]);
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();

        // df=2 of N=4: ln(2.5/2.5) = 0
        assert_eq!(index.idf("alpha"), Some(0.0));
        assert!(index.idf("unknown").is_none());
        assert_eq!(index.len(), 4);
        assert_eq!(index.vocabulary_size(), 4);
    }

    #[test]
    fn test_negative_idf_replaced_by_epsilon_floor() {
        // "common" appears in 3 of 4 chunks: ln(1.5/3.5) < 0
        let corpus = docs(&["common rare", "common", "common", "other"]);
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();

        let rare = (3.5f64 / 1.5).ln();
        let other = rare;
        let common = (1.5f64 / 3.5).ln();
        let average = (rare + other + common) / 3.0;

        let floored = index.idf("common").unwrap();
        assert!((floored - 0.25 * average).abs() < 1e-12);
        assert!(floored > 0.0);
    }

    #[test]
    fn test_scores_rank_matching_chunk_first() {
        let corpus = docs(&[
            "graph neural networks for molecules",
            "protein folding with transformers",
            "transformers transformers attention",
            "classical statistics",
        ]);
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();

        let hits = index.top_k(&query("protein"), 2);
        assert_eq!(hits[0].position, 1);
        assert!(hits[0].score > 0.0);
        assert_eq!(hits[1].score, 0.0);
    }

    #[test]
    fn test_repeated_query_tokens_count_twice() {
        let corpus = docs(&["apple pie", "banana split", "cherry tart"]);
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();

        let once = index.scores(&query("apple"))[0];
        let twice = index.scores(&query("apple apple"))[0];
        assert!((twice - 2.0 * once).abs() < 1e-12);
    }

    #[test]
    fn test_ties_prefer_lower_position() {
        let corpus = docs(&["x y", "z", "x y", "w", "v"]);
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();

        let positions: Vec<usize> = index
            .top_k(&query("x"), 4)
            .iter()
            .map(|h| h.position)
            .collect();
        assert_eq!(positions, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_unknown_query_yields_zero_scores_in_position_order() {
        let corpus = docs(&["a b", "c d", "e f"]);
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();

        let hits = index.top_k(&query("nothing here"), 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_all_empty_chunks_score_zero() {
        let corpus = vec![Vec::new(), Vec::new()];
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();
        assert_eq!(index.scores(&query("anything")), vec![0.0, 0.0]);
    }

    #[test]
    fn test_alignment_check() {
        let corpus = docs(&["a", "b"]);
        let index = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();
        assert!(index.ensure_aligned(2).is_ok());
        assert!(matches!(
            index.ensure_aligned(3),
            Err(KeywordIndexError::Misaligned { index: 2, chunks: 3 })
        ));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let corpus = docs(&["zeta alpha", "beta zeta", "alpha"]);
        let first = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();
        let second = KeywordIndex::build(&corpus, Bm25Params::default()).unwrap();

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);

        let restored: KeywordIndex = serde_json::from_str(&a).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.vocabulary_size(), first.vocabulary_size());
        assert!(restored.validate().is_ok());
    }

    const OUT_OF_RANGE: &str = r#"{
        "params": {"k1": 1.5, "b": 0.75, "epsilon": 0.25},
        "doc_lengths": [3],
        "avgdl": 3.0,
        "postings": {"alpha": [{"position": 5, "tf": 1}]},
        "idf": {"alpha": 0.5}
    }"#;

    #[test]
    fn test_validate_rejects_out_of_range_posting() {
        let index: KeywordIndex = serde_json::from_str(OUT_OF_RANGE).unwrap();
        assert!(index.ensure_aligned(1).is_ok());
        assert!(matches!(index.validate(), Err(KeywordIndexError::Inconsistent(_))));
    }

    #[test]
    fn test_validate_rejects_term_without_idf() {
        let json = OUT_OF_RANGE
            .replace(r#""position": 5"#, r#""position": 0"#)
            .replace(r#""alpha": 0.5"#, r#""beta": 0.5"#);
        let index: KeywordIndex = serde_json::from_str(&json).unwrap();
        assert!(matches!(index.validate(), Err(KeywordIndexError::Inconsistent(_))));
    }

    #[test]
    fn test_scoring_skips_out_of_range_posting() {
        let index: KeywordIndex = serde_json::from_str(OUT_OF_RANGE).unwrap();
        assert_eq!(index.scores(&query("alpha")), vec![0.0]);
        let hits = index.top_k(&query("alpha"), 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].position, 0);
    }
}

//! Candidate deduplication by chunk ID

use super::RetrievalCandidate;
use ahash::{HashSet, HashSetExt};

/// Drop repeated chunk IDs, keeping the first occurrence
///
/// Input order is preserved, so earlier lists take priority over later ones.
pub fn deduplicate_candidates(
    candidates: impl IntoIterator<Item = RetrievalCandidate>,
) -> impl Iterator<Item = RetrievalCandidate> {
    let mut seen: HashSet<u64> = HashSet::new();
    candidates
        .into_iter()
        .filter(move |candidate| seen.insert(candidate.chunk_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::CandidateSource;

    #[test]
    fn test_deduplication_keeps_first() {
        let candidates = vec![
            RetrievalCandidate::semantic(1, 0, 0.1),
            RetrievalCandidate::semantic(2, 1, 0.2),
            RetrievalCandidate::keyword(1, 0, 9.0), // Duplicate
        ];

        let deduped: Vec<_> = deduplicate_candidates(candidates).collect();

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].chunk_id, 1);
        assert_eq!(deduped[0].source, CandidateSource::Semantic);
    }
}

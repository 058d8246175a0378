//! Smoke checks for generated summaries. There are no reference summaries, so
//! retrieval is scored by whether an id prefix finds its own patient.

use crate::index::{IndexOptions, RetrievalIndex, TopK};
use crate::summary::SummaryStore;
use serde::Serialize;

pub const ID_PREFIX_LEN: usize = 8;

/// Fraction of patients whose id prefix retrieves their own summary first.
pub fn retrieval_accuracy(store: &SummaryStore, options: &IndexOptions) -> f64 {
    if store.is_empty() {
        return 0.0;
    }
    let index = RetrievalIndex::build(store.documents(), options);
    let correct = store
        .iter()
        .filter(|entry| {
            let prefix: String = entry.patient_id.chars().take(ID_PREFIX_LEN).collect();
            index
                .query(&prefix, TopK::from(1))
                .first()
                .is_some_and(|hit| hit.document == entry.summary)
        })
        .count();
    correct as f64 / store.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LengthStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summary lengths in characters.
pub fn length_statistics(store: &SummaryStore) -> LengthStats {
    let lengths: Vec<usize> = store.documents().map(|s| s.chars().count()).collect();
    let (Some(&min), Some(&max)) = (lengths.iter().min(), lengths.iter().max()) else {
        return LengthStats::default();
    };
    LengthStats {
        min: min as f64,
        max: max as f64,
        mean: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{TokenPattern, TokenizerOptions};

    fn store() -> SummaryStore {
        vec![
            ("abcdefgh".to_string(), "Patient abcdefgh: asthma".to_string()),
            ("zyxwvuts".to_string(), "Patient zyxwvuts: gout".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn id_prefix_finds_own_summary() {
        assert_eq!(retrieval_accuracy(&store(), &IndexOptions::default()), 1.0);
    }

    #[test]
    fn digit_ids_need_word_tokens() {
        let s: SummaryStore = vec![
            ("1234567890".to_string(), "Patient 1234567890: asthma".to_string()),
            ("9876543210".to_string(), "Patient 9876543210: gout".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(retrieval_accuracy(&s, &IndexOptions::default()), 0.0);

        // the 8-char prefix is not a whole token, so only an exact id token would match
        let opts = IndexOptions {
            tokenizer: TokenizerOptions { pattern: TokenPattern::Word, ..Default::default() },
            ..Default::default()
        };
        let ids: SummaryStore = vec![
            ("12345678".to_string(), "Patient 12345678: asthma".to_string()),
            ("98765432".to_string(), "Patient 98765432: gout".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(retrieval_accuracy(&ids, &opts), 1.0);
    }

    #[test]
    fn empty_store_scores_zero() {
        assert_eq!(retrieval_accuracy(&SummaryStore::new(), &IndexOptions::default()), 0.0);
        assert_eq!(length_statistics(&SummaryStore::new()), LengthStats::default());
    }

    #[test]
    fn lengths_count_characters() {
        let s: SummaryStore = vec![("a".to_string(), "café".to_string()), ("b".to_string(), "ab".to_string())]
            .into_iter()
            .collect();
        let stats = length_statistics(&s);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 3.0);
    }
}

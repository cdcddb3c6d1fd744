//! Sentence alignment between the two answers.

use std::collections::HashSet;

use crate::config::AlignmentConfig;
use crate::negation::contradiction_candidate;
use crate::normalize::extract_years;
use crate::similarity::{bigram_jaccard, position_score, similarity_ratio, year_overlap_score};
use crate::types::{MatchPair, SentenceUnit};

/// Outcome of aligning the sentences of answer A against answer B.
#[derive(Debug, Clone, Default)]
pub struct AlignmentResult {
    /// Committed one-to-one matches.
    pub matches: Vec<MatchPair>,
    /// Indices of A sentences left without a match, in sentence order.
    pub a_unmatched: Vec<usize>,
    /// Indices of B sentences left without a match, in sentence order.
    pub b_unmatched: Vec<usize>,
}

/// Scores candidate sentence pairs and commits a greedy one-to-one matching.
#[derive(Debug, Clone)]
pub struct AlignmentEngine {
    config: AlignmentConfig,
}

impl AlignmentEngine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Align two sentence sequences.
    ///
    /// Pairs flagged as negation contradictions are never match candidates,
    /// regardless of lexical similarity. Candidates at or above the match
    /// threshold are committed greedily, best score first, each index used
    /// at most once. Ties break on semantic score, then on the pair indices,
    /// so identical inputs always produce identical matchings.
    #[must_use]
    pub fn align(&self, a: &[SentenceUnit], b: &[SentenceUnit]) -> AlignmentResult {
        let mut candidates: Vec<MatchPair> = Vec::new();
        for unit_a in a {
            let a_years = extract_years(&unit_a.text);
            for unit_b in b {
                if contradiction_candidate(
                    &unit_a.text,
                    &unit_b.text,
                    self.config.negation_similarity_threshold,
                )
                .is_some()
                {
                    continue;
                }
                let b_years = extract_years(&unit_b.text);
                let semantic = similarity_ratio(&unit_a.canonical, &unit_b.canonical);
                let rule = 0.6 * bigram_jaccard(&unit_a.canonical, &unit_b.canonical)
                    + 0.4 * year_overlap_score(&a_years, &b_years);
                let position = position_score(unit_a.index, a.len(), unit_b.index, b.len());
                let score = self.config.semantic_weight * semantic
                    + self.config.rule_weight * rule
                    + self.config.position_weight * position;
                if score >= self.config.match_threshold {
                    candidates.push(MatchPair {
                        a_index: unit_a.index,
                        b_index: unit_b.index,
                        a_text: unit_a.text.clone(),
                        b_text: unit_b.text.clone(),
                        semantic_score: semantic,
                        rule_score: rule,
                        position_score: position,
                        match_score: score,
                    });
                }
            }
        }

        candidates.sort_by(|x, y| {
            y.match_score
                .total_cmp(&x.match_score)
                .then(y.semantic_score.total_cmp(&x.semantic_score))
                .then(x.a_index.cmp(&y.a_index))
                .then(x.b_index.cmp(&y.b_index))
        });

        let mut used_a: HashSet<usize> = HashSet::new();
        let mut used_b: HashSet<usize> = HashSet::new();
        let mut matches = Vec::new();
        for candidate in candidates {
            if used_a.contains(&candidate.a_index) || used_b.contains(&candidate.b_index) {
                continue;
            }
            used_a.insert(candidate.a_index);
            used_b.insert(candidate.b_index);
            matches.push(candidate);
        }

        let a_unmatched = a
            .iter()
            .map(|u| u.index)
            .filter(|i| !used_a.contains(i))
            .collect();
        let b_unmatched = b
            .iter()
            .map(|u| u.index)
            .filter(|i| !used_b.contains(i))
            .collect();

        AlignmentResult {
            matches,
            a_unmatched,
            b_unmatched,
        }
    }
}

impl Default for AlignmentEngine {
    fn default() -> Self {
        Self::new(AlignmentConfig::default())
    }
}

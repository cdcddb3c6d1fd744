//! Divergence report assembly.

use crate::align::AlignmentEngine;
use crate::claims::{claim_map, extract_claims};
use crate::config::AlignmentConfig;
use crate::conflicts::ConflictClassifier;
use crate::normalize::split_sentences;
use crate::similarity::similarity_ratio;
use crate::types::DivergenceReport;

/// Compares two answers and assembles the divergence report.
#[derive(Debug, Clone, Default)]
pub struct DivergenceEngine {
    alignment: AlignmentEngine,
    classifier: ConflictClassifier,
}

impl DivergenceEngine {
    /// Create an engine with the given alignment configuration.
    #[must_use]
    pub fn new(config: AlignmentConfig) -> Self {
        Self {
            alignment: AlignmentEngine::new(config.clone()),
            classifier: ConflictClassifier::new(config),
        }
    }

    /// Compare two raw answers.
    ///
    /// Pure and deterministic; empty inputs yield an empty report with the
    /// no-divergence summary.
    #[must_use]
    pub fn compare(&self, answer_a: &str, answer_b: &str) -> DivergenceReport {
        let a_sentences = split_sentences(answer_a);
        let b_sentences = split_sentences(answer_b);

        let alignment = self.alignment.align(&a_sentences, &b_sentences);
        let claims_a = claim_map(&extract_claims(&a_sentences));
        let claims_b = claim_map(&extract_claims(&b_sentences));
        let conflicts = self.classifier.classify(
            answer_a,
            answer_b,
            &a_sentences,
            &b_sentences,
            &alignment,
            &claims_a,
            &claims_b,
        );

        let mut matches = alignment.matches.clone();
        matches.sort_by_key(|m| m.a_index);
        let consensus: Vec<String> = matches
            .iter()
            .map(|m| m.consensus_text().to_string())
            .collect();
        let model_a_only: Vec<String> = alignment
            .a_unmatched
            .iter()
            .filter_map(|&i| a_sentences.get(i).map(|s| s.text.clone()))
            .collect();
        let model_b_only: Vec<String> = alignment
            .b_unmatched
            .iter()
            .filter_map(|&i| b_sentences.get(i).map(|s| s.text.clone()))
            .collect();

        let summary = build_summary(
            consensus.len(),
            model_a_only.len(),
            model_b_only.len(),
            conflicts.len(),
        );

        DivergenceReport {
            summary,
            similarity_ratio: round4(similarity_ratio(answer_a, answer_b)),
            consensus,
            model_a_only,
            model_b_only,
            conflicts,
        }
    }
}

/// Compare two answers with the default configuration.
#[must_use]
pub fn compare_answers(answer_a: &str, answer_b: &str) -> DivergenceReport {
    DivergenceEngine::default().compare(answer_a, answer_b)
}

fn build_summary(consensus: usize, a_only: usize, b_only: usize, conflicts: usize) -> String {
    let mut bits: Vec<String> = Vec::new();
    if consensus > 0 {
        bits.push(format!("共识句{consensus}条"));
    }
    if a_only > 0 {
        bits.push(format!("模型A独有{a_only}条"));
    }
    if b_only > 0 {
        bits.push(format!("模型B独有{b_only}条"));
    }
    if conflicts > 0 {
        bits.push(format!("冲突{conflicts}项"));
    }
    if bits.is_empty() {
        bits.push("未发现显著分歧".to_string());
    }
    bits.join("，")
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

//! Restructuring of a divergence report into labelled units.

use crate::types::{AnswerUnit, DivergenceReport, StructuredAnswer};

/// Build the structured representation downstream fusion consumes.
///
/// Unit ids are 1-based: `C{i}` for consensus, `A{i}` and `B{i}` for the
/// one-sided sentences, in report order. Conflicts are carried through
/// unchanged.
#[must_use]
pub fn restructure(
    answer_a: &str,
    answer_b: &str,
    report: &DivergenceReport,
) -> StructuredAnswer {
    StructuredAnswer {
        consensus_units: label_units("C", &report.consensus),
        model_a_units: label_units("A", &report.model_a_only),
        model_b_units: label_units("B", &report.model_b_only),
        conflict_units: report.conflicts.clone(),
        raw_answer_a: answer_a.to_string(),
        raw_answer_b: answer_b.to_string(),
    }
}

fn label_units(prefix: &str, texts: &[String]) -> Vec<AnswerUnit> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| AnswerUnit::new(format!("{prefix}{}", i + 1), text.clone()))
        .collect()
}

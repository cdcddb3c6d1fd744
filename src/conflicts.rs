//! Conflict classification over alignment results and extracted claims.

use std::collections::HashSet;

use crate::align::AlignmentResult;
use crate::claims::is_subject_char;
use crate::config::AlignmentConfig;
use crate::negation::contradiction_candidate;
use crate::normalize::{extract_years, first_year_sentence};
use crate::types::{ClaimMap, Conflict, ConflictType, SentenceUnit, Side};

/// Maximum length, in characters, of a heuristically extracted
/// contradiction subject.
const CONTRADICTION_SUBJECT_MAX_CHARS: usize = 20;

/// Predicate markers used to cut a contradiction subject out of a sentence.
/// `不是` precedes `是` so the negated form wins the earliest-position scan.
const PREDICATE_MARKERS: &[&str] = &["不是", "是", "拥有", "用于", "专利"];

/// Turns alignment results and claim maps into an ordered conflict list.
#[derive(Debug, Clone)]
pub struct ConflictClassifier {
    config: AlignmentConfig,
}

impl ConflictClassifier {
    /// Create a classifier with the given configuration.
    #[must_use]
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Produce conflicts in a fixed, deterministic order.
    ///
    /// Emission order: numeric differences per shared subject, omissions for
    /// one-sided subjects, contradictions among unmatched sentences, then
    /// the generic numeric fallback. Identical inputs always yield identical
    /// conflict ids.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn classify(
        &self,
        answer_a: &str,
        answer_b: &str,
        a_sentences: &[SentenceUnit],
        b_sentences: &[SentenceUnit],
        alignment: &AlignmentResult,
        claims_a: &ClaimMap,
        claims_b: &ClaimMap,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for (subject, claim_a) in claims_a {
            if let Some(claim_b) = claims_b.get(subject) {
                if claim_a.year != claim_b.year {
                    conflicts.push(
                        Conflict::new(
                            format!("year_conflict_{subject}"),
                            ConflictType::NumericDifference,
                            "Patent year inconsistency on same subject.",
                        )
                        .with_subject(subject.clone())
                        .with_claims(claim_a.sentence.clone(), claim_b.sentence.clone())
                        .with_years(vec![claim_a.year.clone()], vec![claim_b.year.clone()]),
                    );
                }
            }
        }

        for (subject, claim) in claims_a {
            if !claims_b.contains_key(subject) {
                conflicts.push(
                    Conflict::new(
                        format!("omission_{subject}_B"),
                        ConflictType::Omission,
                        "Claim missing in model B.",
                    )
                    .with_subject(subject.clone())
                    .with_claims(claim.sentence.clone(), String::new())
                    .with_years(vec![claim.year.clone()], Vec::new())
                    .with_missing_in(Side::B),
                );
            }
        }
        for (subject, claim) in claims_b {
            if !claims_a.contains_key(subject) {
                conflicts.push(
                    Conflict::new(
                        format!("omission_{subject}_A"),
                        ConflictType::Omission,
                        "Claim missing in model A.",
                    )
                    .with_subject(subject.clone())
                    .with_claims(String::new(), claim.sentence.clone())
                    .with_years(Vec::new(), vec![claim.year.clone()])
                    .with_missing_in(Side::A),
                );
            }
        }

        conflicts.extend(self.contradictions(a_sentences, b_sentences, alignment));

        let has_numeric = conflicts
            .iter()
            .any(|c| c.conflict_type == ConflictType::NumericDifference);
        if !has_numeric {
            let years_a = extract_years(answer_a);
            let years_b = extract_years(answer_b);
            let set_a: HashSet<&String> = years_a.iter().collect();
            let set_b: HashSet<&String> = years_b.iter().collect();
            if !years_a.is_empty() && !years_b.is_empty() && set_a != set_b {
                let claim_a = first_year_sentence(a_sentences)
                    .map(|s| s.text.clone())
                    .unwrap_or_default();
                let claim_b = first_year_sentence(b_sentences)
                    .map(|s| s.text.clone())
                    .unwrap_or_default();
                conflicts.push(
                    Conflict::new(
                        "year_conflict_generic",
                        ConflictType::NumericDifference,
                        "Potential year inconsistency detected.",
                    )
                    .with_claims(claim_a, claim_b)
                    .with_years(years_a, years_b),
                );
            }
        }

        conflicts
    }

    /// Greedy one-to-one contradiction assignment among unmatched sentences.
    fn contradictions(
        &self,
        a_sentences: &[SentenceUnit],
        b_sentences: &[SentenceUnit],
        alignment: &AlignmentResult,
    ) -> Vec<Conflict> {
        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for &ai in &alignment.a_unmatched {
            for &bi in &alignment.b_unmatched {
                let (Some(unit_a), Some(unit_b)) = (a_sentences.get(ai), b_sentences.get(bi))
                else {
                    continue;
                };
                if let Some(score) = contradiction_candidate(
                    &unit_a.text,
                    &unit_b.text,
                    self.config.negation_similarity_threshold,
                ) {
                    candidates.push((ai, bi, score));
                }
            }
        }
        candidates.sort_by(|x, y| {
            y.2.total_cmp(&x.2)
                .then(x.0.cmp(&y.0))
                .then(x.1.cmp(&y.1))
        });

        let mut used_a: HashSet<usize> = HashSet::new();
        let mut used_b: HashSet<usize> = HashSet::new();
        let mut conflicts = Vec::new();
        for (ai, bi, score) in candidates {
            if used_a.contains(&ai) || used_b.contains(&bi) {
                continue;
            }
            used_a.insert(ai);
            used_b.insert(bi);
            let text_a = &a_sentences[ai].text;
            let text_b = &b_sentences[bi].text;
            let ordinal = conflicts.len() + 1;
            let mut conflict = Conflict::new(
                format!("contradiction_{ordinal}"),
                ConflictType::Contradiction,
                "Contradictory statements detected.",
            )
            .with_claims(text_a.clone(), text_b.clone())
            .with_confidence_hint(score);
            if let Some(subject) = contradiction_subject(text_a) {
                conflict = conflict.with_subject(subject);
            }
            conflicts.push(conflict);
        }
        conflicts
    }
}

impl Default for ConflictClassifier {
    fn default() -> Self {
        Self::new(AlignmentConfig::default())
    }
}

/// Heuristic subject for a contradiction sentence.
///
/// Takes the subject-like run immediately before the earliest predicate
/// marker; falls back to the leading subject-like run of the sentence.
fn contradiction_subject(text: &str) -> Option<String> {
    let mut cut: Option<usize> = None;
    for marker in PREDICATE_MARKERS {
        if let Some(pos) = text.find(marker) {
            cut = Some(cut.map_or(pos, |c| c.min(pos)));
        }
    }
    if let Some(pos) = cut {
        let run = trailing_subject_run(&text[..pos]);
        if !run.is_empty() {
            return Some(run);
        }
    }
    let leading = leading_subject_run(text);
    (!leading.is_empty()).then_some(leading)
}

fn trailing_subject_run(prefix: &str) -> String {
    let chars: Vec<char> = prefix.trim_end().chars().collect();
    let mut start = chars.len();
    while start > 0
        && is_subject_char(chars[start - 1])
        && chars.len() - start < CONTRADICTION_SUBJECT_MAX_CHARS
    {
        start -= 1;
    }
    chars[start..].iter().collect()
}

fn leading_subject_run(text: &str) -> String {
    text.trim_start()
        .chars()
        .take_while(|c| is_subject_char(*c))
        .take(CONTRADICTION_SUBJECT_MAX_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignmentEngine;
    use crate::claims::{claim_map, extract_claims};
    use crate::normalize::split_sentences;

    fn classify(answer_a: &str, answer_b: &str) -> Vec<Conflict> {
        let a_sentences = split_sentences(answer_a);
        let b_sentences = split_sentences(answer_b);
        let alignment = AlignmentEngine::default().align(&a_sentences, &b_sentences);
        let claims_a = claim_map(&extract_claims(&a_sentences));
        let claims_b = claim_map(&extract_claims(&b_sentences));
        ConflictClassifier::default().classify(
            answer_a,
            answer_b,
            &a_sentences,
            &b_sentences,
            &alignment,
            &claims_a,
            &claims_b,
        )
    }

    #[test]
    fn test_numeric_conflict_on_shared_subject() {
        let conflicts = classify("该技术专利申请于2020年。", "该技术专利申请于2018年。");
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.conflict_id, "year_conflict_该技术");
        assert_eq!(c.conflict_type, ConflictType::NumericDifference);
        assert_eq!(c.model_a_years, vec!["2020"]);
        assert_eq!(c.model_b_years, vec!["2018"]);
        assert_eq!(c.description, "Patent year inconsistency on same subject.");
    }

    #[test]
    fn test_same_year_no_conflict() {
        let conflicts = classify("该技术专利申请于2020年。", "该技术专利申请于2020年。");
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_omission_conflicts_both_sides() {
        let conflicts = classify(
            "甲技术专利申请于2020年。",
            "乙技术专利申请于2020年。",
        );
        let ids: Vec<&str> = conflicts.iter().map(|c| c.conflict_id.as_str()).collect();
        assert!(ids.contains(&"omission_甲技术_B"));
        assert!(ids.contains(&"omission_乙技术_A"));
        let missing_b = conflicts
            .iter()
            .find(|c| c.conflict_id == "omission_甲技术_B")
            .unwrap();
        assert_eq!(missing_b.missing_in, Some(Side::B));
        assert_eq!(missing_b.model_a_years, vec!["2020"]);
        assert!(missing_b.model_b_years.is_empty());
    }

    #[test]
    fn test_contradiction_among_unmatched() {
        let conflicts = classify("木星是最大的行星。", "木星不是最大的行星。");
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.conflict_id, "contradiction_1");
        assert_eq!(c.conflict_type, ConflictType::Contradiction);
        assert_eq!(c.subject.as_deref(), Some("木星"));
        assert!(c.confidence_hint.unwrap() >= 0.82);
    }

    #[test]
    fn test_generic_fallback_without_subject_claims() {
        let conflicts = classify("成立时间是2001年。", "成立时间是2003年。");
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.conflict_id, "year_conflict_generic");
        assert_eq!(c.description, "Potential year inconsistency detected.");
        assert_eq!(c.model_a_years, vec!["2001"]);
        assert_eq!(c.model_b_years, vec!["2003"]);
        assert_eq!(c.model_a_claim, "成立时间是2001年");
    }

    #[test]
    fn test_generic_fallback_suppressed_by_subject_conflict() {
        let conflicts = classify(
            "该技术专利申请于2020年。另一事件发生于1995年。",
            "该技术专利申请于2018年。",
        );
        assert!(conflicts
            .iter()
            .all(|c| c.conflict_id != "year_conflict_generic"));
        assert!(conflicts
            .iter()
            .any(|c| c.conflict_id == "year_conflict_该技术"));
    }

    #[test]
    fn test_generic_fallback_requires_years_on_both_sides() {
        let conflicts = classify("事件发生于1995年。", "没有任何年份。");
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_contradiction_subject_heuristic() {
        assert_eq!(contradiction_subject("木星是最大的行星"), Some("木星".into()));
        assert_eq!(
            contradiction_subject("木星不是最大的行星"),
            Some("木星".into())
        );
        assert_eq!(contradiction_subject("引擎用于航天"), Some("引擎".into()));
        assert_eq!(
            contradiction_subject("今天天气很好"),
            Some("今天天气很好".into())
        );
    }
}

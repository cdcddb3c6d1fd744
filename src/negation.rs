//! Negation marker detection for contradiction screening.

use crate::normalize::canonicalize;

/// English negation markers, matched as whole lowercase tokens.
const ENGLISH_MARKERS: &[&str] = &[
    "not", "no", "never", "cannot", "can't", "isn't", "aren't", "won't",
];

/// Chinese negation markers, matched as substrings. Longer markers are listed
/// before their prefixes so stripping removes the most specific form first.
const CHINESE_MARKERS: &[&str] = &[
    "不是", "并非", "不会", "不能", "无法", "不可", "未能", "没有", "未", "无", "非",
];

/// Whether the text contains any negation marker.
#[must_use]
pub fn has_negation(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if CHINESE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return true;
    }
    lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .any(|token| ENGLISH_MARKERS.contains(&token))
}

/// Remove all negation markers from the text.
///
/// Chinese markers are removed as substrings, longest first. English markers
/// are removed token by token.
#[must_use]
pub fn strip_negation(text: &str) -> String {
    let mut stripped = text.to_lowercase();
    for marker in CHINESE_MARKERS {
        stripped = stripped.replace(marker, "");
    }
    stripped
        .split(|c: char| c == ' ' || c == '\t')
        .filter(|token| {
            let bare: String = token
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'')
                .collect();
            !ENGLISH_MARKERS.contains(&bare.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical form of the text with negation markers removed.
#[must_use]
pub fn stripped_canonical(text: &str) -> String {
    canonicalize(&strip_negation(text))
}

/// Test whether two sentences form a contradiction candidate.
///
/// A candidate requires exactly one side to be negated and the two canonical
/// forms, after marker removal, to score at least `threshold` similarity.
/// Returns the similarity score when the pair qualifies.
#[must_use]
pub fn contradiction_candidate(a: &str, b: &str, threshold: f64) -> Option<f64> {
    if has_negation(a) == has_negation(b) {
        return None;
    }
    let score = crate::similarity::similarity_ratio(&stripped_canonical(a), &stripped_canonical(b));
    (score >= threshold).then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_negation_chinese() {
        assert!(has_negation("木星不是最大的行星"));
        assert!(has_negation("该专利尚未公开"));
        assert!(!has_negation("木星是最大的行星"));
    }

    #[test]
    fn test_has_negation_english_tokens() {
        assert!(has_negation("It is not the largest"));
        assert!(has_negation("There is no evidence"));
        assert!(has_negation("it can't be true"));
    }

    #[test]
    fn test_has_negation_avoids_embedded_tokens() {
        // "know" and "nothing" contain "no" but are not negation tokens.
        assert!(!has_negation("we know the notation"));
    }

    #[test]
    fn test_strip_negation_chinese() {
        assert_eq!(strip_negation("木星不是行星"), "木星行星");
        // The longer marker is removed whole rather than as prefix pieces.
        assert_eq!(strip_negation("无法确认"), "确认");
    }

    #[test]
    fn test_strip_negation_english() {
        assert_eq!(strip_negation("it is not blue"), "it is blue");
        assert_eq!(strip_negation("it can't be"), "it be");
    }

    #[test]
    fn test_contradiction_candidate_detected() {
        let score = contradiction_candidate("木星是最大的行星", "木星不是最大的行星", 0.82);
        assert!(score.is_some());
        assert!((score.unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contradiction_candidate_both_plain() {
        assert!(contradiction_candidate("木星是行星", "土星是行星", 0.82).is_none());
    }

    #[test]
    fn test_contradiction_candidate_both_negated() {
        assert!(
            contradiction_candidate("木星不是恒星", "木星不是恒星", 0.82).is_none()
        );
    }

    #[test]
    fn test_contradiction_candidate_below_threshold() {
        assert!(contradiction_candidate("木星是最大的行星", "天气不好", 0.82).is_none());
    }
}

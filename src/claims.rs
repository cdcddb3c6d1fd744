//! Subject/year claim extraction from answer sentences.
//!
//! Claims are extracted by a prioritized list of surface pattern rules, one
//! claim at most per sentence (first matching rule wins). Extracted subjects
//! are normalized before they are used as claim-map keys.

use crate::types::{Claim, ClaimMap, SentenceUnit};

/// Maximum subject length, in characters, accepted by any rule.
const SUBJECT_MAX_CHARS: usize = 40;

/// Corporate suffixes stripped from Chinese subjects, longest first.
const CN_CORPORATE_SUFFIXES: &[&str] = &["股份有限公司", "有限公司", "公司", "集团"];

/// Corporate suffixes stripped from English subjects when separated from the
/// name by a space, hyphen, or underscore.
const EN_CORPORATE_SUFFIXES: &[&str] = &["inc", "corp", "ltd", "llc", "co"];

struct RawClaim {
    subject: String,
    year: String,
}

type RuleFn = fn(&str) -> Option<RawClaim>;

/// Pattern rules in priority order. The first rule that matches a sentence
/// produces its claim; later rules are not consulted for that sentence.
const RULES: &[RuleFn] = &[cn_filed, cn_submitted, cn_disclosed, cn_generic, en_filed];

/// Extract claims from an ordered sequence of sentences.
///
/// At most one claim per sentence. Claims whose subject normalizes to an
/// empty string are dropped.
#[must_use]
pub fn extract_claims(sentences: &[SentenceUnit]) -> Vec<Claim> {
    let mut claims = Vec::new();
    for unit in sentences {
        if let Some(raw) = RULES.iter().find_map(|rule| rule(&unit.text)) {
            let subject = normalize_subject(&raw.subject);
            if !subject.is_empty() {
                claims.push(Claim::new(subject, raw.year, unit.text.clone(), unit.index));
            }
        }
    }
    claims
}

/// Key claims by normalized subject.
///
/// When one answer claims the same subject twice, the later claim wins.
#[must_use]
pub fn claim_map(claims: &[Claim]) -> ClaimMap {
    claims
        .iter()
        .map(|c| (c.subject.clone(), c.clone()))
        .collect()
}

/// Normalize an extracted subject.
///
/// Truncates at the first `的` (the trailing relative clause), then strips
/// corporate-entity suffixes and a trailing English possessive marker until
/// no further reduction applies.
#[must_use]
pub fn normalize_subject(raw: &str) -> String {
    let mut subject = raw.trim().to_string();
    if let Some(pos) = subject.find('的') {
        subject.truncate(pos);
    }
    loop {
        let before = subject.clone();
        subject = strip_cn_corporate(&subject);
        subject = strip_en_corporate(&subject);
        subject = strip_possessive(&subject);
        subject = subject.trim().to_string();
        if subject == before {
            break;
        }
    }
    subject
}

fn strip_cn_corporate(subject: &str) -> String {
    for suffix in CN_CORPORATE_SUFFIXES {
        if let Some(head) = subject.strip_suffix(suffix) {
            return head.to_string();
        }
    }
    subject.to_string()
}

fn strip_en_corporate(subject: &str) -> String {
    for suffix in EN_CORPORATE_SUFFIXES {
        for form in [format!("{suffix}."), (*suffix).to_string()] {
            if subject.len() > form.len() && subject.is_char_boundary(subject.len() - form.len()) {
                let (head, tail) = subject.split_at(subject.len() - form.len());
                if tail.eq_ignore_ascii_case(&form) && head.ends_with([' ', '-', '_']) {
                    return head.trim_end_matches([' ', '-', '_']).to_string();
                }
            }
        }
    }
    subject.to_string()
}

fn strip_possessive(subject: &str) -> String {
    for marker in ["'s", "’s", "'", "’"] {
        if let Some(head) = subject.strip_suffix(marker) {
            return head.to_string();
        }
    }
    subject.to_string()
}

// Rule 1: <subject>专利(申请)?于<year>年
fn cn_filed(sentence: &str) -> Option<RawClaim> {
    let chars: Vec<char> = sentence.chars().collect();
    for anchor in occurrences(&chars, "专利") {
        let Some(subject) = subject_before(&chars, anchor) else {
            continue;
        };
        for start in optional_literal(&chars, anchor + 2, "申请") {
            if let Some(p) = literal_at(&chars, start, "于") {
                if let Some(year) = year_then_nian(&chars, p) {
                    return Some(RawClaim { subject, year });
                }
            }
        }
    }
    None
}

// Rule 2: <subject>专利(申请)?(提交|递交)于<year>年
fn cn_submitted(sentence: &str) -> Option<RawClaim> {
    let chars: Vec<char> = sentence.chars().collect();
    for anchor in occurrences(&chars, "专利") {
        let Some(subject) = subject_before(&chars, anchor) else {
            continue;
        };
        for start in optional_literal(&chars, anchor + 2, "申请") {
            for verb in ["提交", "递交"] {
                let Some(p) = literal_at(&chars, start, verb) else {
                    continue;
                };
                let Some(p) = literal_at(&chars, p, "于") else {
                    continue;
                };
                if let Some(year) = year_then_nian(&chars, p) {
                    return Some(RawClaim { subject, year });
                }
            }
        }
    }
    None
}

// Rule 3: <subject>专利(公开|公布)于<year>年
fn cn_disclosed(sentence: &str) -> Option<RawClaim> {
    let chars: Vec<char> = sentence.chars().collect();
    for anchor in occurrences(&chars, "专利") {
        let Some(subject) = subject_before(&chars, anchor) else {
            continue;
        };
        for verb in ["公开", "公布"] {
            let Some(p) = literal_at(&chars, anchor + 2, verb) else {
                continue;
            };
            let Some(p) = literal_at(&chars, p, "于") else {
                continue;
            };
            if let Some(year) = year_then_nian(&chars, p) {
                return Some(RawClaim { subject, year });
            }
        }
    }
    None
}

// Rule 4: <subject>(专利|申请) followed anywhere later in the sentence by <year>年
fn cn_generic(sentence: &str) -> Option<RawClaim> {
    let chars: Vec<char> = sentence.chars().collect();
    let mut anchors: Vec<usize> = occurrences(&chars, "专利");
    anchors.extend(occurrences(&chars, "申请"));
    anchors.sort_unstable();
    for anchor in anchors {
        let Some(subject) = subject_before(&chars, anchor) else {
            continue;
        };
        for p in anchor + 2..chars.len() {
            if let Some(year) = year_then_nian(&chars, p) {
                return Some(RawClaim { subject, year });
            }
        }
    }
    None
}

// Rule 5: <subject> patent|application (was) filed in <year>
fn en_filed(sentence: &str) -> Option<RawClaim> {
    let tokens: Vec<&str> = sentence.split_whitespace().collect();
    for i in 1..tokens.len() {
        if !tokens[i].eq_ignore_ascii_case("patent") && !tokens[i].eq_ignore_ascii_case("application")
        {
            continue;
        }
        let subject = tokens[i - 1];
        if !is_en_subject(subject) {
            continue;
        }
        let mut j = i + 1;
        if j < tokens.len() && tokens[j].eq_ignore_ascii_case("was") {
            j += 1;
        }
        if j >= tokens.len() || !tokens[j].eq_ignore_ascii_case("filed") {
            continue;
        }
        j += 1;
        if j >= tokens.len() || !tokens[j].eq_ignore_ascii_case("in") {
            continue;
        }
        j += 1;
        if j >= tokens.len() {
            continue;
        }
        let digits: String = tokens[j].chars().take_while(char::is_ascii_digit).collect();
        if digits.len() >= 4 && is_year(&digits[..4]) {
            return Some(RawClaim {
                subject: subject.to_string(),
                year: digits[..4].to_string(),
            });
        }
    }
    None
}

fn is_en_subject(token: &str) -> bool {
    let count = token.chars().count();
    (1..=SUBJECT_MAX_CHARS).contains(&count)
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_year(digits: &str) -> bool {
    digits.len() == 4
        && digits.chars().all(|c| c.is_ascii_digit())
        && (digits.starts_with("19") || digits.starts_with("20"))
}

pub(crate) fn is_subject_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Maximal run of subject characters ending right before `anchor`, capped at
/// [`SUBJECT_MAX_CHARS`]. Returns `None` when the run is empty.
fn subject_before(chars: &[char], anchor: usize) -> Option<String> {
    let mut start = anchor;
    while start > 0 && is_subject_char(chars[start - 1]) && anchor - start < SUBJECT_MAX_CHARS {
        start -= 1;
    }
    (start < anchor).then(|| chars[start..anchor].iter().collect())
}

/// All start positions of `needle` within `haystack`.
fn occurrences(haystack: &[char], needle: &str) -> Vec<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }
    (0..=haystack.len() - needle.len())
        .filter(|&i| haystack[i..i + needle.len()] == needle[..])
        .collect()
}

/// Match `needle` at `pos`, returning the position just past it.
fn literal_at(haystack: &[char], pos: usize, needle: &str) -> Option<usize> {
    let mut p = pos;
    for c in needle.chars() {
        if haystack.get(p) != Some(&c) {
            return None;
        }
        p += 1;
    }
    Some(p)
}

/// Continuation points for an optional literal, with-literal branch first.
fn optional_literal(haystack: &[char], pos: usize, needle: &str) -> Vec<usize> {
    match literal_at(haystack, pos, needle) {
        Some(after) => vec![after, pos],
        None => vec![pos],
    }
}

fn year_at(chars: &[char], pos: usize) -> Option<String> {
    if chars.len() < pos + 4 {
        return None;
    }
    let window = &chars[pos..pos + 4];
    let valid = window.iter().all(char::is_ascii_digit)
        && (window[0] == '1' && window[1] == '9' || window[0] == '2' && window[1] == '0');
    valid.then(|| window.iter().collect())
}

fn year_then_nian(chars: &[char], pos: usize) -> Option<String> {
    let year = year_at(chars, pos)?;
    literal_at(chars, pos + 4, "年")?;
    Some(year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::split_sentences;

    fn extract(text: &str) -> Vec<Claim> {
        extract_claims(&split_sentences(text))
    }

    #[test]
    fn test_cn_filed_with_application() {
        let claims = extract("该技术专利申请于2020年。");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "该技术");
        assert_eq!(claims[0].year, "2020");
        assert_eq!(claims[0].sentence_index, 0);
    }

    #[test]
    fn test_cn_filed_without_application() {
        let claims = extract("量子引擎专利于1999年。");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "量子引擎");
        assert_eq!(claims[0].year, "1999");
    }

    #[test]
    fn test_cn_submitted_variant() {
        let claims = extract("该技术专利申请提交于2021年。");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "该技术");
        assert_eq!(claims[0].year, "2021");
    }

    #[test]
    fn test_cn_disclosed_variant() {
        let claims = extract("该技术专利公开于2019年。");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].year, "2019");
    }

    #[test]
    fn test_cn_generic_fallback() {
        let claims = extract("该技术申请最早见于2018年。");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "该技术");
        assert_eq!(claims[0].year, "2018");
    }

    #[test]
    fn test_en_filed() {
        let claims = extract("The Acme patent was filed in 2015");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "Acme");
        assert_eq!(claims[0].year, "2015");
    }

    #[test]
    fn test_en_filed_application_no_was() {
        let claims = extract("The X9 application filed in 2016, later granted");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "X9");
        assert_eq!(claims[0].year, "2016");
    }

    #[test]
    fn test_one_claim_per_sentence() {
        // Matches both the filed rule and the generic rule; only one claim.
        let claims = extract("该技术专利申请于2020年并延续至2022年。");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].year, "2020");
    }

    #[test]
    fn test_no_subject_no_claim() {
        assert!(extract("专利于2020年。").is_empty());
        assert!(extract("没有相关内容。").is_empty());
    }

    #[test]
    fn test_claim_per_sentence_indexing() {
        let claims = extract("第一句没有。甲技术专利申请于2020年。乙技术专利申请于2021年。");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].sentence_index, 1);
        assert_eq!(claims[1].sentence_index, 2);
    }

    #[test]
    fn test_normalize_subject_corporate_cn() {
        assert_eq!(normalize_subject("华为有限公司"), "华为");
        assert_eq!(normalize_subject("华为集团"), "华为");
        assert_eq!(normalize_subject("华为股份有限公司"), "华为");
    }

    #[test]
    fn test_normalize_subject_trailing_de_clause() {
        assert_eq!(normalize_subject("华为的"), "华为");
        assert_eq!(normalize_subject("华为的核心技术"), "华为");
    }

    #[test]
    fn test_normalize_subject_english() {
        assert_eq!(normalize_subject("Acme-Inc"), "Acme");
        assert_eq!(normalize_subject("Acme's"), "Acme");
        // No separator before the suffix, so the name is kept intact.
        assert_eq!(normalize_subject("Cisco"), "Cisco");
    }

    #[test]
    fn test_claim_map_last_write_wins() {
        let claims = vec![
            Claim::new("该技术", "2020", "该技术专利申请于2020年", 0),
            Claim::new("该技术", "2021", "该技术专利申请于2021年", 3),
        ];
        let map = claim_map(&claims);
        assert_eq!(map.len(), 1);
        assert_eq!(map["该技术"].year, "2021");
        assert_eq!(map["该技术"].sentence_index, 3);
    }
}

//! Sentence splitting and text canonicalization.

use crate::types::SentenceUnit;

/// Characters that terminate a sentence, Latin and CJK.
const SENTENCE_TERMINATORS: &[char] = &[
    '.', '!', '?', ';', '。', '！', '？', '；', '\n', '\r',
];

/// Punctuation and bracket characters removed from canonical forms.
const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '\'', '"', '`', '-', '_', '(', ')', '[', ']', '{', '}', '<', '>',
    '。', '，', '！', '？', '；', '：', '、', '“', '”', '‘', '’', '（', '）', '【', '】', '《',
    '》', '〈', '〉', '「', '」',
];

/// Split raw answer text into ordered, trimmed sentence units.
///
/// Splits on any run of sentence-terminating punctuation or newlines, drops
/// empty pieces, and indexes units by their position in the result.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<SentenceUnit> {
    text.split(|c: char| SENTENCE_TERMINATORS.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, s)| SentenceUnit::new(index, s, canonicalize(s)))
        .collect()
}

/// Produce the canonical scoring form of a text fragment.
///
/// Lowercases, strips all whitespace, and strips the fixed punctuation set.
#[must_use]
pub fn canonicalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED_PUNCTUATION.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Extract all four-digit years (1900-2099) from a text, in order of occurrence.
///
/// Matches are consumed left to right, so overlapping candidates are not
/// reported twice.
#[must_use]
pub fn extract_years(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut years = Vec::new();
    let mut i = 0;
    while i + 4 <= chars.len() {
        let window = &chars[i..i + 4];
        if window.iter().all(char::is_ascii_digit)
            && (window[0] == '1' && window[1] == '9' || window[0] == '2' && window[1] == '0')
        {
            years.push(window.iter().collect());
            i += 4;
        } else {
            i += 1;
        }
    }
    years
}

/// Find the first sentence that contains any year.
#[must_use]
pub fn first_year_sentence(sentences: &[SentenceUnit]) -> Option<&SentenceUnit> {
    sentences.iter().find(|s| !extract_years(&s.text).is_empty())
}

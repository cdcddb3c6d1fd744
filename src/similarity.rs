//! Character-level similarity scores used by the alignment engine.

use std::collections::HashSet;

/// Length of the longest common subsequence between two character sequences.
///
/// Uses a rolling single-row DP table, so memory is `O(min(a, b))`.
#[must_use]
pub fn lcs_length(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };
    if short.is_empty() {
        return 0;
    }

    let mut row = vec![0usize; short.len() + 1];
    for &lc in long.iter() {
        let mut prev_diag = 0;
        for (j, &sc) in short.iter().enumerate() {
            let prev_row = row[j + 1];
            row[j + 1] = if lc == sc {
                prev_diag + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev_diag = prev_row;
        }
    }
    row[short.len()]
}

/// Similarity ratio in `[0, 1]` between two strings.
///
/// Defined as `2 * LCS / (len_a + len_b)` over character counts. Two empty
/// strings are fully similar.
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a + len_b == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = 2.0 * lcs_length(a, b) as f64 / (len_a + len_b) as f64;
    ratio
}

/// Jaccard similarity over character bigrams.
///
/// Strings shorter than two characters contribute no bigrams. An empty union
/// counts as full similarity, a one-sided empty set as none.
#[must_use]
pub fn bigram_jaccard(a: &str, b: &str) -> f64 {
    let set_a = bigrams(a);
    let set_b = bigrams(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    #[allow(clippy::cast_precision_loss)]
    let score = intersection as f64 / union as f64;
    score
}

fn bigrams(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Score the agreement between two year lists.
///
/// Any shared year scores 1.0, disjoint non-empty lists score 0.0, and a
/// side with no years at all scores a neutral 0.5.
#[must_use]
pub fn year_overlap_score(a_years: &[String], b_years: &[String]) -> f64 {
    if a_years.is_empty() || b_years.is_empty() {
        return 0.5;
    }
    let set_a: HashSet<&String> = a_years.iter().collect();
    if b_years.iter().any(|y| set_a.contains(y)) {
        1.0
    } else {
        0.0
    }
}

/// Score how close two sentences sit within their respective answers.
///
/// Positions are normalized to `[0, 1]`; an answer with at most one sentence
/// normalizes to 1.0. The score is one minus the absolute difference.
#[must_use]
pub fn position_score(a_index: usize, a_count: usize, b_index: usize, b_count: usize) -> f64 {
    let norm_a = normalized_position(a_index, a_count);
    let norm_b = normalized_position(b_index, b_count);
    1.0 - (norm_a - norm_b).abs()
}

#[allow(clippy::cast_precision_loss)]
fn normalized_position(index: usize, count: usize) -> f64 {
    if count <= 1 {
        1.0
    } else {
        index as f64 / (count - 1) as f64
    }
}

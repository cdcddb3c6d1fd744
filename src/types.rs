//! Core data structures for `Diverdict`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A unique identifier for a stored query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(pub String);

impl QueryId {
    /// Create a new random query ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a query ID from an existing string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two answers a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The first answer.
    A,
    /// The second answer.
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// One sentence from one answer, with its canonical scoring form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceUnit {
    /// Zero-based position within its answer.
    pub index: usize,
    /// Trimmed original text.
    pub text: String,
    /// Lowercased, whitespace- and punctuation-stripped form used by scorers.
    pub canonical: String,
}

impl SentenceUnit {
    /// Create a sentence unit from pre-computed parts.
    #[must_use]
    pub fn new(index: usize, text: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            canonical: canonical.into(),
        }
    }
}

/// An extracted subject/year factual assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Normalized subject.
    pub subject: String,
    /// Four-digit year string.
    pub year: String,
    /// Source sentence text.
    pub sentence: String,
    /// Index of the source sentence within its answer.
    pub sentence_index: usize,
}

impl Claim {
    /// Create a new claim.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        year: impl Into<String>,
        sentence: impl Into<String>,
        sentence_index: usize,
    ) -> Self {
        Self {
            subject: subject.into(),
            year: year.into(),
            sentence: sentence.into(),
            sentence_index,
        }
    }
}

/// Per-answer claim lookup keyed by normalized subject.
///
/// Built once per comparison from the ordered claim sequence; when two claims
/// share a subject within one answer, the later one wins.
pub type ClaimMap = BTreeMap<String, Claim>;

/// A committed sentence correspondence between the two answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    /// Sentence index in answer A.
    pub a_index: usize,
    /// Sentence index in answer B.
    pub b_index: usize,
    /// Sentence text from answer A.
    pub a_text: String,
    /// Sentence text from answer B.
    pub b_text: String,
    /// Edit-similarity component of the score.
    pub semantic_score: f64,
    /// Bigram/year-overlap component of the score.
    pub rule_score: f64,
    /// Positional component of the score.
    pub position_score: f64,
    /// Weighted composite score.
    pub match_score: f64,
}

impl MatchPair {
    /// The consensus text for this pair: the shorter of the two sentences.
    #[must_use]
    pub fn consensus_text(&self) -> &str {
        if self.a_text.chars().count() <= self.b_text.chars().count() {
            &self.a_text
        } else {
            &self.b_text
        }
    }
}

/// The kind of disagreement a [`Conflict`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// The same subject carries different numeric facts (years).
    NumericDifference,
    /// A subject is claimed by one answer only.
    Omission,
    /// Two statements agree in content but differ in polarity.
    Contradiction,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NumericDifference => write!(f, "numeric_difference"),
            Self::Omission => write!(f, "omission"),
            Self::Contradiction => write!(f, "contradiction"),
        }
    }
}

/// A structured disagreement unit with a stable, deterministic identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Stable identifier derived from type and subject (plus ordinal).
    pub conflict_id: String,
    /// Conflict kind.
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    /// Normalized subject, when one could be determined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// The originating claim sentence from answer A.
    #[serde(default)]
    pub model_a_claim: String,
    /// The originating claim sentence from answer B.
    #[serde(default)]
    pub model_b_claim: String,
    /// Years asserted by answer A.
    #[serde(default)]
    pub model_a_years: Vec<String>,
    /// Years asserted by answer B.
    #[serde(default)]
    pub model_b_years: Vec<String>,
    /// For omissions, the side the subject is missing from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_in: Option<Side>,
    /// For contradictions, the negation-stripped similarity of the pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_hint: Option<f64>,
}

impl Conflict {
    /// Create a conflict with the given id, type, and description.
    #[must_use]
    pub fn new(
        conflict_id: impl Into<String>,
        conflict_type: ConflictType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conflict_id: conflict_id.into(),
            conflict_type,
            subject: None,
            description: description.into(),
            model_a_claim: String::new(),
            model_b_claim: String::new(),
            model_a_years: Vec::new(),
            model_b_years: Vec::new(),
            missing_in: None,
            confidence_hint: None,
        }
    }

    /// Set the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set both claim sentences.
    #[must_use]
    pub fn with_claims(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.model_a_claim = a.into();
        self.model_b_claim = b.into();
        self
    }

    /// Set both year lists.
    #[must_use]
    pub fn with_years(mut self, a: Vec<String>, b: Vec<String>) -> Self {
        self.model_a_years = a;
        self.model_b_years = b;
        self
    }

    /// Set the side the subject is missing from.
    #[must_use]
    pub const fn with_missing_in(mut self, side: Side) -> Self {
        self.missing_in = Some(side);
        self
    }

    /// Set the contradiction confidence hint.
    #[must_use]
    pub const fn with_confidence_hint(mut self, hint: f64) -> Self {
        self.confidence_hint = Some(hint);
        self
    }
}

/// The aggregate output of one answer comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DivergenceReport {
    /// Human-readable count summary.
    pub summary: String,
    /// Global lexical similarity of the two full answers, 0 to 1.
    pub similarity_ratio: f64,
    /// Texts of sentences judged equivalent across both answers.
    pub consensus: Vec<String>,
    /// Texts of sentences only present in answer A.
    pub model_a_only: Vec<String>,
    /// Texts of sentences only present in answer B.
    pub model_b_only: Vec<String>,
    /// Typed conflicts between the answers.
    pub conflicts: Vec<Conflict>,
}

impl DivergenceReport {
    /// Whether any conflicts were detected.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Evidence authority ranking, L1 highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceTier {
    /// Primary authoritative sources.
    L1,
    /// Corroborated secondary sources.
    L2,
    /// Everything else.
    L3,
}

impl std::fmt::Display for EvidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L3 => write!(f, "L3"),
        }
    }
}

/// One read-only entry of the external evidence catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Subject the evidence speaks about.
    pub subject: String,
    /// Year the evidence supports.
    pub year: String,
    /// Provenance label.
    pub source: String,
    /// Authority tier.
    pub tier: EvidenceTier,
}

impl EvidenceItem {
    /// Create a new evidence item.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        year: impl Into<String>,
        source: impl Into<String>,
        tier: EvidenceTier,
    ) -> Self {
        Self {
            subject: subject.into(),
            year: year.into(),
            source: source.into(),
            tier,
        }
    }
}

/// Which side an adjudication selects, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Evidence supports answer A.
    A,
    /// Evidence supports answer B.
    B,
    /// Evidence does not disambiguate.
    #[serde(rename = "unknown")]
    Unknown,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The adjudication outcome for one conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjudicationResult {
    /// Which side the evidence selects.
    pub verdict: Verdict,
    /// Explanatory text built from the gate outcome.
    pub evidence_text: String,
    /// Concatenated provenance of the matched catalog items.
    pub source: String,
    /// The gate that produced this result ("L1", "L2", "L3_or_insufficient", or empty).
    pub source_tier: String,
    /// Whether the outcome is strong enough to select a side without review.
    pub auto_applied: bool,
    /// Outcome confidence, 0 to 1.
    pub confidence: f64,
}

impl AdjudicationResult {
    /// An unresolved result with the given explanation and confidence.
    #[must_use]
    pub fn unresolved(evidence_text: impl Into<String>, tier: impl Into<String>, confidence: f64) -> Self {
        Self {
            verdict: Verdict::Unknown,
            evidence_text: evidence_text.into(),
            source: String::new(),
            source_tier: tier.into(),
            auto_applied: false,
            confidence,
        }
    }
}

/// How a pair of answers was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Answers came from live provider calls.
    Live,
    /// Answers came from the canned mock table.
    Mock,
    /// A live call failed and a substitute answer was used.
    Fallback,
}

impl AnswerMode {
    /// Stable string form, used as part of cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
            Self::Fallback => "fallback",
        }
    }
}

/// The two resolved answers for one question, tagged with how they were obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPair {
    /// Answer from the first model.
    pub model_a: String,
    /// Answer from the second model.
    pub model_b: String,
    /// Acquisition mode tag.
    pub mode: AnswerMode,
}

impl AnswerPair {
    /// Create a new answer pair.
    #[must_use]
    pub fn new(model_a: impl Into<String>, model_b: impl Into<String>, mode: AnswerMode) -> Self {
        Self {
            model_a: model_a.into(),
            model_b: model_b.into(),
            mode,
        }
    }
}

/// A labelled unit of the restructured comparison output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerUnit {
    /// Unit label such as `C1`, `A2`, `B1`.
    pub unit_id: String,
    /// Unit text.
    pub text: String,
}

impl AnswerUnit {
    /// Create a new unit.
    #[must_use]
    pub fn new(unit_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            text: text.into(),
        }
    }
}

/// The structured representation downstream fusion consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StructuredAnswer {
    /// Consensus units, labelled `C1..Cn`.
    pub consensus_units: Vec<AnswerUnit>,
    /// Units only present in answer A, labelled `A1..An`.
    pub model_a_units: Vec<AnswerUnit>,
    /// Units only present in answer B, labelled `B1..Bn`.
    pub model_b_units: Vec<AnswerUnit>,
    /// The conflicts carried through for fusion.
    pub conflict_units: Vec<Conflict>,
    /// Raw answer A.
    pub raw_answer_a: String,
    /// Raw answer B.
    pub raw_answer_b: String,
}

/// The end-to-end result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Identifier of the stored query.
    pub query_id: QueryId,
    /// The divergence report.
    pub report: DivergenceReport,
    /// Adjudication outcomes keyed by conflict id, in conflict order.
    pub adjudications: Vec<(String, AdjudicationResult)>,
    /// The fused answer text.
    pub fused_answer: String,
    /// How the answers were obtained.
    pub mode: AnswerMode,
    /// Wall-clock processing time in milliseconds.
    pub elapsed_ms: u64,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
}

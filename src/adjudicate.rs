//! Tiered evidence gating for numeric conflicts.

use std::collections::{BTreeMap, HashSet};

use crate::config::AdjudicationConfig;
use crate::types::{
    AdjudicationResult, Conflict, ConflictType, EvidenceItem, EvidenceTier, Verdict,
};

/// Applies the tiered gating policy to conflicts against a catalog snapshot.
#[derive(Debug, Clone)]
pub struct EvidenceAdjudicator {
    config: AdjudicationConfig,
}

impl EvidenceAdjudicator {
    /// Create an adjudicator with the given configuration.
    #[must_use]
    pub fn new(config: AdjudicationConfig) -> Self {
        Self { config }
    }

    /// Adjudicate every conflict, input order preserved.
    ///
    /// Every conflict receives an entry, including types the evidence policy
    /// does not cover.
    #[must_use]
    pub fn adjudicate(
        &self,
        conflicts: &[Conflict],
        catalog: &[EvidenceItem],
    ) -> Vec<(String, AdjudicationResult)> {
        conflicts
            .iter()
            .map(|c| (c.conflict_id.clone(), self.adjudicate_one(c, catalog)))
            .collect()
    }

    /// Gating state machine, first satisfied state wins.
    fn adjudicate_one(&self, conflict: &Conflict, catalog: &[EvidenceItem]) -> AdjudicationResult {
        if conflict.conflict_type != ConflictType::NumericDifference {
            return AdjudicationResult::unresolved(
                "No evidence policy configured for this conflict type.",
                "",
                0.0,
            );
        }
        if conflict.model_a_years.is_empty() && conflict.model_b_years.is_empty() {
            return AdjudicationResult::unresolved(
                "Neither answer carries a year candidate.",
                "",
                0.0,
            );
        }

        let items = self.subject_items(conflict, catalog);

        if let Some(item) = items.iter().find(|i| i.tier == EvidenceTier::L1) {
            let year = item.year.clone();
            return self.resolved(conflict, &items, &year, "L1", self.config.l1_confidence);
        }

        if let Some(year) = self.l2_year(&items) {
            return self.resolved(conflict, &items, &year, "L2", self.config.l2_confidence);
        }

        let confidence = if items.is_empty() {
            0.0
        } else {
            self.config.insufficient_confidence
        };
        let mut result = AdjudicationResult::unresolved(
            format!(
                "A years={:?}, B years={:?}; no decisive evidence attached.",
                conflict.model_a_years, conflict.model_b_years
            ),
            "L3_or_insufficient",
            confidence,
        );
        result.source = self.join_sources(&items);
        result
    }

    /// Catalog items whose normalized subject matches the conflict subject.
    fn subject_items<'a>(
        &self,
        conflict: &Conflict,
        catalog: &'a [EvidenceItem],
    ) -> Vec<&'a EvidenceItem> {
        let Some(subject) = conflict.subject.as_deref() else {
            return Vec::new();
        };
        let key = self.normalize_subject(subject);
        catalog
            .iter()
            .filter(|item| self.normalize_subject(&item.subject) == key)
            .collect()
    }

    /// Lowercase, drop whitespace, strip the domain suffix token.
    fn normalize_subject(&self, subject: &str) -> String {
        let compact: String = subject
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        compact
            .strip_suffix(self.config.subject_suffix.as_str())
            .unwrap_or(&compact)
            .to_string()
    }

    /// The lowest year corroborated by enough independent L2 items.
    fn l2_year(&self, items: &[&EvidenceItem]) -> Option<String> {
        let mut by_year: BTreeMap<&str, Vec<&EvidenceItem>> = BTreeMap::new();
        for item in items {
            if item.tier == EvidenceTier::L2 {
                by_year.entry(item.year.as_str()).or_default().push(item);
            }
        }
        for (year, group) in by_year {
            if group.len() < self.config.min_l2_occurrences {
                continue;
            }
            let sources: HashSet<&str> = group.iter().map(|i| i.source.as_str()).collect();
            if sources.len() >= self.config.min_l2_sources {
                return Some(year.to_string());
            }
        }
        None
    }

    fn resolved(
        &self,
        conflict: &Conflict,
        items: &[&EvidenceItem],
        year: &str,
        tier: &str,
        confidence: f64,
    ) -> AdjudicationResult {
        let in_a = conflict.model_a_years.iter().any(|y| y == year);
        let in_b = conflict.model_b_years.iter().any(|y| y == year);
        let verdict = match (in_a, in_b) {
            (true, false) => Verdict::A,
            (false, true) => Verdict::B,
            _ => Verdict::Unknown,
        };
        let auto_applied = matches!(verdict, Verdict::A | Verdict::B);
        let evidence_text = match verdict {
            Verdict::A => format!("{tier} evidence supports year {year}, stated by model A."),
            Verdict::B => format!("{tier} evidence supports year {year}, stated by model B."),
            Verdict::Unknown => {
                format!("{tier} evidence selects year {year}, which does not disambiguate.")
            }
        };
        AdjudicationResult {
            verdict,
            evidence_text,
            source: self.join_sources(items),
            source_tier: tier.to_string(),
            auto_applied,
            confidence,
        }
    }

    /// First distinct provenance labels, bounded by the configured maximum.
    fn join_sources(&self, items: &[&EvidenceItem]) -> String {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut sources: Vec<&str> = Vec::new();
        for item in items {
            if sources.len() >= self.config.max_sources {
                break;
            }
            if seen.insert(item.source.as_str()) {
                sources.push(item.source.as_str());
            }
        }
        sources.join("; ")
    }
}

impl Default for EvidenceAdjudicator {
    fn default() -> Self {
        Self::new(AdjudicationConfig::default())
    }
}

/// Adjudicate conflicts with the default configuration.
#[must_use]
pub fn adjudicate(
    conflicts: &[Conflict],
    catalog: &[EvidenceItem],
) -> Vec<(String, AdjudicationResult)> {
    EvidenceAdjudicator::default().adjudicate(conflicts, catalog)
}

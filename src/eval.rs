//! Layered evaluation harness over the compare, adjudicate, fuse stages.
//!
//! Each case runs the synchronous core once and is graded per layer: L1
//! checks the detected conflict id set, L2 checks verdicts and auto-apply
//! flags, L3 checks required tokens in the fused answer.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::adjudicate::EvidenceAdjudicator;
use crate::catalog::EvidenceCatalog;
use crate::config::{AdjudicationConfig, AlignmentConfig};
use crate::fusion::generate_fused_answer;
use crate::report::DivergenceEngine;
use crate::restructure::restructure;
use crate::types::Verdict;

/// One evaluation case with its layered expectations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalCase {
    /// Case identifier.
    pub id: String,
    /// Grouping key for the tier breakdown table.
    pub tier_group: String,
    /// Provenance note carried into the case-details table.
    #[serde(default)]
    pub source_ref: String,
    /// Answer attributed to model A.
    pub answer_a: String,
    /// Answer attributed to model B.
    pub answer_b: String,
    /// Exact set of conflict ids the comparison must produce.
    #[serde(default)]
    pub expected_conflict_ids: Vec<String>,
    /// Per-conflict verdict expectations.
    #[serde(default)]
    pub expected_verdicts: BTreeMap<String, Verdict>,
    /// Per-conflict auto-apply expectations.
    #[serde(default)]
    pub expected_auto_applied: BTreeMap<String, bool>,
    /// Substrings the fused answer must contain.
    #[serde(default)]
    pub final_must_contain: Vec<String>,
}

impl EvalCase {
    /// Create a case from its id, tier group, and answer pair.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        tier_group: impl Into<String>,
        answer_a: impl Into<String>,
        answer_b: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tier_group: tier_group.into(),
            answer_a: answer_a.into(),
            answer_b: answer_b.into(),
            ..Self::default()
        }
    }

    /// Set the expected conflict id set.
    #[must_use]
    pub fn with_expected_conflicts<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_conflict_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Add a verdict expectation for one conflict.
    #[must_use]
    pub fn expect_verdict(mut self, conflict_id: impl Into<String>, verdict: Verdict) -> Self {
        self.expected_verdicts.insert(conflict_id.into(), verdict);
        self
    }

    /// Add an auto-apply expectation for one conflict.
    #[must_use]
    pub fn expect_auto_applied(mut self, conflict_id: impl Into<String>, auto: bool) -> Self {
        self.expected_auto_applied.insert(conflict_id.into(), auto);
        self
    }

    /// Require a substring in the fused answer.
    #[must_use]
    pub fn expect_final_contains(mut self, token: impl Into<String>) -> Self {
        self.final_must_contain.push(token.into());
        self
    }
}

/// The layer a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalLayer {
    /// Conflict detection.
    L1,
    /// Evidence adjudication.
    L2,
    /// Fusion output.
    L3,
}

impl std::fmt::Display for EvalLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L3 => write!(f, "L3"),
        }
    }
}

/// A single graded expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCheck {
    /// Layer the check grades.
    pub layer: EvalLayer,
    /// Whether the expectation held.
    pub passed: bool,
    /// Human-readable expected-versus-actual description.
    pub message: String,
}

/// The graded outcome of one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Case identifier.
    pub case_id: String,
    /// Tier group the case belongs to.
    pub tier_group: String,
    /// Provenance note from the case.
    pub source_ref: String,
    /// All graded checks in layer order.
    pub checks: Vec<EvalCheck>,
    /// Whether every L1 check passed.
    pub layer1_pass: bool,
    /// Whether every L2 check passed.
    pub layer2_pass: bool,
    /// Whether every L3 check passed.
    pub layer3_pass: bool,
    /// Conflict ids the case expected.
    pub expected_conflicts: BTreeSet<String>,
    /// Conflict ids the comparison produced.
    pub observed_conflicts: BTreeSet<String>,
    /// The fused answer the case produced.
    pub fused_answer: String,
}

impl CaseResult {
    /// Whether every check in the case passed.
    #[must_use]
    pub fn case_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

/// Pass counts for one layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LayerStats {
    /// Cases graded at this layer.
    pub total: usize,
    /// Cases where every check at this layer passed.
    pub passed: usize,
}

/// Per-tier pass counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TierStats {
    /// Cases in the tier.
    pub cases_total: usize,
    /// Cases with all checks passing.
    pub cases_pass: usize,
    /// Cases passing L1.
    pub layer1_pass: usize,
    /// Cases passing L2.
    pub layer2_pass: usize,
    /// Cases passing L3.
    pub layer3_pass: usize,
}

/// Aggregated results across all cases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalSummary {
    /// Number of cases graded.
    pub total_cases: usize,
    /// Cases with every check passing.
    pub pass_cases: usize,
    /// Total checks graded.
    pub total_checks: usize,
    /// Checks that passed.
    pub pass_checks: usize,
    /// L1 pass counts.
    pub layer1: LayerStats,
    /// L2 pass counts.
    pub layer2: LayerStats,
    /// L3 pass counts.
    pub layer3: LayerStats,
    /// Pass counts grouped by tier, sorted by tier name.
    pub tier_stats: BTreeMap<String, TierStats>,
    /// Conflict ids both expected and observed.
    pub conflict_tp: usize,
    /// Conflict ids observed but not expected.
    pub conflict_fp: usize,
    /// Conflict ids expected but not observed.
    pub conflict_fn: usize,
    /// Conflict detection precision.
    pub conflict_precision: f64,
    /// Conflict detection recall.
    pub conflict_recall: f64,
    /// Conflict detection F1.
    pub conflict_f1: f64,
}

impl EvalSummary {
    /// Whether every case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.pass_cases == self.total_cases
    }
}

fn pct(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        return "N/A".to_string();
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = numerator as f64 / denominator as f64;
    format!("{:.1}%", ratio * 100.0)
}

fn fmt_ratio(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn safe_divide(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        numerator as f64 / denominator as f64
    }
}

/// Runs evaluation cases through the synchronous core.
#[derive(Debug, Default)]
pub struct EvalRunner {
    engine: DivergenceEngine,
    adjudicator: EvidenceAdjudicator,
    catalog: EvidenceCatalog,
}

impl EvalRunner {
    /// Create a runner with explicit configurations.
    #[must_use]
    pub fn new(alignment: AlignmentConfig, adjudication: AdjudicationConfig) -> Self {
        Self {
            engine: DivergenceEngine::new(alignment),
            adjudicator: EvidenceAdjudicator::new(adjudication),
            catalog: EvidenceCatalog::empty(),
        }
    }

    /// Attach the evidence catalog cases are adjudicated against.
    #[must_use]
    pub fn with_catalog(mut self, catalog: EvidenceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Grade a single case.
    #[must_use]
    pub fn run_case(&self, case: &EvalCase) -> CaseResult {
        let report = self.engine.compare(&case.answer_a, &case.answer_b);
        let adjudications = self
            .adjudicator
            .adjudicate(&report.conflicts, self.catalog.items());
        let structured = restructure(&case.answer_a, &case.answer_b, &report);
        let fused_answer = generate_fused_answer(&structured, &adjudications);

        let observed: BTreeSet<String> = report
            .conflicts
            .iter()
            .map(|c| c.conflict_id.clone())
            .collect();
        let expected: BTreeSet<String> = case.expected_conflict_ids.iter().cloned().collect();

        let outcomes: BTreeMap<&str, &crate::types::AdjudicationResult> = adjudications
            .iter()
            .map(|(cid, result)| (cid.as_str(), result))
            .collect();

        let mut checks = Vec::new();

        let layer1_pass = observed == expected;
        checks.push(EvalCheck {
            layer: EvalLayer::L1,
            passed: layer1_pass,
            message: format!(
                "expected_conflicts={expected:?}, observed_conflicts={observed:?}"
            ),
        });

        let mut layer2_pass = true;
        for (cid, expected_verdict) in &case.expected_verdicts {
            let actual = outcomes
                .get(cid.as_str())
                .map_or_else(|| "missing".to_string(), |r| r.verdict.to_string());
            let passed = actual == expected_verdict.to_string();
            layer2_pass = layer2_pass && passed;
            checks.push(EvalCheck {
                layer: EvalLayer::L2,
                passed,
                message: format!("{cid} verdict expected={expected_verdict}, actual={actual}"),
            });
        }
        for (cid, expected_auto) in &case.expected_auto_applied {
            let actual = outcomes
                .get(cid.as_str())
                .map_or_else(|| "missing".to_string(), |r| r.auto_applied.to_string());
            let passed = actual == expected_auto.to_string();
            layer2_pass = layer2_pass && passed;
            checks.push(EvalCheck {
                layer: EvalLayer::L2,
                passed,
                message: format!("{cid} auto_applied expected={expected_auto}, actual={actual}"),
            });
        }

        let mut layer3_pass = true;
        for token in &case.final_must_contain {
            let passed = fused_answer.contains(token.as_str());
            layer3_pass = layer3_pass && passed;
            checks.push(EvalCheck {
                layer: EvalLayer::L3,
                passed,
                message: format!("final contains '{token}'"),
            });
        }

        CaseResult {
            case_id: case.id.clone(),
            tier_group: case.tier_group.clone(),
            source_ref: case.source_ref.clone(),
            checks,
            layer1_pass,
            layer2_pass,
            layer3_pass,
            expected_conflicts: expected,
            observed_conflicts: observed,
            fused_answer,
        }
    }

    /// Grade every case and aggregate the results.
    #[must_use]
    pub fn run(&self, cases: &[EvalCase]) -> EvalReport {
        let results: Vec<CaseResult> = cases.iter().map(|c| self.run_case(c)).collect();
        let summary = summarize(&results);
        EvalReport { results, summary }
    }
}

/// Graded case results plus their aggregate summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Per-case outcomes in input order.
    pub results: Vec<CaseResult>,
    /// The aggregate across all cases.
    pub summary: EvalSummary,
}

impl EvalReport {
    /// Render the markdown report.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let agg = &self.summary;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut lines = Vec::new();

        lines.push("# Divergence Benchmark Report".to_string());
        lines.push(String::new());
        lines.push(format!("- Timestamp: `{timestamp}`"));
        lines.push(format!(
            "- Cases passed: `{}/{}` ({})",
            agg.pass_cases,
            agg.total_cases,
            pct(agg.pass_cases, agg.total_cases)
        ));
        lines.push(format!(
            "- Checks passed: `{}/{}` ({})",
            agg.pass_checks,
            agg.total_checks,
            pct(agg.pass_checks, agg.total_checks)
        ));
        lines.push(String::new());

        lines.push("## Layer Metrics".to_string());
        lines.push(String::new());
        for (name, stat) in [("L1", agg.layer1), ("L2", agg.layer2), ("L3", agg.layer3)] {
            lines.push(format!(
                "- {name} pass: `{}/{}` ({})",
                stat.passed,
                stat.total,
                pct(stat.passed, stat.total)
            ));
        }
        lines.push(String::new());

        lines.push("## Conflict Detection Error Analysis".to_string());
        lines.push(String::new());
        lines.push(format!("- TP: `{}`", agg.conflict_tp));
        lines.push(format!("- FP: `{}`", agg.conflict_fp));
        lines.push(format!("- FN: `{}`", agg.conflict_fn));
        lines.push(format!("- Precision: `{}`", fmt_ratio(agg.conflict_precision)));
        lines.push(format!("- Recall: `{}`", fmt_ratio(agg.conflict_recall)));
        lines.push(format!("- F1: `{}`", fmt_ratio(agg.conflict_f1)));
        lines.push(String::new());

        lines.push("## Tier Breakdown".to_string());
        lines.push(String::new());
        lines.push("| tier_group | cases | case_pass_rate | L1_pass | L2_pass | L3_pass |".to_string());
        lines.push("|---|---|---|---|---|---|".to_string());
        for (tier, t) in &agg.tier_stats {
            lines.push(format!(
                "| {tier} | {} | {} | {} | {} | {} |",
                t.cases_total,
                pct(t.cases_pass, t.cases_total),
                pct(t.layer1_pass, t.cases_total),
                pct(t.layer2_pass, t.cases_total),
                pct(t.layer3_pass, t.cases_total)
            ));
        }
        lines.push(String::new());

        lines.push("## Case Details".to_string());
        lines.push(String::new());
        lines.push("| case_id | source_ref | tier_group | result | failed_checks |".to_string());
        lines.push("|---|---|---|---|---|".to_string());
        for r in &self.results {
            let failed: Vec<&str> = r
                .checks
                .iter()
                .filter(|c| !c.passed)
                .map(|c| c.message.as_str())
                .collect();
            let failed_text = if failed.is_empty() {
                "-".to_string()
            } else {
                failed.join(" ; ")
            };
            let verdict = if r.case_passed() { "PASS" } else { "FAIL" };
            lines.push(format!(
                "| {} | {} | {} | {verdict} | {failed_text} |",
                r.case_id, r.source_ref, r.tier_group
            ));
        }
        lines.push(String::new());

        lines.push("## Layered Findings".to_string());
        lines.push(String::new());
        for (name, pass_fn) in [
            ("Layer-1 (conflict detection)", CaseResult::layer1 as fn(&CaseResult) -> bool),
            ("Layer-2 (evidence adjudication)", CaseResult::layer2),
            ("Layer-3 (fusion output)", CaseResult::layer3),
        ] {
            let failures: Vec<&str> = self
                .results
                .iter()
                .filter(|r| !pass_fn(r))
                .map(|r| r.case_id.as_str())
                .collect();
            lines.push(format!(
                "- {name} failures: `{}` -> `{failures:?}`",
                failures.len()
            ));
        }

        let mut out = lines.join("\n");
        while out.ends_with('\n') {
            out.pop();
        }
        out.push('\n');
        out
    }
}

impl CaseResult {
    fn layer1(&self) -> bool {
        self.layer1_pass
    }

    fn layer2(&self) -> bool {
        self.layer2_pass
    }

    fn layer3(&self) -> bool {
        self.layer3_pass
    }
}

/// Aggregate graded cases into an `EvalSummary`.
#[must_use]
pub fn summarize(results: &[CaseResult]) -> EvalSummary {
    let mut summary = EvalSummary {
        total_cases: results.len(),
        ..EvalSummary::default()
    };

    for r in results {
        let case_passed = r.case_passed();
        if case_passed {
            summary.pass_cases += 1;
        }

        summary.layer1.total += 1;
        summary.layer2.total += 1;
        summary.layer3.total += 1;
        if r.layer1_pass {
            summary.layer1.passed += 1;
        }
        if r.layer2_pass {
            summary.layer2.passed += 1;
        }
        if r.layer3_pass {
            summary.layer3.passed += 1;
        }

        let tier = summary.tier_stats.entry(r.tier_group.clone()).or_default();
        tier.cases_total += 1;
        if case_passed {
            tier.cases_pass += 1;
        }
        if r.layer1_pass {
            tier.layer1_pass += 1;
        }
        if r.layer2_pass {
            tier.layer2_pass += 1;
        }
        if r.layer3_pass {
            tier.layer3_pass += 1;
        }

        summary.conflict_tp += r.expected_conflicts.intersection(&r.observed_conflicts).count();
        summary.conflict_fp += r.observed_conflicts.difference(&r.expected_conflicts).count();
        summary.conflict_fn += r.expected_conflicts.difference(&r.observed_conflicts).count();

        summary.total_checks += r.checks.len();
        summary.pass_checks += r.checks.iter().filter(|c| c.passed).count();
    }

    summary.conflict_precision =
        safe_divide(summary.conflict_tp, summary.conflict_tp + summary.conflict_fp);
    summary.conflict_recall =
        safe_divide(summary.conflict_tp, summary.conflict_tp + summary.conflict_fn);
    let denom = summary.conflict_precision + summary.conflict_recall;
    summary.conflict_f1 = if denom > 0.0 {
        2.0 * summary.conflict_precision * summary.conflict_recall / denom
    } else {
        0.0
    };

    summary
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::types::{EvidenceItem, EvidenceTier};

    fn patent_runner() -> EvalRunner {
        EvalRunner::default().with_catalog(EvidenceCatalog::new(vec![EvidenceItem::new(
            "该技术专利",
            "2018",
            "官方专利公报",
            EvidenceTier::L1,
        )]))
    }

    fn patent_case() -> EvalCase {
        EvalCase::new(
            "patent_year",
            "T1",
            "该技术专利申请于2020年。",
            "该技术专利申请于2018年。",
        )
        .with_expected_conflicts(["year_conflict_该技术"])
        .expect_verdict("year_conflict_该技术", Verdict::B)
        .expect_auto_applied("year_conflict_该技术", true)
        .expect_final_contains("采用模型B结论。")
    }

    #[test]
    fn test_patent_case_passes_all_layers() {
        let report = patent_runner().run(&[patent_case()]);
        let result = &report.results[0];
        assert!(result.layer1_pass);
        assert!(result.layer2_pass);
        assert!(result.layer3_pass);
        assert!(result.case_passed());
        assert!(report.summary.all_passed());
    }

    #[test]
    fn test_consensus_case_with_no_expected_conflicts() {
        let case = EvalCase::new(
            "consensus",
            "T0",
            "木星是最大的行星。",
            "木星是最大的行星。",
        )
        .expect_final_contains("共识信息：");
        let report = EvalRunner::default().run(&[case]);
        assert!(report.summary.all_passed());
        assert_eq!(report.summary.conflict_tp, 0);
        assert_eq!(report.summary.conflict_fp, 0);
    }

    #[test]
    fn test_wrong_expectation_counts_false_negative() {
        let case = EvalCase::new(
            "bad_expectation",
            "T9",
            "木星是最大的行星。",
            "木星是最大的行星。",
        )
        .with_expected_conflicts(["year_conflict_missing"]);
        let report = EvalRunner::default().run(&[case]);
        let result = &report.results[0];
        assert!(!result.layer1_pass);
        assert!(!result.case_passed());
        assert_eq!(report.summary.conflict_fn, 1);
        assert_eq!(report.summary.conflict_recall, 0.0);
        assert_eq!(report.summary.conflict_f1, 0.0);
    }

    #[test]
    fn test_missing_adjudication_fails_verdict_check() {
        let case = EvalCase::new(
            "missing_cid",
            "T9",
            "木星是最大的行星。",
            "木星是最大的行星。",
        )
        .expect_verdict("year_conflict_phantom", Verdict::A);
        let report = EvalRunner::default().run(&[case]);
        let result = &report.results[0];
        assert!(!result.layer2_pass);
        let check = result
            .checks
            .iter()
            .find(|c| c.layer == EvalLayer::L2)
            .unwrap();
        assert!(check.message.contains("actual=missing"));
    }

    #[test]
    fn test_precision_recall_mixed_outcomes() {
        let good = patent_case();
        let bad = EvalCase::new(
            "phantom",
            "T2",
            "该技术专利申请于2020年。",
            "该技术专利申请于2018年。",
        )
        .with_expected_conflicts(["year_conflict_别的"]);
        let report = patent_runner().run(&[good, bad]);

        // Two observed conflicts total; one expected id matches, one does not.
        assert_eq!(report.summary.conflict_tp, 1);
        assert_eq!(report.summary.conflict_fp, 1);
        assert_eq!(report.summary.conflict_fn, 1);
        assert_eq!(report.summary.conflict_precision, 0.5);
        assert_eq!(report.summary.conflict_recall, 0.5);
        assert_eq!(report.summary.conflict_f1, 0.5);
    }

    #[test]
    fn test_tier_breakdown_groups_by_tier() {
        let report = patent_runner().run(&[
            patent_case(),
            EvalCase::new("c2", "T2", "地球拥有一颗卫星。", "地球拥有一颗卫星。"),
        ]);
        assert_eq!(report.summary.tier_stats.len(), 2);
        assert_eq!(report.summary.tier_stats["T1"].cases_total, 1);
        assert_eq!(report.summary.tier_stats["T1"].cases_pass, 1);
        assert_eq!(report.summary.tier_stats["T2"].cases_total, 1);
    }

    #[test]
    fn test_markdown_report_sections() {
        let report = patent_runner().run(&[patent_case()]);
        let md = report.to_markdown();
        assert!(md.starts_with("# Divergence Benchmark Report"));
        assert!(md.contains("## Layer Metrics"));
        assert!(md.contains("## Conflict Detection Error Analysis"));
        assert!(md.contains("| tier_group | cases | case_pass_rate | L1_pass | L2_pass | L3_pass |"));
        assert!(md.contains("| patent_year |"));
        assert!(md.contains("- Cases passed: `1/1` (100.0%)"));
        assert!(md.contains("PASS"));
        assert!(md.ends_with('\n'));
    }

    #[test]
    fn test_markdown_failed_checks_column() {
        let case = EvalCase::new("fail_case", "T9", "木星是最大的行星。", "木星是最大的行星。")
            .expect_final_contains("不存在的片段");
        let report = EvalRunner::default().run(&[case]);
        let md = report.to_markdown();
        assert!(md.contains("FAIL"));
        assert!(md.contains("final contains '不存在的片段'"));
    }

    #[test]
    fn test_empty_case_list() {
        let report = EvalRunner::default().run(&[]);
        assert_eq!(report.summary.total_cases, 0);
        assert!(report.summary.all_passed());
        let md = report.to_markdown();
        assert!(md.contains("- Cases passed: `0/0` (N/A)"));
    }
}

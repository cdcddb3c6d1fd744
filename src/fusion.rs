//! Fused answer generation from structured units and adjudication outcomes.

use std::collections::HashMap;

use crate::types::{AdjudicationResult, StructuredAnswer, Verdict};

/// Assemble the fused answer text.
///
/// Sections appear in a fixed order: header, consensus bullets, one-sided
/// supplements, then one line per conflict stating the adjudicated outcome.
/// A conflict with no adjudication entry is treated as unresolved. When every
/// section is empty the longer raw answer is used verbatim, answer A winning
/// ties.
#[must_use]
pub fn generate_fused_answer(
    structured: &StructuredAnswer,
    adjudications: &[(String, AdjudicationResult)],
) -> String {
    let verdicts: HashMap<&str, Verdict> = adjudications
        .iter()
        .map(|(cid, result)| (cid.as_str(), result.verdict))
        .collect();

    let mut lines = vec!["【融合答案】".to_string()];

    if !structured.consensus_units.is_empty() {
        lines.push("共识信息：".to_string());
        for unit in &structured.consensus_units {
            lines.push(format!("- {}", unit.text));
        }
    }

    if !structured.model_a_units.is_empty() || !structured.model_b_units.is_empty() {
        lines.push("补充信息：".to_string());
        for unit in &structured.model_a_units {
            lines.push(format!("- 来自模型A：{}", unit.text));
        }
        for unit in &structured.model_b_units {
            lines.push(format!("- 来自模型B：{}", unit.text));
        }
    }

    if !structured.conflict_units.is_empty() {
        lines.push("分歧与处理：".to_string());
        for conflict in &structured.conflict_units {
            let cid = conflict.conflict_id.as_str();
            let line = match verdicts.get(cid) {
                Some(Verdict::A) => format!("- {cid}: 采用模型A结论。"),
                Some(Verdict::B) => format!("- {cid}: 采用模型B结论。"),
                _ => format!("- {cid}: 暂无充分证据，保留多解。"),
            };
            lines.push(line);
        }
    }

    if lines.len() == 1 {
        let a_len = structured.raw_answer_a.chars().count();
        let b_len = structured.raw_answer_b.chars().count();
        if a_len >= b_len {
            lines.push(structured.raw_answer_a.clone());
        } else {
            lines.push(structured.raw_answer_b.clone());
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::compare_answers;
    use crate::restructure::restructure;

    fn adjudication(verdict: Verdict) -> AdjudicationResult {
        AdjudicationResult {
            verdict,
            evidence_text: String::new(),
            source: String::new(),
            source_tier: "L1".into(),
            auto_applied: matches!(verdict, Verdict::A | Verdict::B),
            confidence: 0.92,
        }
    }

    #[test]
    fn test_header_always_first() {
        let report = compare_answers("木星是最大的行星。", "木星是最大的行星。");
        let structured = restructure("木星是最大的行星。", "木星是最大的行星。", &report);
        let fused = generate_fused_answer(&structured, &[]);
        assert!(fused.starts_with("【融合答案】\n"));
        assert!(fused.contains("共识信息：\n- 木星是最大的行星"));
    }

    #[test]
    fn test_supplement_sections_a_before_b() {
        let report = compare_answers(
            "太阳系中最大的行星是木星。",
            "太阳系最大的行星是木星，土星的体积也很大。",
        );
        let structured = restructure("a", "b", &report);
        let fused = generate_fused_answer(&structured, &[]);
        let a_pos = fused.find("来自模型A：").unwrap();
        let b_pos = fused.find("来自模型B：").unwrap();
        assert!(a_pos < b_pos);
        assert!(fused.contains("补充信息："));
    }

    #[test]
    fn test_conflict_line_adopts_verdict_b() {
        let report = compare_answers("该技术专利申请于2020年。", "该技术专利申请于2018年。");
        let structured = restructure("a", "b", &report);
        let adjudications = vec![(
            "year_conflict_该技术".to_string(),
            adjudication(Verdict::B),
        )];
        let fused = generate_fused_answer(&structured, &adjudications);
        assert!(fused.contains("- year_conflict_该技术: 采用模型B结论。"));
    }

    #[test]
    fn test_conflict_line_adopts_verdict_a() {
        let report = compare_answers("该技术专利申请于2020年。", "该技术专利申请于2018年。");
        let structured = restructure("a", "b", &report);
        let adjudications = vec![(
            "year_conflict_该技术".to_string(),
            adjudication(Verdict::A),
        )];
        let fused = generate_fused_answer(&structured, &adjudications);
        assert!(fused.contains("- year_conflict_该技术: 采用模型A结论。"));
    }

    #[test]
    fn test_missing_adjudication_keeps_both() {
        let report = compare_answers("该技术专利申请于2020年。", "该技术专利申请于2018年。");
        let structured = restructure("a", "b", &report);
        let fused = generate_fused_answer(&structured, &[]);
        assert!(fused.contains("- year_conflict_该技术: 暂无充分证据，保留多解。"));
    }

    #[test]
    fn test_unknown_verdict_keeps_both() {
        let report = compare_answers("该技术专利申请于2020年。", "该技术专利申请于2018年。");
        let structured = restructure("a", "b", &report);
        let adjudications = vec![(
            "year_conflict_该技术".to_string(),
            adjudication(Verdict::Unknown),
        )];
        let fused = generate_fused_answer(&structured, &adjudications);
        assert!(fused.contains("保留多解。"));
    }

    #[test]
    fn test_empty_sections_fall_back_to_longer_answer() {
        let report = compare_answers("", "");
        let mut structured = restructure("短答案", "更长的备选答案", &report);
        structured.consensus_units.clear();
        let fused = generate_fused_answer(&structured, &[]);
        assert_eq!(fused, "【融合答案】\n更长的备选答案");
    }

    #[test]
    fn test_fallback_prefers_a_on_equal_length() {
        let report = compare_answers("", "");
        let structured = restructure("答案甲", "答案乙", &report);
        let fused = generate_fused_answer(&structured, &[]);
        assert_eq!(fused, "【融合答案】\n答案甲");
    }
}

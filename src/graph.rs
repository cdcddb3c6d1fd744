//! Knowledge-graph triple extraction and cross-answer comparison.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::normalize::split_sentences;
use crate::types::{Conflict, ConflictType, DivergenceReport};

/// Relation markers tried in order per sentence. `不是` precedes `是` so the
/// negated relation is not mis-split at the inner `是`.
const RELATION_MARKERS: &[&str] = &["不是", "是", "拥有", "用于"];

/// A subject/relation/object triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    /// Subject node.
    pub subject: String,
    /// Relation marker.
    pub relation: String,
    /// Object node.
    pub object: String,
}

impl Triple {
    /// Create a new triple.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }
}

/// A set of triples and the nodes they mention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    /// All subject and object nodes, sorted.
    pub nodes: BTreeSet<String>,
    /// All extracted triples, sorted.
    pub edges: BTreeSet<Triple>,
}

impl KnowledgeGraph {
    /// Whether an exact triple is present.
    #[must_use]
    pub fn contains(&self, subject: &str, relation: &str, object: &str) -> bool {
        self.edges.contains(&Triple::new(subject, relation, object))
    }
}

/// Extract a knowledge graph from declarative text.
///
/// Each sentence contributes at most one triple: the first relation marker
/// found wins, with everything before it as subject and everything after as
/// object, both trimmed of spaces and commas. Sentences without a usable
/// subject and object are skipped.
#[must_use]
pub fn build_graph(text: &str) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::default();
    for unit in split_sentences(text) {
        if let Some(triple) = extract_triple(&unit.text) {
            graph.nodes.insert(triple.subject.clone());
            graph.nodes.insert(triple.object.clone());
            graph.edges.insert(triple);
        }
    }
    graph
}

fn extract_triple(sentence: &str) -> Option<Triple> {
    let edge_trim = |c: char| c == ' ' || c == '，' || c == ',';
    for relation in RELATION_MARKERS {
        if let Some(pos) = sentence.find(relation) {
            let subject = sentence[..pos].trim_matches(edge_trim);
            let object = sentence[pos + relation.len()..].trim_matches(edge_trim);
            if !subject.is_empty() && !object.is_empty() {
                return Some(Triple::new(subject, *relation, object));
            }
        }
    }
    None
}

/// The result of comparing two answers' graphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphComparison {
    /// Nodes present in both graphs.
    pub common_nodes: Vec<String>,
    /// Nodes only in graph A.
    pub a_only_nodes: Vec<String>,
    /// Nodes only in graph B.
    pub b_only_nodes: Vec<String>,
    /// Triples present in both graphs.
    pub common_edges: Vec<Triple>,
    /// Triples only in graph A.
    pub a_only_edges: Vec<Triple>,
    /// Triples only in graph B.
    pub b_only_edges: Vec<Triple>,
    /// Subject/object pairs asserted positively by one side and negated by
    /// the other, sorted and deduplicated.
    pub contradictions: Vec<(String, String)>,
}

/// Compare two graphs.
#[must_use]
pub fn compare_graphs(graph_a: &KnowledgeGraph, graph_b: &KnowledgeGraph) -> GraphComparison {
    let mut contradictions: BTreeSet<(String, String)> = BTreeSet::new();
    for edge in &graph_a.edges {
        if edge.relation == "是" && graph_b.contains(&edge.subject, "不是", &edge.object) {
            contradictions.insert((edge.subject.clone(), edge.object.clone()));
        }
    }
    for edge in &graph_b.edges {
        if edge.relation == "是" && graph_a.contains(&edge.subject, "不是", &edge.object) {
            contradictions.insert((edge.subject.clone(), edge.object.clone()));
        }
    }

    GraphComparison {
        common_nodes: graph_a.nodes.intersection(&graph_b.nodes).cloned().collect(),
        a_only_nodes: graph_a.nodes.difference(&graph_b.nodes).cloned().collect(),
        b_only_nodes: graph_b.nodes.difference(&graph_a.nodes).cloned().collect(),
        common_edges: graph_a.edges.intersection(&graph_b.edges).cloned().collect(),
        a_only_edges: graph_a.edges.difference(&graph_b.edges).cloned().collect(),
        b_only_edges: graph_b.edges.difference(&graph_a.edges).cloned().collect(),
        contradictions: contradictions.into_iter().collect(),
    }
}

/// Compare the graphs of two raw answers.
#[must_use]
pub fn compare_answer_graphs(answer_a: &str, answer_b: &str) -> GraphComparison {
    compare_graphs(&build_graph(answer_a), &build_graph(answer_b))
}

/// Conflict signature used for duplicate suppression when merging.
fn signature(conflict: &Conflict) -> (String, String, String) {
    (
        conflict.conflict_type.to_string(),
        conflict.model_a_claim.trim().to_lowercase(),
        conflict.model_b_claim.trim().to_lowercase(),
    )
}

/// Append graph contradictions to a divergence report.
///
/// Each contradiction becomes a `graph_contradiction_{subject}_{n}` conflict
/// unless the report already carries a conflict with the same or the
/// claim-swapped signature. When any contradictions exist the summary gains a
/// `图谱冲突{n}项` fragment.
pub fn merge_graph_conflicts(report: &mut DivergenceReport, comparison: &GraphComparison) {
    let mut signatures: BTreeSet<(String, String, String)> =
        report.conflicts.iter().map(signature).collect();

    for (i, (subject, object)) in comparison.contradictions.iter().enumerate() {
        let conflict = Conflict::new(
            format!("graph_contradiction_{subject}_{}", i + 1),
            ConflictType::Contradiction,
            "Contradiction detected by graph comparison.",
        )
        .with_subject(subject.clone())
        .with_claims(format!("{subject}是{object}"), format!("{subject}不是{object}"));

        let sig = signature(&conflict);
        let mirror = (sig.0.clone(), sig.2.clone(), sig.1.clone());
        if signatures.contains(&sig) || signatures.contains(&mirror) {
            continue;
        }
        signatures.insert(sig);
        report.conflicts.push(conflict);
    }

    if !comparison.contradictions.is_empty() {
        let count = comparison.contradictions.len();
        report.summary = format!("{}，图谱冲突{count}项", report.summary)
            .trim_matches('，')
            .to_string();
    }
}

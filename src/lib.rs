//! `Diverdict` - A divergence detection and evidence adjudication engine.
//!
//! `Diverdict` reconciles two model answers to the same question into one
//! fused answer:
//!
//! - **Detection**: sentence alignment, claim extraction, and conflict
//!   classification between the two answers
//! - **Adjudication**: tiered evidence gating that resolves conflicts
//!   against a catalog of known facts
//! - **Fusion**: a structured merge of consensus, supplements, and
//!   adjudicated conflict outcomes
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use diverdict::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DiverdictError> {
//!     // Build the pipeline with the mock provider and an in-memory store
//!     let pipeline = DivergencePipeline::new(
//!         MockAnswerProvider::new(),
//!         InMemoryRecordStore::new(),
//!         DiverdictConfig::new().with_pipeline(PipelineConfig::new().with_evidence(true)),
//!     )
//!     .with_catalog(EvidenceCatalog::from_env_or_empty());
//!
//!     // Process a question
//!     let output = pipeline.process("这项技术的专利申请年份是哪一年？").await?;
//!
//!     println!("Fused answer:\n{}", output.fused_answer);
//!     println!("Conflicts: {}", output.report.conflicts.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Question
//!   │
//!   ▼
//! ┌──────────────────────┐
//! │  Answer Acquisition  │  ← cache, retry, mock fallback
//! │  (Provider)          │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ Divergence Detection │  ← alignment, claims, conflicts
//! │  (+ graph merge)     │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ Evidence Adjudication│  ← tiered gating against catalog
//! │  (Catalog)           │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ Restructure + Fusion │  ← labelled units, fused answer
//! └──────────┬───────────┘
//!            │
//!            ▼
//!      Fused Answer
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adjudicate;
pub mod align;
pub mod answers;
pub mod catalog;
pub mod claims;
pub mod config;
pub mod conflicts;
pub mod error;
pub mod eval;
pub mod fusion;
pub mod graph;
pub mod negation;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod restructure;
pub mod retry;
pub mod similarity;
pub mod storage;
pub mod types;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::adjudicate::{EvidenceAdjudicator, adjudicate};
    pub use crate::align::{AlignmentEngine, AlignmentResult};
    pub use crate::answers::{
        AnswerProvider, MockAnswerProvider, ResilientAnswerProvider, canned_answer,
        validate_question,
    };
    pub use crate::catalog::{CATALOG_ENV_VAR, EvidenceCatalog};
    pub use crate::claims::{claim_map, extract_claims, normalize_subject};
    pub use crate::config::{
        AdjudicationConfig, AlignmentConfig, DiverdictConfig, PipelineConfig, RetryConfig,
    };
    pub use crate::conflicts::ConflictClassifier;
    pub use crate::error::{
        AnswerError, CatalogError, DiverdictError, PipelineError, StorageError,
    };
    pub use crate::eval::{
        CaseResult, EvalCase, EvalCheck, EvalLayer, EvalReport, EvalRunner, EvalSummary,
        LayerStats, TierStats, summarize,
    };
    pub use crate::fusion::generate_fused_answer;
    pub use crate::graph::{
        GraphComparison, KnowledgeGraph, Triple, build_graph, compare_answer_graphs,
        compare_graphs, merge_graph_conflicts,
    };
    pub use crate::negation::{contradiction_candidate, has_negation, strip_negation};
    pub use crate::normalize::{canonicalize, extract_years, split_sentences};
    pub use crate::pipeline::DivergencePipeline;
    pub use crate::report::{DivergenceEngine, compare_answers};
    pub use crate::restructure::restructure;
    pub use crate::retry::{RetryPolicy, Retryable};
    pub use crate::similarity::{bigram_jaccard, similarity_ratio, year_overlap_score};
    pub use crate::storage::{InMemoryRecordStore, QueryRecord, RecordStore};
    pub use crate::types::{
        AdjudicationResult, AnswerMode, AnswerPair, AnswerUnit, Claim, ClaimMap, Conflict,
        ConflictType, DivergenceReport, EvidenceItem, EvidenceTier, MatchPair, PipelineOutput,
        QueryId, SentenceUnit, Side, StructuredAnswer, Verdict,
    };
}

pub use error::{DiverdictError, Result};

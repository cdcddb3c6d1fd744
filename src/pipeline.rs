//! End-to-end divergence pipeline.
//!
//! Stage order mirrors the persisted record layout: validate, save query,
//! acquire answers, compare, optional graph merge, persist report, optional
//! adjudication, fuse, persist fused answer.

use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;

use crate::adjudicate::EvidenceAdjudicator;
use crate::answers::{validate_question, AnswerProvider, ResilientAnswerProvider};
use crate::catalog::EvidenceCatalog;
use crate::config::{DiverdictConfig, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::fusion::generate_fused_answer;
use crate::graph::{compare_answer_graphs, merge_graph_conflicts};
use crate::report::DivergenceEngine;
use crate::restructure::restructure;
use crate::retry::RetryPolicy;
use crate::storage::RecordStore;
use crate::types::PipelineOutput;

/// The full divergence-detection pipeline over a provider and a record store.
pub struct DivergencePipeline<P: AnswerProvider, S: RecordStore> {
    provider: ResilientAnswerProvider<P>,
    store: S,
    catalog: EvidenceCatalog,
    engine: DivergenceEngine,
    adjudicator: EvidenceAdjudicator,
    config: PipelineConfig,
}

impl<P: AnswerProvider, S: RecordStore> DivergencePipeline<P, S> {
    /// Create a pipeline from a provider, a store, and the full configuration.
    ///
    /// The provider is wrapped with the cache and retry-then-fallback policy
    /// the pipeline configuration asks for.
    #[must_use]
    pub fn new(provider: P, store: S, config: DiverdictConfig) -> Self {
        let retry_policy = config
            .pipeline
            .retry_config
            .as_ref()
            .map_or_else(RetryPolicy::no_retry, |rc| RetryPolicy::new(rc.clone()));
        let provider = ResilientAnswerProvider::new(provider)
            .with_cache(config.pipeline.use_cache)
            .with_mock_fallback(config.pipeline.allow_mock_fallback)
            .with_retry_policy(retry_policy);

        Self {
            provider,
            store,
            catalog: EvidenceCatalog::empty(),
            engine: DivergenceEngine::new(config.alignment.clone()),
            adjudicator: EvidenceAdjudicator::new(config.adjudication),
            config: config.pipeline,
        }
    }

    /// Attach an evidence catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: EvidenceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// The wrapped answer provider.
    #[must_use]
    pub fn provider(&self) -> &ResilientAnswerProvider<P> {
        &self.provider
    }

    /// The record store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The attached evidence catalog.
    #[must_use]
    pub fn catalog(&self) -> &EvidenceCatalog {
        &self.catalog
    }

    /// The pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for one question.
    pub async fn process(&self, question: &str) -> Result<PipelineOutput> {
        let start = Instant::now();
        let question = validate_question(question, self.config.max_question_len)
            .map_err(|e| PipelineError::InvalidQuestion(e.to_string()))?;

        let query_id = self.store.save_query(question).await?;
        tracing::debug!("Processing query {query_id}");

        let answers = self
            .provider
            .fetch(question)
            .await
            .map_err(|e| PipelineError::AnswerAcquisition(e.to_string()))?;
        self.store.save_answers(&query_id, &answers).await?;

        let mut report = self.engine.compare(&answers.model_a, &answers.model_b);
        if self.config.enable_graph {
            let comparison = compare_answer_graphs(&answers.model_a, &answers.model_b);
            if !comparison.contradictions.is_empty() {
                tracing::debug!(
                    "Graph comparison found {} contradiction(s)",
                    comparison.contradictions.len()
                );
            }
            merge_graph_conflicts(&mut report, &comparison);
        }
        self.store.save_report(&query_id, &report).await?;

        let adjudications = if self.config.enable_evidence {
            let outcomes = self
                .adjudicator
                .adjudicate(&report.conflicts, self.catalog.items());
            for (conflict_id, result) in &outcomes {
                self.store
                    .save_adjudication(&query_id, conflict_id, result)
                    .await?;
            }
            outcomes
        } else {
            Vec::new()
        };

        let structured = restructure(&answers.model_a, &answers.model_b, &report);
        let fused_answer = generate_fused_answer(&structured, &adjudications);
        self.store.save_fused(&query_id, &fused_answer).await?;

        Ok(PipelineOutput {
            query_id,
            report,
            adjudications,
            fused_answer,
            mode: answers.mode,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            completed_at: Utc::now(),
        })
    }

    /// Run the pipeline for several questions concurrently.
    ///
    /// Results are returned in input order; each question fails or succeeds
    /// independently.
    pub async fn process_batch(&self, questions: Vec<String>) -> Vec<Result<PipelineOutput>> {
        if questions.is_empty() {
            return Vec::new();
        }
        let futures: Vec<_> = questions
            .iter()
            .map(|question| self.process(question))
            .collect();
        join_all(futures).await
    }
}

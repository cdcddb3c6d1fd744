//! Query record persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::types::{AdjudicationResult, AnswerPair, DivergenceReport, QueryId};

/// Everything recorded about one processed question.
///
/// The report is held as a serialized payload; [`RecordStore::load_report`]
/// deserializes it back on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Record identifier.
    pub query_id: QueryId,
    /// The original question text.
    pub question: String,
    /// When the query was first saved.
    pub created_at: DateTime<Utc>,
    /// When the record was last written to.
    pub updated_at: DateTime<Utc>,
    /// The resolved answer pair, once acquired.
    pub answers: Option<AnswerPair>,
    /// The divergence report payload, once computed.
    pub report: Option<serde_json::Value>,
    /// Adjudication outcomes keyed by conflict id, in arrival order.
    pub adjudications: Vec<(String, AdjudicationResult)>,
    /// The fused answer text, once generated.
    pub fused_answer: Option<String>,
}

impl QueryRecord {
    fn new(question: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            query_id: QueryId::new(),
            question: question.into(),
            created_at: now,
            updated_at: now,
            answers: None,
            report: None,
            adjudications: Vec::new(),
            fused_answer: None,
        }
    }
}

/// Persistence sink for pipeline stage outputs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record for a new question and return its id.
    async fn save_query(&self, question: &str) -> Result<QueryId, StorageError>;

    /// Attach the resolved answer pair to a record.
    async fn save_answers(
        &self,
        query_id: &QueryId,
        answers: &AnswerPair,
    ) -> Result<(), StorageError>;

    /// Attach the divergence report to a record.
    async fn save_report(
        &self,
        query_id: &QueryId,
        report: &DivergenceReport,
    ) -> Result<(), StorageError>;

    /// Append one adjudication outcome to a record.
    async fn save_adjudication(
        &self,
        query_id: &QueryId,
        conflict_id: &str,
        result: &AdjudicationResult,
    ) -> Result<(), StorageError>;

    /// Attach the fused answer text to a record.
    async fn save_fused(&self, query_id: &QueryId, fused: &str) -> Result<(), StorageError>;

    /// Load a full record.
    async fn load_record(&self, query_id: &QueryId) -> Result<QueryRecord, StorageError>;

    /// Load and deserialize the stored divergence report.
    async fn load_report(&self, query_id: &QueryId) -> Result<DivergenceReport, StorageError>;

    /// Number of stored records.
    async fn count(&self) -> usize;

    /// Remove all records.
    async fn clear(&self);
}

/// An in-memory record store for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<QueryId, QueryRecord>>,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_record<F>(&self, query_id: &QueryId, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut QueryRecord),
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(query_id)
            .ok_or_else(|| StorageError::NotFound(query_id.to_string()))?;
        apply(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save_query(&self, question: &str) -> Result<QueryId, StorageError> {
        let record = QueryRecord::new(question);
        let query_id = record.query_id.clone();
        let mut records = self.records.write().await;
        records.insert(query_id.clone(), record);
        Ok(query_id)
    }

    async fn save_answers(
        &self,
        query_id: &QueryId,
        answers: &AnswerPair,
    ) -> Result<(), StorageError> {
        let answers = answers.clone();
        self.with_record(query_id, |record| {
            record.answers = Some(answers);
        })
        .await
    }

    async fn save_report(
        &self,
        query_id: &QueryId,
        report: &DivergenceReport,
    ) -> Result<(), StorageError> {
        let payload = serde_json::to_value(report)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.with_record(query_id, |record| {
            record.report = Some(payload);
        })
        .await
    }

    async fn save_adjudication(
        &self,
        query_id: &QueryId,
        conflict_id: &str,
        result: &AdjudicationResult,
    ) -> Result<(), StorageError> {
        let entry = (conflict_id.to_string(), result.clone());
        self.with_record(query_id, |record| {
            record.adjudications.push(entry);
        })
        .await
    }

    async fn save_fused(&self, query_id: &QueryId, fused: &str) -> Result<(), StorageError> {
        let fused = fused.to_string();
        self.with_record(query_id, |record| {
            record.fused_answer = Some(fused);
        })
        .await
    }

    async fn load_record(&self, query_id: &QueryId) -> Result<QueryRecord, StorageError> {
        let records = self.records.read().await;
        records
            .get(query_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(query_id.to_string()))
    }

    async fn load_report(&self, query_id: &QueryId) -> Result<DivergenceReport, StorageError> {
        let record = self.load_record(query_id).await?;
        let payload = record
            .report
            .ok_or_else(|| StorageError::NotFound(format!("report for {query_id}")))?;
        serde_json::from_value(payload).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    async fn clear(&self) {
        self.records.write().await.clear();
    }
}

//! Answer acquisition from two competing models.
//!
//! Providers return both answers in one call so the pair always shares an
//! acquisition mode. The resilient wrapper layers a response cache and a
//! retry-then-fallback policy over any inner provider.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AnswerError;
use crate::retry::RetryPolicy;
use crate::types::{AnswerMode, AnswerPair, Side};

/// Source of the two model answers for a question.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Fetch both answers for the question.
    async fn fetch(&self, question: &str) -> Result<AnswerPair, AnswerError>;

    /// Stable tag identifying this provider's response mode.
    ///
    /// Cached responses are keyed by this tag, so answers fetched under one
    /// mode are never served for another.
    fn cache_tag(&self) -> &str {
        "live"
    }
}

/// Validate and trim an incoming question.
///
/// The length limit counts characters, not bytes.
pub fn validate_question(question: &str, max_len: usize) -> Result<&str, AnswerError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(AnswerError::EmptyQuestion);
    }
    let length = trimmed.chars().count();
    if length > max_len {
        return Err(AnswerError::QuestionTooLong {
            length,
            max: max_len,
        });
    }
    Ok(trimmed)
}

/// Canned deterministic answer for one side.
///
/// Solar-system and patent questions get fixed divergent answers; anything
/// else gets a template reply that echoes the question.
#[must_use]
pub fn canned_answer(side: Side, question: &str) -> String {
    let lowered = question.to_lowercase();
    if (question.contains("太阳系") && question.contains("最大"))
        || (lowered.contains("planet") && lowered.contains("largest"))
    {
        return match side {
            Side::A => "太阳系中最大的行星是木星。".to_string(),
            Side::B => "太阳系最大的行星是木星，土星的体积也很大。".to_string(),
        };
    }
    if (question.contains("专利") && question.contains("年份"))
        || (lowered.contains("patent") && lowered.contains("year"))
    {
        return match side {
            Side::A => "该技术专利申请于2020年。".to_string(),
            Side::B => "该技术专利申请于2018年。".to_string(),
        };
    }
    format!("模型{side} mock: 对问题“{question}”的示例回答。")
}

/// A provider that serves the canned answer table.
#[derive(Debug, Clone)]
pub struct MockAnswerProvider {
    tag: String,
}

impl MockAnswerProvider {
    /// Create a mock provider with the default `mock` cache tag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tag: "mock".to_string(),
        }
    }

    /// Override the cache tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

impl Default for MockAnswerProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerProvider for MockAnswerProvider {
    async fn fetch(&self, question: &str) -> Result<AnswerPair, AnswerError> {
        Ok(AnswerPair::new(
            canned_answer(Side::A, question),
            canned_answer(Side::B, question),
            AnswerMode::Mock,
        ))
    }

    fn cache_tag(&self) -> &str {
        &self.tag
    }
}

/// A caching, retrying wrapper around an answer provider.
///
/// Lookup order: cache, then the inner provider under the retry policy,
/// then (when permitted) the canned fallback table. Fallback pairs carry
/// [`AnswerMode::Fallback`] so downstream stages can tell them apart.
pub struct ResilientAnswerProvider<P: AnswerProvider> {
    inner: P,
    policy: RetryPolicy,
    use_cache: bool,
    allow_mock_fallback: bool,
    cache: RwLock<HashMap<String, AnswerPair>>,
}

impl<P: AnswerProvider> ResilientAnswerProvider<P> {
    /// Wrap a provider with the default retry policy and caching enabled.
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
            use_cache: true,
            allow_mock_fallback: false,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enable or disable the response cache.
    #[must_use]
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Allow degrading to canned answers when the inner provider fails.
    #[must_use]
    pub fn with_mock_fallback(mut self, allow: bool) -> Self {
        self.allow_mock_fallback = allow;
        self
    }

    /// The wrapped provider.
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached answer pairs.
    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Drop all cached answer pairs.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    fn cache_key(tag: &str, question: &str) -> String {
        format!("mode={tag}|{question}")
    }
}

#[async_trait]
impl<P: AnswerProvider> AnswerProvider for ResilientAnswerProvider<P> {
    async fn fetch(&self, question: &str) -> Result<AnswerPair, AnswerError> {
        let key = Self::cache_key(self.inner.cache_tag(), question);
        if self.use_cache {
            let cache = self.cache.read().await;
            if let Some(pair) = cache.get(&key) {
                tracing::debug!("Answer cache hit for mode {}", self.inner.cache_tag());
                return Ok(pair.clone());
            }
        }

        let fetched = self.policy.retry(|| self.inner.fetch(question)).await;
        let pair = match fetched {
            Ok(pair) => pair,
            Err(e) if self.allow_mock_fallback => {
                tracing::warn!("Answer provider failed, using canned fallback: {e}");
                AnswerPair::new(
                    canned_answer(Side::A, question),
                    canned_answer(Side::B, question),
                    AnswerMode::Fallback,
                )
            }
            Err(e) => return Err(e),
        };

        if self.use_cache {
            let mut cache = self.cache.write().await;
            cache.insert(key, pair.clone());
        }
        Ok(pair)
    }

    fn cache_tag(&self) -> &str {
        self.inner.cache_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnswerProvider for CountingProvider {
        async fn fetch(&self, _question: &str) -> Result<AnswerPair, AnswerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnswerPair::new(
                format!("answer A #{call}"),
                format!("answer B #{call}"),
                AnswerMode::Live,
            ))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl AnswerProvider for FailingProvider {
        async fn fetch(&self, _question: &str) -> Result<AnswerPair, AnswerError> {
            Err(AnswerError::Provider("connection refused".into()))
        }
    }

    #[test]
    fn test_validate_question_trims() {
        assert_eq!(validate_question("  问题  ", 5000).unwrap(), "问题");
    }

    #[test]
    fn test_validate_question_rejects_empty() {
        assert!(matches!(
            validate_question("   ", 5000),
            Err(AnswerError::EmptyQuestion)
        ));
    }

    #[test]
    fn test_validate_question_rejects_too_long() {
        let question = "啊".repeat(5001);
        assert!(matches!(
            validate_question(&question, 5000),
            Err(AnswerError::QuestionTooLong { length: 5001, max: 5000 })
        ));
    }

    #[tokio::test]
    async fn test_mock_solar_answers_diverge() {
        let provider = MockAnswerProvider::new();
        let pair = provider.fetch("太阳系中最大的行星是什么？").await.unwrap();
        assert_eq!(pair.model_a, "太阳系中最大的行星是木星。");
        assert_eq!(pair.model_b, "太阳系最大的行星是木星，土星的体积也很大。");
        assert_eq!(pair.mode, AnswerMode::Mock);
    }

    #[tokio::test]
    async fn test_mock_patent_answers_diverge() {
        let provider = MockAnswerProvider::new();
        let pair = provider.fetch("这项技术的专利申请年份是哪一年？").await.unwrap();
        assert_eq!(pair.model_a, "该技术专利申请于2020年。");
        assert_eq!(pair.model_b, "该技术专利申请于2018年。");
    }

    #[tokio::test]
    async fn test_mock_english_trigger_words() {
        let provider = MockAnswerProvider::new();
        let pair = provider
            .fetch("Which is the largest planet in the solar system?")
            .await
            .unwrap();
        assert_eq!(pair.model_a, "太阳系中最大的行星是木星。");
    }

    #[tokio::test]
    async fn test_mock_default_template() {
        let provider = MockAnswerProvider::new();
        let pair = provider.fetch("今天天气如何？").await.unwrap();
        assert_eq!(pair.model_a, "模型A mock: 对问题“今天天气如何？”的示例回答。");
        assert_eq!(pair.model_b, "模型B mock: 对问题“今天天气如何？”的示例回答。");
    }

    #[tokio::test]
    async fn test_cache_serves_second_fetch() {
        let wrapper = ResilientAnswerProvider::new(CountingProvider::new());
        let first = wrapper.fetch("q").await.unwrap();
        let second = wrapper.fetch("q").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(wrapper.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(wrapper.cached_len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_refetches() {
        let wrapper = ResilientAnswerProvider::new(CountingProvider::new()).with_cache(false);
        wrapper.fetch("q").await.unwrap();
        wrapper.fetch("q").await.unwrap();
        assert_eq!(wrapper.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(wrapper.cached_len().await, 0);
    }

    #[tokio::test]
    async fn test_distinct_questions_cached_separately() {
        let wrapper = ResilientAnswerProvider::new(CountingProvider::new());
        wrapper.fetch("q1").await.unwrap();
        wrapper.fetch("q2").await.unwrap();
        assert_eq!(wrapper.cached_len().await, 2);
    }

    #[test]
    fn test_cache_key_isolates_mode_tags() {
        let mock = ResilientAnswerProvider::<MockAnswerProvider>::cache_key("mock", "q");
        let variant = ResilientAnswerProvider::<MockAnswerProvider>::cache_key("mock_v2", "q");
        let live = ResilientAnswerProvider::<MockAnswerProvider>::cache_key("live", "q");
        assert_ne!(mock, variant);
        assert_ne!(mock, live);
    }

    #[tokio::test]
    async fn test_fallback_after_retries() {
        let wrapper = ResilientAnswerProvider::new(FailingProvider)
            .with_retry_policy(RetryPolicy::no_retry())
            .with_mock_fallback(true);
        let pair = wrapper.fetch("太阳系中最大的行星是什么？").await.unwrap();
        assert_eq!(pair.mode, AnswerMode::Fallback);
        assert_eq!(pair.model_a, "太阳系中最大的行星是木星。");
    }

    #[tokio::test]
    async fn test_failure_surfaces_without_fallback() {
        let wrapper = ResilientAnswerProvider::new(FailingProvider)
            .with_retry_policy(RetryPolicy::no_retry());
        let result = wrapper.fetch("q").await;
        assert!(matches!(result, Err(AnswerError::Provider(_))));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let wrapper = ResilientAnswerProvider::new(CountingProvider::new());
        wrapper.fetch("q").await.unwrap();
        wrapper.clear_cache().await;
        assert_eq!(wrapper.cached_len().await, 0);
        wrapper.fetch("q").await.unwrap();
        assert_eq!(wrapper.inner().calls.load(Ordering::SeqCst), 2);
    }
}

//! 检索客户端：调用搜索服务、归一化结果，并在失败时提供确定性的兜底结果

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::utils::RequestThrottle;

pub mod formatter;
pub mod google;
pub mod queries;
pub mod types;

pub use formatter::{NO_DATA_AVAILABLE, format_for_prompt};
pub use google::GoogleSearchBackend;
pub use queries::section_query;
pub use types::{SearchError, SearchResult};

/// 单次搜索请求的上限
pub const MAX_RESULTS: u8 = 10;

/// 搜索服务抽象：“查找与该语句相关的文档”
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, num_results: u8) -> Result<Vec<SearchResult>, SearchError>;
}

/// 检索客户端
///
/// 拥有独立的请求节流计时器，不与生成服务共享。
#[derive(Clone)]
pub struct ResearchClient {
    backend: Arc<dyn SearchBackend>,
    throttle: Arc<RequestThrottle>,
    num_results: u8,
}

impl ResearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let backend = Arc::new(GoogleSearchBackend::new(config.clone())?);
        Ok(Self::with_backend(config, backend))
    }

    pub fn with_backend(config: &SearchConfig, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            throttle: Arc::new(RequestThrottle::new(Duration::from_millis(
                config.request_delay_ms,
            ))),
            num_results: config.num_results,
        }
    }

    /// 执行一次检索，失败或结果为空时返回单条兜底结果，从不报错
    pub async fn search(&self, query: &str, num_results: u8) -> Vec<SearchResult> {
        let num_results = num_results.clamp(1, MAX_RESULTS);
        self.throttle.wait().await;

        match self.backend.search(query, num_results).await {
            Ok(results) if !results.is_empty() => {
                tracing::debug!(query, count = results.len(), "search returned results");
                results
            }
            Ok(_) => {
                tracing::warn!(query, "search returned no results, using fallback");
                fallback_results(query)
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "search failed, using fallback");
                fallback_results(query)
            }
        }
    }

    /// 按章节构造检索语句并执行检索
    pub async fn search_section(&self, topic: &str, section: &str) -> Vec<SearchResult> {
        let query = section_query(topic, section);
        self.search(&query, self.num_results).await
    }
}

/// 确定性的兜底结果，同一个query总是得到相同的记录
pub fn fallback_results(query: &str) -> Vec<SearchResult> {
    let url = reqwest::Url::parse_with_params("https://www.google.com/search", [("q", query)])
        .map(String::from)
        .unwrap_or_else(|_| format!("https://www.google.com/search?q={}", query.replace(' ', "+")));

    let mut metadata = BTreeMap::new();
    metadata.insert("fallback".to_string(), "true".to_string());

    vec![SearchResult {
        title: format!("Market overview: {}", query),
        url,
        snippet: format!(
            "Live search data was unavailable for \"{}\". General market knowledge about this subject should be used instead.",
            query
        ),
        source_name: "Fallback".to_string(),
        published_date: None,
        metadata,
    }]
}

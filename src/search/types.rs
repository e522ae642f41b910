use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 归一化后的单条搜索结果，`url` 在结果集合内唯一
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search service credentials are not configured")]
    MissingCredentials,

    #[error("search service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode search response: {0}")]
    Decode(String),
}

//! Google Custom Search JSON API 后端

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::search::SearchBackend;
use crate::search::types::{SearchError, SearchResult};

const PUBLISHED_DATE_TAGS: [&str; 2] = ["article:published_time", "datePublished"];

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
    #[serde(default)]
    pagemap: Option<CsePagemap>,
}

#[derive(Debug, Deserialize)]
struct CsePagemap {
    #[serde(default)]
    metatags: Vec<serde_json::Map<String, Value>>,
}

impl CseItem {
    fn into_result(self) -> SearchResult {
        let mut metadata = BTreeMap::new();
        let mut published_date = None;

        if let Some(tags) = self.pagemap.and_then(|p| p.metatags.into_iter().next()) {
            for (name, value) in tags {
                let Value::String(text) = value else {
                    continue;
                };
                if published_date.is_none() && PUBLISHED_DATE_TAGS.contains(&name.as_str()) {
                    published_date = Some(text);
                } else {
                    metadata.insert(name, text);
                }
            }
        }

        SearchResult {
            title: self.title,
            url: self.link,
            snippet: self.snippet.replace('\n', " "),
            source_name: self.display_link,
            published_date,
            metadata,
        }
    }
}

pub struct GoogleSearchBackend {
    client: reqwest::Client,
    config: SearchConfig,
}

impl GoogleSearchBackend {
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SearchBackend for GoogleSearchBackend {
    async fn search(&self, query: &str, num_results: u8) -> Result<Vec<SearchResult>, SearchError> {
        if self.config.api_key.is_empty() || self.config.engine_id.is_empty() {
            return Err(SearchError::MissingCredentials);
        }

        let num = num_results.to_string();
        let mut params = vec![
            ("key", self.config.api_key.as_str()),
            ("cx", self.config.engine_id.as_str()),
            ("q", query),
            ("num", num.as_str()),
        ];
        if let Some(restrict) = self.config.date_restrict.as_deref() {
            params.push(("dateRestrict", restrict));
        }

        tracing::debug!(query, num_results, "sending search request");
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(payload
            .items
            .into_iter()
            .map(CseItem::into_result)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> SearchConfig {
        SearchConfig {
            api_key: "search-key".to_string(),
            engine_id: "engine".to_string(),
            base_url: format!("{}/customsearch/v1", server.uri()),
            date_restrict: Some("m6".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_maps_items_and_metatags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "EV market size"))
            .and(query_param("num", "3"))
            .and(query_param("cx", "engine"))
            .and(query_param("dateRestrict", "m6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "title": "EV sales hit record",
                        "link": "https://news.example.com/ev",
                        "snippet": "Global EV sales\ngrew 35%.",
                        "displayLink": "news.example.com",
                        "pagemap": {
                            "metatags": [
                                {
                                    "article:published_time": "2024-03-01T10:00:00Z",
                                    "og:site_name": "Example News",
                                    "viewport": 3
                                }
                            ]
                        }
                    },
                    {
                        "title": "No metadata",
                        "link": "https://plain.example.com",
                        "snippet": "plain",
                        "displayLink": "plain.example.com"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let backend = GoogleSearchBackend::new(config(&server)).unwrap();
        let results = backend.search("EV market size", 3).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://news.example.com/ev");
        assert_eq!(results[0].snippet, "Global EV sales grew 35%.");
        assert_eq!(results[0].source_name, "news.example.com");
        assert_eq!(
            results[0].published_date.as_deref(),
            Some("2024-03-01T10:00:00Z")
        );
        assert_eq!(
            results[0].metadata.get("og:site_name").map(String::as_str),
            Some("Example News")
        );
        assert!(!results[0].metadata.contains_key("viewport"));
        assert!(results[1].published_date.is_none());
    }

    #[tokio::test]
    async fn test_missing_items_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "customsearch#search" })))
            .mount(&server)
            .await;

        let backend = GoogleSearchBackend::new(config(&server)).unwrap();

        assert!(backend.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let backend = GoogleSearchBackend::new(config(&server)).unwrap();
        let error = backend.search("anything", 5).await.unwrap_err();

        assert!(matches!(error, SearchError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let backend = GoogleSearchBackend::new(SearchConfig {
            api_key: String::new(),
            engine_id: String::new(),
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(
            backend.search("anything", 5).await,
            Err(SearchError::MissingCredentials)
        ));
    }
}

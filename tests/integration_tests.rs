use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use market_report::config::{CacheConfig, Config, LLMConfig, SearchConfig};
use market_report::generator::charts::ChartRegistry;
use market_report::generator::context::GeneratorContext;
use market_report::generator::outlet::{DiskOutlet, Outlet, ReportStore};
use market_report::i18n::TargetLanguage;
use market_report::llm::{ApiKey, CompletionBackend, GenerationClient, GenerationError};
use market_report::search::ResearchClient;
use market_report::{ProgressEvent, ProgressReporter, ReportPipeline, SectionCatalog, SectionSpec};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 按默认模板中的章节名返回固定正文；第一次请求模拟限流
struct ScriptedModel {
    rate_limit_once: Mutex<bool>,
    keys: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new() -> Self {
        Self {
            rate_limit_once: Mutex::new(true),
            keys: Mutex::new(Vec::new()),
        }
    }
}

fn section_from_prompt(prompt: &str) -> &str {
    prompt.split('"').nth(1).unwrap_or_default()
}

#[async_trait]
impl CompletionBackend for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, key: &ApiKey, prompt: &str) -> Result<String, GenerationError> {
        self.keys.lock().unwrap().push(key.expose().to_string());

        {
            let mut first = self.rate_limit_once.lock().unwrap();
            if *first {
                *first = false;
                return Err(GenerationError::RateLimited {
                    retry_after: Some(std::time::Duration::from_millis(5)),
                    message: "429 Too Many Requests".to_string(),
                });
            }
        }

        let body = match section_from_prompt(prompt) {
            "Market Analysis" => {
                "The global electric vehicle market keeps expanding quickly. In 2022 the market \
                 reached $250 billion; in 2024 it grew to $380 billion; forecasts for 2026 point \
                 to $520 billion as charging networks mature."
            }
            "Executive Summary" => {
                "Electric vehicles have moved from niche to mainstream. Falling battery costs, \
                 supportive regulation and a widening model range drive adoption across regions."
            }
            _ => {
                "This section summarizes the strategic outlook for the market, covering demand \
                 drivers, supply constraints and the most relevant policy developments."
            }
        };
        Ok(body.to_string())
    }
}

async fn search_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("key", "search-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "title": "Global EV Outlook",
                    "link": "https://example.com/ev-outlook",
                    "snippet": "EV sales grew strongly.",
                    "displayLink": "example.com",
                    "pagemap": { "metatags": [ { "article:published_time": "2024-05-01" } ] }
                },
                {
                    "title": "Battery Price Survey",
                    "link": "https://example.org/battery",
                    "snippet": "Pack prices keep falling.",
                    "displayLink": "example.org"
                }
            ]
        })))
        .mount(&server)
        .await;
    server
}

fn test_config(server: &MockServer, output: &TempDir) -> Config {
    Config {
        output_path: output.path().join("reports"),
        llm: LLMConfig {
            api_keys: vec!["key-a".to_string(), "key-b".to_string()],
            request_delay_ms: 0,
            soft_retry_delay_ms: 0,
            rate_limit_wait_ms: 0,
            ..Default::default()
        },
        search: SearchConfig {
            api_key: "search-key".to_string(),
            engine_id: "engine".to_string(),
            base_url: format!("{}/customsearch/v1", server.uri()),
            request_delay_ms: 0,
            ..Default::default()
        },
        cache: CacheConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn catalog() -> SectionCatalog {
    SectionCatalog::new(vec![
        SectionSpec::new("Executive Summary", 1, 300, false),
        SectionSpec::new("Market Analysis", 2, 600, true),
        SectionSpec::new("Conclusion", 3, 300, false),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_end_to_end_report_generation() {
    let server = search_server().await;
    let output = TempDir::new().unwrap();
    let config = test_config(&server, &output);

    let model = Arc::new(ScriptedModel::new());
    let llm_client = GenerationClient::with_backend(&config.llm, model.clone()).unwrap();
    let research_client = ResearchClient::new(&config.search).unwrap();
    let context = GeneratorContext::from_parts(
        config.clone(),
        catalog(),
        llm_client,
        research_client,
        Arc::new(ChartRegistry::with_defaults()),
    );

    let events = Arc::new(Mutex::new(Vec::<ProgressEvent>::new()));
    let sink_events = events.clone();
    let reporter = ProgressReporter::new(Arc::new(move |event: &ProgressEvent| {
        sink_events.lock().unwrap().push(event.clone());
    }));

    let report = ReportPipeline::new(context)
        .generate("Electric Vehicle Market", &reporter)
        .await
        .unwrap();

    // 正文按目录顺序排列
    assert_eq!(
        report.content.keys().collect::<Vec<_>>(),
        vec!["Executive Summary", "Market Analysis", "Conclusion"]
    );

    // 只有需要插图的章节出现在charts中，且能从正文中抽取出增长曲线
    assert_eq!(report.charts.len(), 1);
    let growth = &report.charts["Market Analysis"];
    assert_eq!(growth.len(), 1);
    assert_eq!(growth[0].mime_type, "image/svg+xml");
    assert!(growth[0].title.contains("Market Growth"));

    // 三个章节共享同样的两个来源
    let urls: Vec<&str> = report
        .metadata
        .source_list
        .iter()
        .map(|source| source.url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec!["https://example.com/ev-outlook", "https://example.org/battery"]
    );
    assert_eq!(
        report.metadata.source_list[0].published_date.as_deref(),
        Some("2024-05-01")
    );

    // 一次限流只多消耗一次尝试，两把KEY都参与轮换
    let keys = model.keys.lock().unwrap().clone();
    assert_eq!(keys.len(), 4);
    assert!(keys.iter().any(|key| key == "key-a"));
    assert!(keys.iter().any(|key| key == "key-b"));

    let fractions: Vec<f64> = events.lock().unwrap().iter().map(|e| e.fraction).collect();
    assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(fractions.last(), Some(&1.0));

    // 保存后可以重新列出并读取
    let outlet = DiskOutlet::new(&config.output_path, TargetLanguage::English);
    let saved = outlet.save(&report).await.unwrap();

    let markdown = std::fs::read_to_string(&saved.markdown_path).unwrap();
    assert!(markdown.starts_with("# Market Research Report: Electric Vehicle Market"));
    assert!(markdown.contains("data:image/svg+xml;base64,"));
    assert!(markdown.contains("[Battery Price Survey](https://example.org/battery)"));

    let store = ReportStore::new(&config.output_path);
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].topic, "Electric Vehicle Market");
    assert_eq!(listed[0].section_count, 3);
    assert_eq!(store.load(&listed[0].path).await.unwrap(), report);
}

#[tokio::test]
async fn test_search_outage_falls_back_without_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();
    let mut config = test_config(&server, &output);
    config.generate_charts = false;

    let model = Arc::new(ScriptedModel::new());
    let context = GeneratorContext::from_parts(
        config.clone(),
        catalog(),
        GenerationClient::with_backend(&config.llm, model).unwrap(),
        ResearchClient::new(&config.search).unwrap(),
        Arc::new(ChartRegistry::with_defaults()),
    );

    let report = ReportPipeline::new(context)
        .generate("Electric Vehicle Market", &ProgressReporter::silent())
        .await
        .unwrap();

    assert_eq!(report.content.len(), 3);
    assert!(report.charts.is_empty());
    assert_eq!(report.metadata.source_list.len(), 3);
    assert!(
        report
            .metadata
            .source_list
            .iter()
            .all(|source| source.url.starts_with("https://www.google.com/search?q="))
    );
}

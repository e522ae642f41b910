#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::config::LLMConfig;
    use crate::llm::client::{CompletionBackend, GenerationClient, GenerationError};
    use crate::llm::key_pool::{ApiKey, KeyPoolError};

    /// 按脚本依次返回结果的后端，同时记录每次调用使用的KEY
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String, GenerationError>>>,
        keys_used: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                keys_used: Mutex::new(Vec::new()),
            })
        }

        fn keys_used(&self) -> Vec<String> {
            self.keys_used.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, key: &ApiKey, _prompt: &str) -> Result<String, GenerationError> {
            self.keys_used.lock().unwrap().push(key.expose().to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Request("script exhausted".to_string())))
        }
    }

    fn config(keys: &[&str]) -> LLMConfig {
        LLMConfig {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            request_delay_ms: 0,
            soft_retry_delay_ms: 0,
            rate_limit_wait_ms: 0,
            ..Default::default()
        }
    }

    fn long_text() -> String {
        "Electric vehicle adoption keeps accelerating. ".repeat(4)
    }

    #[tokio::test]
    async fn test_first_attempt_success_reports_completion() {
        let backend = ScriptedBackend::new(vec![Ok(format!("  {}  ", long_text()))]);
        let client = GenerationClient::with_backend(&config(&["a"]), backend.clone()).unwrap();
        let events = Mutex::new(Vec::new());
        let record = |message: &str, fraction: f64| {
            events.lock().unwrap().push((message.to_string(), fraction));
        };

        let text = client
            .generate_section("Executive Summary", "prompt", Some(&record))
            .await
            .unwrap();

        assert_eq!(text, long_text().trim());
        let events = events.into_inner().unwrap();
        assert_eq!(events.first().unwrap().1, 0.0);
        assert_eq!(events.last().unwrap().1, 1.0);
        assert!(events.first().unwrap().0.contains("Executive Summary"));
    }

    #[tokio::test]
    async fn test_short_content_is_retried() {
        let backend = ScriptedBackend::new(vec![
            Ok("too short".to_string()),
            Ok(" ".repeat(200)),
            Ok(long_text()),
        ]);
        let client = GenerationClient::with_backend(&config(&["a"]), backend.clone()).unwrap();

        let text = client
            .generate_section("Market Analysis", "prompt", None)
            .await
            .unwrap();

        assert_eq!(text, long_text().trim());
        assert_eq!(backend.keys_used().len(), 3);
    }

    #[tokio::test]
    async fn test_exactly_min_chars_is_rejected() {
        let backend = ScriptedBackend::new(vec![Ok("x".repeat(100)), Ok("y".repeat(101))]);
        let client = GenerationClient::with_backend(&config(&["a"]), backend).unwrap();

        let text = client.generate_section("S", "prompt", None).await.unwrap();

        assert_eq!(text, "y".repeat(101));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_hint_and_rotates_key() {
        let backend = ScriptedBackend::new(vec![
            Err(GenerationError::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
                message: "Please try again in 5s".to_string(),
            }),
            Ok(long_text()),
        ]);
        let client = GenerationClient::with_backend(&config(&["a", "b"]), backend.clone()).unwrap();
        let start = Instant::now();

        client.generate_section("S", "prompt", None).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(backend.keys_used(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_hint_uses_default_wait() {
        let backend = ScriptedBackend::new(vec![
            Err(GenerationError::RateLimited {
                retry_after: None,
                message: "429".to_string(),
            }),
            Ok(long_text()),
        ]);
        let mut config = config(&["a", "b"]);
        config.rate_limit_wait_ms = 60_000;
        let client = GenerationClient::with_backend(&config, backend).unwrap();
        let start = Instant::now();

        client.generate_section("S", "prompt", None).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_budget_is_keys_times_attempts_per_key() {
        let backend = ScriptedBackend::new(vec![]);
        let client = GenerationClient::with_backend(&config(&["a", "b"]), backend.clone()).unwrap();

        let error = client
            .generate_section("Financial Analysis", "prompt", None)
            .await
            .unwrap_err();

        match error {
            GenerationError::Exhausted {
                section,
                attempts,
                last_error,
            } => {
                assert_eq!(section, "Financial Analysis");
                assert_eq!(attempts, 6);
                assert!(last_error.contains("script exhausted"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(backend.keys_used(), vec!["a", "b", "a", "b", "a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_keys_cooling_down_signals_exhaustion() {
        let rate_limited = || {
            Err(GenerationError::RateLimited {
                retry_after: Some(Duration::from_secs(2)),
                message: "try again in 2s".to_string(),
            })
        };
        let backend = ScriptedBackend::new(vec![rate_limited(), rate_limited(), rate_limited()]);
        let client = GenerationClient::with_backend(&config(&["only"]), backend).unwrap();

        let error = client
            .generate_section("S", "prompt", None)
            .await
            .unwrap_err();

        match error {
            GenerationError::Exhausted { last_error, .. } => {
                assert!(last_error.contains("cooling down"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let backend = ScriptedBackend::new(vec![
            Err(GenerationError::Timeout(Duration::from_secs(60))),
            Err(GenerationError::Request("connection reset".to_string())),
            Ok(long_text()),
        ]);
        let client = GenerationClient::with_backend(&config(&["a"]), backend).unwrap();

        assert!(client.generate_section("S", "prompt", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_connection() {
        let ok = ScriptedBackend::new(vec![Ok("hi".to_string())]);
        let client = GenerationClient::with_backend(&config(&["a"]), ok).unwrap();
        assert!(client.check_connection().await.is_ok());

        let failing = ScriptedBackend::new(vec![]);
        let client = GenerationClient::with_backend(&config(&["a"]), failing).unwrap();
        assert!(client.check_connection().await.is_err());
    }

    #[tokio::test]
    async fn test_check_connection_rotates_past_rate_limit() {
        let backend = ScriptedBackend::new(vec![
            Err(GenerationError::RateLimited {
                retry_after: None,
                message: "429".to_string(),
            }),
            Ok("hello".to_string()),
        ]);
        let client = GenerationClient::with_backend(&config(&["a", "b"]), backend.clone()).unwrap();

        assert!(client.check_connection().await.is_ok());
        assert_eq!(backend.keys_used(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_key_list_is_rejected() {
        let backend = ScriptedBackend::new(vec![]);
        let result = GenerationClient::with_backend(&config(&[]), backend);

        assert!(matches!(result, Err(KeyPoolError::Empty)));
    }
}

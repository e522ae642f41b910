use std::time::Duration;

use async_trait::async_trait;

use crate::llm::key_pool::ApiKey;

/// 文本生成相关错误
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GenerationError {
    #[error("rate limited by provider: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("every API key is cooling down, retry in {retry_in:?}")]
    KeysExhausted { retry_in: Duration },

    #[error("generated content too short ({chars} chars)")]
    ContentTooShort { chars: usize },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(String),

    #[error("section '{section}' failed after {attempts} attempts: {last_error}")]
    Exhausted {
        section: String,
        attempts: u32,
        last_error: String,
    },
}

impl GenerationError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenerationError::RateLimited { .. })
    }
}

/// 单次“补全这段prompt”操作的后端抽象
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// 模型标识，用于缓存键与日志
    fn model_name(&self) -> &str;

    async fn complete(&self, key: &ApiKey, prompt: &str) -> Result<String, GenerationError>;
}

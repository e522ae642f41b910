//! LLM客户端 - 在单次补全之上叠加KEY轮换、节流与重试

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::LLMConfig;
use crate::i18n::TargetLanguage;
use crate::llm::key_pool::{KeyPool, KeyPoolError};
use crate::llm::retry::{Attempt, AttemptFailure, RetryError, RetryPolicy};
use crate::utils::text::trimmed_char_count;

pub mod providers;
pub mod types;
pub mod utils;

pub use providers::RigCompletionBackend;
pub use types::{CompletionBackend, GenerationError};

/// 生成服务使用的基础系统提示词
pub const SYSTEM_PROMPT: &str = "You are a professional market research analyst providing detailed and accurate information.";

/// 尝试级别的进度回调：(状态描述, 本章节内的完成比例)
pub type AttemptProgress<'a> = &'a (dyn Fn(&str, f64) + Send + Sync);

fn notify(progress: Option<AttemptProgress<'_>>, message: &str, fraction: f64) {
    if let Some(callback) = progress {
        callback(message, fraction);
    }
}

/// 章节生成客户端
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn CompletionBackend>,
    key_pool: Arc<KeyPool>,
    policy: RetryPolicy,
    config: LLMConfig,
}

impl GenerationClient {
    /// 使用rig后端创建客户端
    pub fn new(config: &LLMConfig, language: &TargetLanguage) -> Result<Self> {
        let system_prompt = format!("{} {}", SYSTEM_PROMPT, language.prompt_instruction());
        let backend = Arc::new(RigCompletionBackend::new(config.clone(), system_prompt));
        Ok(Self::with_backend(config, backend)?)
    }

    /// 使用自定义后端创建客户端
    pub fn with_backend(
        config: &LLMConfig,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, KeyPoolError> {
        let key_pool = KeyPool::new(
            config.usable_keys(),
            Duration::from_millis(config.request_delay_ms),
        )?;
        let max_attempts = (key_pool.len() as u32)
            .saturating_mul(config.attempts_per_key)
            .max(1);

        Ok(Self {
            backend,
            key_pool: Arc::new(key_pool),
            policy: RetryPolicy::new(max_attempts),
            config: config.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    /// 检查模型连接是否正常
    ///
    /// 探测请求与章节生成共用同一套KEY轮换与重试预算，单次限流不会导致启动失败。
    pub async fn check_connection(&self) -> Result<()> {
        tracing::info!(model = %self.model_name(), "checking model connection");

        let outcome = self
            .policy
            .run(|attempt| self.attempt("connection check", "Hello", 0, attempt))
            .await;

        match outcome {
            Ok(_) => {
                tracing::info!("model connection ok");
                Ok(())
            }
            Err(e) => {
                let error = Self::final_error("connection check", e);
                tracing::error!(error = %error, "model connection failed");
                Err(anyhow::anyhow!("model connection check failed: {}", error))
            }
        }
    }

    /// 生成一个命名章节
    ///
    /// 每次尝试都会先从KEY池取下一个KEY并等待全局请求间隔。
    /// 只有去除首尾空白后长度超过 `min_content_chars` 的内容才会被接受。
    pub async fn generate_section(
        &self,
        section: &str,
        prompt: &str,
        progress: Option<AttemptProgress<'_>>,
    ) -> Result<String, GenerationError> {
        let min_chars = self.config.min_content_chars;

        let outcome = self
            .policy
            .run(|attempt| {
                notify(
                    progress,
                    &format!(
                        "Generating {} (attempt {}/{})",
                        section, attempt.number, attempt.total
                    ),
                    attempt.fraction(),
                );
                self.attempt(section, prompt, min_chars, attempt)
            })
            .await;

        match outcome {
            Ok(text) => {
                notify(progress, &format!("{} complete", section), 1.0);
                Ok(text)
            }
            Err(e) => Err(Self::final_error(section, e)),
        }
    }

    /// 单次尝试：取KEY、请求并把结果归类为接受、带等待的重试
    async fn attempt(
        &self,
        section: &str,
        prompt: &str,
        min_chars: usize,
        attempt: Attempt,
    ) -> Result<String, AttemptFailure<GenerationError>> {
        let soft_wait = Duration::from_millis(self.config.soft_retry_delay_ms);
        let rate_limit_wait = Duration::from_millis(self.config.rate_limit_wait_ms);

        let key = self.key_pool.acquire().await;
        match self.backend.complete(&key, prompt).await {
            Ok(text) => {
                let chars = trimmed_char_count(&text);
                if chars > min_chars {
                    return Ok(text.trim().to_string());
                }
                tracing::warn!(
                    section,
                    chars,
                    attempt = attempt.number,
                    "generated content too short, retrying"
                );
                Err(AttemptFailure::Retry {
                    error: GenerationError::ContentTooShort { chars },
                    wait: soft_wait,
                })
            }
            Err(GenerationError::RateLimited {
                retry_after,
                message,
            }) => {
                self.key_pool.record_rate_limit_signal(&key, retry_after);

                if let Some(retry_in) = self.key_pool.exhaustion() {
                    tracing::warn!(
                        section,
                        retry_in_ms = retry_in.as_millis() as u64,
                        "all API keys are rate limited"
                    );
                    return Err(AttemptFailure::Retry {
                        error: GenerationError::KeysExhausted { retry_in },
                        wait: retry_in,
                    });
                }

                let wait = retry_after.unwrap_or(rate_limit_wait);
                tracing::warn!(
                    section,
                    key = %key.masked(),
                    wait_ms = wait.as_millis() as u64,
                    "rate limited, rotating key"
                );
                Err(AttemptFailure::Retry {
                    error: GenerationError::RateLimited {
                        retry_after,
                        message,
                    },
                    wait,
                })
            }
            Err(error) => {
                tracing::warn!(
                    section,
                    attempt = attempt.number,
                    error = %error,
                    "generation attempt failed"
                );
                Err(AttemptFailure::Retry {
                    error,
                    wait: Duration::ZERO,
                })
            }
        }
    }

    fn final_error(section: &str, error: RetryError<GenerationError>) -> GenerationError {
        match error {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => GenerationError::Exhausted {
                section: section.to_string(),
                attempts,
                last_error: last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no attempt was made".to_string()),
            },
            RetryError::Aborted { error, .. } => error,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;

//! LLM Provider支持模块

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::{Prompt, PromptError},
    providers::gemini::completion::gemini_api_types::{AdditionalParameters, GenerationConfig},
};

use crate::config::{DEFAULT_LLM_BASE_URL, LLMConfig, LLMProvider};
use crate::llm::client::types::{CompletionBackend, GenerationError};
use crate::llm::client::utils::classify_provider_error;
use crate::llm::key_pool::ApiKey;

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    DeepSeek(rig::providers::deepseek::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Gemini(rig::providers::gemini::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    /// 使用指定的API KEY创建provider客户端
    pub fn new(config: &LLMConfig, api_key: &str) -> Result<Self> {
        match config.provider {
            LLMProvider::OpenAI => {
                let client = rig::providers::openai::Client::builder(api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::OpenAI(client))
            }
            LLMProvider::DeepSeek => {
                let client = rig::providers::deepseek::Client::builder(api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::DeepSeek(client))
            }
            LLMProvider::OpenRouter => {
                let client = rig::providers::openrouter::Client::builder(api_key).build();
                Ok(ProviderClient::OpenRouter(client))
            }
            LLMProvider::Anthropic => {
                let client = rig::providers::anthropic::ClientBuilder::new(api_key).build()?;
                Ok(ProviderClient::Anthropic(client))
            }
            LLMProvider::Gemini => {
                let client = rig::providers::gemini::Client::builder(api_key).build()?;
                Ok(ProviderClient::Gemini(client))
            }
            LLMProvider::Ollama => {
                let builder = rig::providers::ollama::Client::builder();
                let client = match ollama_base_url(config) {
                    Some(base_url) => builder.base_url(base_url).build(),
                    None => builder.build(),
                };
                Ok(ProviderClient::Ollama(client))
            }
        }
    }

    /// 创建Agent，采样参数全部来自配置
    pub fn create_agent(
        &self,
        model: &str,
        system_prompt: &str,
        config: &LLMConfig,
    ) -> Result<ProviderAgent> {
        let sampling = sampling_params(config);

        let agent = match self {
            ProviderClient::OpenAI(client) => {
                let agent = client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder()
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
                    .additional_params(sampling)
                    .build();
                ProviderAgent::OpenAI(agent)
            }
            ProviderClient::DeepSeek(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
                    .additional_params(sampling)
                    .build();
                ProviderAgent::DeepSeek(agent)
            }
            ProviderClient::OpenRouter(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
                    .additional_params(sampling)
                    .build();
                ProviderAgent::OpenRouter(agent)
            }
            ProviderClient::Anthropic(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
                    .additional_params(sampling)
                    .build();
                ProviderAgent::Anthropic(agent)
            }
            ProviderClient::Gemini(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
                    .additional_params(gemini_params(config)?)
                    .build();
                ProviderAgent::Gemini(agent)
            }
            ProviderClient::Ollama(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
                    .additional_params(sampling)
                    .build();
                ProviderAgent::Ollama(agent)
            }
        };

        Ok(agent)
    }
}

/// OpenAI兼容接口的额外采样参数
fn sampling_params(config: &LLMConfig) -> serde_json::Value {
    serde_json::json!({ "top_p": config.top_p })
}

/// Gemini的采样参数放在generationConfig中
fn gemini_params(config: &LLMConfig) -> Result<serde_json::Value> {
    let gen_cfg = GenerationConfig {
        top_p: Some(config.top_p),
        ..Default::default()
    };
    let cfg = AdditionalParameters::default().with_config(gen_cfg);
    Ok(serde_json::to_value(cfg)?)
}

/// 未改动默认地址时使用Ollama本地默认地址
fn ollama_base_url(config: &LLMConfig) -> Option<&str> {
    let base_url = config.api_base_url.trim();
    if base_url.is_empty() || base_url == DEFAULT_LLM_BASE_URL {
        None
    } else {
        Some(base_url)
    }
}

/// 统一的Agent枚举
pub enum ProviderAgent {
    OpenAI(Agent<rig::providers::openai::CompletionModel>),
    DeepSeek(Agent<rig::providers::deepseek::CompletionModel>),
    OpenRouter(Agent<rig::providers::openrouter::CompletionModel>),
    Anthropic(Agent<rig::providers::anthropic::completion::CompletionModel>),
    Gemini(Agent<rig::providers::gemini::completion::CompletionModel>),
    Ollama(Agent<rig::providers::ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    /// 执行单轮prompt
    pub async fn prompt(&self, prompt: &str) -> Result<String, PromptError> {
        match self {
            ProviderAgent::OpenAI(agent) => agent.prompt(prompt).await,
            ProviderAgent::DeepSeek(agent) => agent.prompt(prompt).await,
            ProviderAgent::OpenRouter(agent) => agent.prompt(prompt).await,
            ProviderAgent::Anthropic(agent) => agent.prompt(prompt).await,
            ProviderAgent::Gemini(agent) => agent.prompt(prompt).await,
            ProviderAgent::Ollama(agent) => agent.prompt(prompt).await,
        }
    }
}

/// 基于rig的生产环境补全后端
///
/// 每次调用都用租到的KEY新建一个provider客户端，客户端本身不缓存KEY。
pub struct RigCompletionBackend {
    config: LLMConfig,
    system_prompt: String,
}

impl RigCompletionBackend {
    pub fn new(config: LLMConfig, system_prompt: impl Into<String>) -> Self {
        Self {
            config,
            system_prompt: system_prompt.into(),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }
}

#[async_trait]
impl CompletionBackend for RigCompletionBackend {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, key: &ApiKey, prompt: &str) -> Result<String, GenerationError> {
        let client = ProviderClient::new(&self.config, key.expose())
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let agent = client
            .create_agent(&self.config.model, &self.system_prompt, &self.config)
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        tracing::debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            key = %key.masked(),
            prompt_chars = prompt.chars().count(),
            "sending completion request"
        );

        let timeout = self.timeout();
        match tokio::time::timeout(timeout, agent.prompt(prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(classify_provider_error(&e.to_string())),
            Err(_) => Err(GenerationError::Timeout(timeout)),
        }
    }
}

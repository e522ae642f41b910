use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::generator::catalog::{CatalogError, SectionCatalog, SectionSpec};
use crate::i18n::TargetLanguage;

/// 存放多个LLM API KEY的环境变量（逗号分隔）
pub const ENV_LLM_API_KEYS: &str = "MARKET_REPORT_LLM_API_KEYS";
/// 默认的OpenAI兼容接口地址（Groq）
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// 搜索服务API KEY环境变量
pub const ENV_SEARCH_API_KEY: &str = "MARKET_REPORT_SEARCH_API_KEY";
/// 搜索引擎ID环境变量
pub const ENV_SEARCH_ENGINE_ID: &str = "MARKET_REPORT_SEARCH_ENGINE_ID";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    /// OpenAI兼容接口（默认指向Groq）
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "groq" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 报告输出目录
    pub output_path: PathBuf,

    /// 报告语言
    pub target_language: TargetLanguage,

    /// 是否为需要图表的章节生成插图
    pub generate_charts: bool,

    /// 是否启用详细日志
    pub verbose: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 搜索服务配置
    pub search: SearchConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 自定义章节目录，缺省时使用内置的市场调研目录
    pub sections: Option<Vec<SectionSpec>>,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// 参与轮换的API KEY池
    pub api_keys: Vec<String>,

    /// LLM API基地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大输出tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// nucleus采样参数
    pub top_p: f64,

    /// 整个KEY池任意两次请求之间的最小间隔（毫秒）
    pub request_delay_ms: u64,

    /// 生成内容过短时的重试间隔（毫秒）
    pub soft_retry_delay_ms: u64,

    /// 触发限流且无法解析等待提示时的默认等待（毫秒）
    pub rate_limit_wait_ms: u64,

    /// 每个KEY对应的尝试次数，总尝试次数 = KEY数量 × 该值
    pub attempts_per_key: u32,

    /// 可接受内容的最小字符数（去除首尾空白后，需严格大于该值）
    pub min_content_chars: usize,

    /// 单次请求超时时间（秒）
    pub timeout_seconds: u64,

    /// 章节生成的最大并发数
    pub max_parallels: usize,
}

/// 搜索服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// 搜索API KEY
    pub api_key: String,

    /// 自定义搜索引擎ID
    pub engine_id: String,

    /// 搜索API地址
    pub base_url: String,

    /// 每个章节请求的结果数量（最多10条）
    pub num_results: u8,

    /// 两次搜索请求之间的最小间隔（毫秒）
    pub request_delay_ms: u64,

    /// 单次请求超时时间（秒）
    pub timeout_seconds: u64,

    /// 时效过滤，例如 `m6` 表示最近六个月
    pub date_restrict: Option<String>,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 构建本次运行使用的章节目录
    pub fn section_catalog(&self) -> Result<SectionCatalog, CatalogError> {
        match &self.sections {
            Some(sections) => SectionCatalog::new(sections.clone()),
            None => Ok(SectionCatalog::market_research()),
        }
    }
}

impl LLMConfig {
    /// 去除空白项后的KEY列表
    pub fn usable_keys(&self) -> Vec<String> {
        self.api_keys
            .iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect()
    }
}

/// 从环境变量读取逗号分隔的KEY列表
fn keys_from_env(var: &str) -> Vec<String> {
    std::env::var(var)
        .map(|value| {
            value
                .split(',')
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./reports"),
            target_language: TargetLanguage::default(),
            generate_charts: true,
            verbose: false,
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            sections: None,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_keys: keys_from_env(ENV_LLM_API_KEYS),
            api_base_url: String::from(DEFAULT_LLM_BASE_URL),
            model: String::from("llama-3.3-70b-versatile"),
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 0.9,
            request_delay_ms: 3000,
            soft_retry_delay_ms: 3000,
            rate_limit_wait_ms: 60_000,
            attempts_per_key: 3,
            min_content_chars: 100,
            timeout_seconds: 60,
            max_parallels: 8,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var(ENV_SEARCH_API_KEY).unwrap_or_default(),
            engine_id: std::env::var(ENV_SEARCH_ENGINE_ID).unwrap_or_default(),
            base_url: String::from("https://www.googleapis.com/customsearch/v1"),
            num_results: 5,
            request_delay_ms: 3000,
            timeout_seconds: 30,
            date_restrict: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".market-report/cache"),
            expire_hours: 168,
        }
    }
}

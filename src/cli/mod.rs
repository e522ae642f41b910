use crate::config::{Config, LLMProvider};
use crate::i18n::TargetLanguage;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// 日志过滤环境变量
pub const ENV_LOG_FILTER: &str = "MARKET_REPORT_LOG";

/// 默认配置文件名，位于当前工作目录
pub const DEFAULT_CONFIG_FILE: &str = "market-report.toml";

/// Market Report - 基于检索与LLM的市场调研报告生成器
#[derive(Parser, Debug)]
#[command(name = "market-report")]
#[command(
    about = "Generates structured market research reports: searches the web for each section, drafts the sections with an LLM, renders charts and saves the result as JSON and Markdown."
)]
#[command(version)]
pub struct Args {
    /// 报告主题
    #[arg(short, long, required_unless_present = "list_reports")]
    pub topic: Option<String>,

    /// 输出目录
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 列出输出目录中已保存的报告
    #[arg(long)]
    pub list_reports: bool,

    /// LLM Provider (openai, deepseek, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY，可重复传入多个参与轮换
    #[arg(long = "llm-api-key")]
    pub llm_api_keys: Vec<String>,

    /// 模型名称
    #[arg(long)]
    pub model: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub top_p: Option<f64>,

    /// 搜索API KEY
    #[arg(long)]
    pub search_api_key: Option<String>,

    /// 自定义搜索引擎ID
    #[arg(long)]
    pub search_engine_id: Option<String>,

    /// 每个章节的检索结果数量 (1-10)
    #[arg(long)]
    pub num_results: Option<u8>,

    /// 目标语言 (en, zh, ja, ko, de, fr, ru)
    #[arg(long)]
    pub target_language: Option<String>,

    /// 不生成插图
    #[arg(long)]
    pub no_charts: bool,

    /// 是否禁用缓存
    #[arg(long)]
    pub no_cache: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置：先读取配置文件（或默认值），再以命令行参数覆盖
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(config_path) => Config::from_file(config_path)?,
            None => {
                let default_config_path = std::env::current_dir()
                    .context("Failed to resolve working directory")?
                    .join(DEFAULT_CONFIG_FILE);
                if default_config_path.exists() {
                    Config::from_file(&default_config_path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if !self.llm_api_keys.is_empty() {
            config.llm.api_keys = self.llm_api_keys;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            config.llm.top_p = top_p;
        }

        // 覆盖搜索配置
        if let Some(search_api_key) = self.search_api_key {
            config.search.api_key = search_api_key;
        }
        if let Some(search_engine_id) = self.search_engine_id {
            config.search.engine_id = search_engine_id;
        }
        if let Some(num_results) = self.num_results {
            config.search.num_results = num_results;
        }

        // 目标语言配置
        if let Some(target_language_str) = self.target_language {
            if let Ok(target_language) = target_language_str.parse::<TargetLanguage>() {
                config.target_language = target_language;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的目标语言: {}，使用默认语言 (English)",
                    target_language_str
                );
            }
        }

        if self.no_charts {
            config.generate_charts = false;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}

/// 日志过滤规则：优先读取环境变量，否则按是否详细输出选择级别
pub fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG_FILTER).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("market_report=debug")
        } else {
            EnvFilter::new("market_report=info")
        }
    })
}

/// 初始化日志，输出到stderr，避免与控制台进度信息混杂
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

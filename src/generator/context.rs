use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::CacheManager;
use crate::config::Config;
use crate::generator::catalog::SectionCatalog;
use crate::generator::charts::{ChartRegistry, ChartRenderer};
use crate::llm::GenerationClient;
use crate::search::ResearchClient;

/// 一次运行所需的全部协作方，由配置显式构造，不依赖全局单例
#[derive(Clone)]
pub struct GeneratorContext {
    /// 配置
    pub config: Config,
    /// 章节目录，启动后不再变化
    pub catalog: Arc<SectionCatalog>,
    /// 章节生成客户端，内部持有共享的KEY池
    pub llm_client: GenerationClient,
    /// 检索客户端
    pub research_client: ResearchClient,
    /// 插图协作方
    pub chart_renderer: Arc<dyn ChartRenderer>,
    /// 缓存管理器
    pub cache_manager: Arc<CacheManager>,
}

impl GeneratorContext {
    /// 根据配置创建生产环境上下文
    pub fn new(config: Config) -> Result<Self> {
        let catalog = config
            .section_catalog()
            .context("Invalid section catalog")?;
        let llm_client = GenerationClient::new(&config.llm, &config.target_language)
            .context("Failed to create generation client")?;
        let research_client =
            ResearchClient::new(&config.search).context("Failed to create research client")?;

        Ok(Self::from_parts(
            config,
            catalog,
            llm_client,
            research_client,
            Arc::new(ChartRegistry::with_defaults()),
        ))
    }

    /// 使用现成的协作方组装上下文
    pub fn from_parts(
        config: Config,
        catalog: SectionCatalog,
        llm_client: GenerationClient,
        research_client: ResearchClient,
        chart_renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        let cache_manager = Arc::new(CacheManager::new(config.cache.clone()));
        Self {
            config,
            catalog: Arc::new(catalog),
            llm_client,
            research_client,
            chart_renderer,
            cache_manager,
        }
    }
}

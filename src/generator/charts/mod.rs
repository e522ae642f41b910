//! 插图生成：按章节名分派到对应的图表策略

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::generator::context::GeneratorContext;
use crate::generator::progress::ProgressRange;
use crate::generator::types::{ChartArtifact, SectionContents};

pub mod extract;
pub mod svg;

/// 插图失败，只影响对应章节
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ChartError {
    #[error("invalid chart data: {0}")]
    InvalidData(String),

    #[error("chart renderer failed: {0}")]
    Renderer(String),
}

/// 插图协作方：(主题, 章节名, 章节正文) -> 图片列表
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(
        &self,
        topic: &str,
        section: &str,
        content: &str,
    ) -> Result<Vec<ChartArtifact>, ChartError>;
}

/// 单个章节的图表生成策略，数据不足时返回空列表
pub trait ChartStrategy: Send + Sync {
    fn build(&self, topic: &str, content: &str) -> Result<Vec<ChartArtifact>, ChartError>;
}

/// 年度市场规模折线图
pub struct MarketGrowthChart;

impl ChartStrategy for MarketGrowthChart {
    fn build(&self, topic: &str, content: &str) -> Result<Vec<ChartArtifact>, ChartError> {
        let points = extract::year_values(content);
        if points.len() < 2 {
            return Ok(Vec::new());
        }
        let title = format!("{} Market Growth Trend", topic);
        let points: Vec<(String, f64)> = points
            .into_iter()
            .map(|(year, value)| (year.to_string(), value))
            .collect();
        let document = svg::line_chart(&title, &points)?;
        Ok(vec![ChartArtifact::svg(title, &document)])
    }
}

/// 市场份额柱状图
pub struct MarketShareChart;

impl ChartStrategy for MarketShareChart {
    fn build(&self, topic: &str, content: &str) -> Result<Vec<ChartArtifact>, ChartError> {
        let shares = extract::labeled_percentages(content);
        if shares.len() < 2 {
            return Ok(Vec::new());
        }
        let title = format!("{} Market Share Distribution", topic);
        let document = svg::bar_chart(&title, &shares, "%")?;
        Ok(vec![ChartArtifact::svg(title, &document)])
    }
}

/// 财务指标柱状图
pub struct FinancialMetricsChart;

impl ChartStrategy for FinancialMetricsChart {
    fn build(&self, topic: &str, content: &str) -> Result<Vec<ChartArtifact>, ChartError> {
        let metrics = extract::financial_metrics(content);
        if metrics.len() < 2 {
            return Ok(Vec::new());
        }
        let title = format!("{} Financial Metrics", topic);
        let document = svg::bar_chart(&title, &metrics, "")?;
        Ok(vec![ChartArtifact::svg(title, &document)])
    }
}

/// 实施路线时间轴
pub struct RoadmapTimelineChart;

impl ChartStrategy for RoadmapTimelineChart {
    fn build(&self, topic: &str, content: &str) -> Result<Vec<ChartArtifact>, ChartError> {
        let milestones = extract::milestones(content);
        if milestones.len() < 2 {
            return Ok(Vec::new());
        }
        let title = format!("{} Implementation Timeline", topic);
        let document = svg::timeline(&title, &milestones)?;
        Ok(vec![ChartArtifact::svg(title, &document)])
    }
}

/// 章节名 -> 图表策略
///
/// 新增章节的插图只需注册策略，无需修改分派逻辑；未注册的章节得到空列表。
#[derive(Clone, Default)]
pub struct ChartRegistry {
    strategies: HashMap<String, Vec<Arc<dyn ChartStrategy>>>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置的市场调研插图
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("Market Analysis", MarketGrowthChart);
        registry.register("Competitive Landscape", MarketShareChart);
        registry.register("Financial Analysis", FinancialMetricsChart);
        registry.register("Implementation Roadmap", RoadmapTimelineChart);
        registry
    }

    pub fn register(&mut self, section: impl Into<String>, strategy: impl ChartStrategy + 'static) {
        self.strategies
            .entry(section.into())
            .or_default()
            .push(Arc::new(strategy));
    }

    pub fn has_strategy(&self, section: &str) -> bool {
        self.strategies.contains_key(section)
    }
}

#[async_trait]
impl ChartRenderer for ChartRegistry {
    async fn render(
        &self,
        topic: &str,
        section: &str,
        content: &str,
    ) -> Result<Vec<ChartArtifact>, ChartError> {
        let Some(strategies) = self.strategies.get(section) else {
            return Ok(Vec::new());
        };

        let mut charts = Vec::new();
        for strategy in strategies {
            charts.extend(strategy.build(topic, content)?);
        }
        Ok(charts)
    }
}

/// 执行插图阶段
///
/// 只处理 `include_charts` 的章节，单个章节失败记为空列表，不会中断运行。
pub async fn execute(
    context: &GeneratorContext,
    topic: &str,
    contents: &SectionContents,
    progress: &ProgressRange,
) -> IndexMap<String, Vec<ChartArtifact>> {
    let mut charts = IndexMap::new();

    if !context.config.generate_charts {
        tracing::info!("chart generation disabled, skipping");
        progress.report("Chart generation skipped", 1.0);
        return charts;
    }

    let targets: Vec<&str> = context
        .catalog
        .iter()
        .filter(|section| section.include_charts)
        .map(|section| section.name.as_str())
        .collect();

    if targets.is_empty() {
        progress.report("No sections require charts", 1.0);
        return charts;
    }

    for (index, section) in targets.iter().enumerate() {
        progress.report(
            format!("Generating charts for {}", section),
            index as f64 / targets.len() as f64,
        );

        let content = contents.get(*section).map(String::as_str).unwrap_or_default();
        let artifacts = match context.chart_renderer.render(topic, section, content).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                tracing::warn!(section, error = %e, "chart generation failed, continuing without charts");
                Vec::new()
            }
        };
        tracing::debug!(section, count = artifacts.len(), "charts generated");
        charts.insert(section.to_string(), artifacts);
    }

    progress.report("Charts complete", 1.0);
    charts
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    const MARKET: &str = "In 2022 the market reached $100 billion. By 2024 it grew to $160 billion.";
    const SHARES: &str = "Tesla: 20%\nBYD: 17%\nVolkswagen: 8%";

    fn decode(artifact: &ChartArtifact) -> String {
        String::from_utf8(STANDARD.decode(&artifact.data).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_section() {
        let registry = ChartRegistry::with_defaults();

        let growth = registry.render("EV", "Market Analysis", MARKET).await.unwrap();
        assert_eq!(growth.len(), 1);
        assert_eq!(growth[0].title, "EV Market Growth Trend");
        assert_eq!(growth[0].mime_type, "image/svg+xml");
        assert!(decode(&growth[0]).contains(">2024<"));

        let shares = registry
            .render("EV", "Competitive Landscape", SHARES)
            .await
            .unwrap();
        assert_eq!(shares.len(), 1);
        assert!(decode(&shares[0]).contains("Volkswagen"));
    }

    #[tokio::test]
    async fn test_unknown_section_and_missing_data_yield_nothing() {
        let registry = ChartRegistry::with_defaults();

        assert!(registry.render("EV", "Conclusion", MARKET).await.unwrap().is_empty());
        assert!(
            registry
                .render("EV", "Market Analysis", "no figures at all")
                .await
                .unwrap()
                .is_empty()
        );
    }

    struct Failing;

    impl ChartStrategy for Failing {
        fn build(&self, _topic: &str, _content: &str) -> Result<Vec<ChartArtifact>, ChartError> {
            Err(ChartError::Renderer("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_custom_strategies_can_be_registered() {
        let mut registry = ChartRegistry::new();
        registry.register("Risk Assessment", Failing);

        assert!(registry.has_strategy("Risk Assessment"));
        assert!(registry.render("EV", "Risk Assessment", "").await.is_err());
    }

    #[test]
    fn test_roadmap_and_financial_strategies() {
        let roadmap = RoadmapTimelineChart
            .build("EV", "- 2025: Pilot\n- 2026: Rollout\n- 2028: Scale")
            .unwrap();
        assert_eq!(roadmap.len(), 1);
        assert!(decode(&roadmap[0]).contains("Phase 3 · 2028"));

        let finance = FinancialMetricsChart
            .build("EV", "Revenue of 500 million and profit of 80 million")
            .unwrap();
        assert_eq!(finance.len(), 1);
        assert!(FinancialMetricsChart.build("EV", "Revenue of 500").unwrap().is_empty());
    }
}

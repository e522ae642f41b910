use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use indexmap::IndexMap;

use crate::config::Config;
use crate::generator::catalog::SectionCatalog;
use crate::generator::context::GeneratorContext;
use crate::generator::outlet::{DiskOutlet, Outlet, SavedReport};
use crate::generator::progress::{ProgressReporter, ProgressSink};
use crate::generator::research::dedupe_sources;
use crate::generator::types::{
    ChartArtifact, PipelineState, Report, ReportError, ReportMetadata, ResearchData,
    SectionContents,
};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: IndexMap<&'static str, Instant>,
    phase_durations: IndexMap<&'static str, Duration>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: IndexMap::new(),
            phase_durations: IndexMap::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &'static str) {
        self.phase_start_times.insert(phase_name, Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &'static str) -> Option<Duration> {
        let start_time = self.phase_start_times.shift_remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations.insert(phase_name, duration);
        Some(duration)
    }

    pub fn total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn phase_durations(&self) -> &IndexMap<&'static str, Duration> {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "Total time: {:.2}s\n",
            self.total_duration().as_secs_f64()
        );
        for (phase, duration) in &self.phase_durations {
            report.push_str(&format!("- {}: {:.3}s\n", phase, duration.as_secs_f64()));
        }
        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const RESEARCH: &'static str = "research";
    pub const COMPOSE: &'static str = "compose";
    pub const CHARTS: &'static str = "charts";
    pub const COMPILE: &'static str = "compile";
}

/// 各阶段结束时的进度值
pub struct ProgressMarks;

impl ProgressMarks {
    pub const INITIALIZED: f64 = 0.05;
    pub const RESEARCHED: f64 = 0.15;
    pub const COMPOSED: f64 = 0.50;
    pub const CHARTED: f64 = 0.70;
    pub const COMPILING: f64 = 0.85;
    pub const DONE: f64 = 1.0;
}

/// 报告生成流水线
///
/// 检索与插图阶段尽力而为，正文阶段全有或全无：任一章节最终失败，整次运行失败且不返回部分报告。
pub struct ReportPipeline {
    context: GeneratorContext,
}

impl ReportPipeline {
    pub fn new(context: GeneratorContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &GeneratorContext {
        &self.context
    }

    pub async fn generate(
        &self,
        topic: &str,
        progress: &ProgressReporter,
    ) -> Result<Report, ReportError> {
        match self.run(topic, progress).await {
            Ok(report) => {
                tracing::info!(state = %PipelineState::Done, topic = %report.topic, "report generated");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    state = %PipelineState::Failed,
                    stage = %e.stage(),
                    error = %e,
                    "report generation failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&self, topic: &str, progress: &ProgressReporter) -> Result<Report, ReportError> {
        let context = &self.context;
        let mut timing = TimingScope::new();

        tracing::info!(state = %PipelineState::Initializing, "starting report pipeline");
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ReportError::InvalidTopic);
        }
        progress.report("Initializing", ProgressMarks::INITIALIZED);

        tracing::info!(state = %PipelineState::GatheringResearch, sections = context.catalog.len());
        if context.catalog.is_empty() {
            return Err(ReportError::NoSections);
        }
        timing.start_phase(TimingKeys::RESEARCH);
        let research = crate::generator::research::execute(
            context,
            topic,
            &progress.range(ProgressMarks::INITIALIZED, ProgressMarks::RESEARCHED),
        )
        .await;
        timing.end_phase(TimingKeys::RESEARCH);

        tracing::info!(state = %PipelineState::GeneratingSections, max_parallels = context.config.llm.max_parallels);
        timing.start_phase(TimingKeys::COMPOSE);
        let contents = crate::generator::compose::execute(
            context,
            topic,
            &research,
            &progress.range(ProgressMarks::RESEARCHED, ProgressMarks::COMPOSED),
        )
        .await?;
        timing.end_phase(TimingKeys::COMPOSE);

        tracing::info!(state = %PipelineState::GeneratingCharts);
        timing.start_phase(TimingKeys::CHARTS);
        let charts = crate::generator::charts::execute(
            context,
            topic,
            &contents,
            &progress.range(ProgressMarks::COMPOSED, ProgressMarks::CHARTED),
        )
        .await;
        timing.end_phase(TimingKeys::CHARTS);

        tracing::info!(state = %PipelineState::Compiling);
        progress.report("Compiling report", ProgressMarks::COMPILING);
        timing.start_phase(TimingKeys::COMPILE);
        let report = compile(topic, &context.catalog, contents, charts, &research);
        timing.end_phase(TimingKeys::COMPILE);

        progress.report("Report complete", ProgressMarks::DONE);
        tracing::debug!("{}", timing.generate_timing_report());
        Ok(report)
    }
}

/// 组装最终报告：正文与插图按目录顺序排列，来源按URL去重
pub fn compile(
    topic: &str,
    catalog: &SectionCatalog,
    mut contents: SectionContents,
    mut charts: IndexMap<String, Vec<ChartArtifact>>,
    research: &ResearchData,
) -> Report {
    let mut ordered_content = IndexMap::new();
    let mut ordered_charts = IndexMap::new();

    for section in catalog.iter() {
        if let Some(text) = contents.shift_remove(&section.name) {
            ordered_content.insert(section.name.clone(), text);
        }
        if let Some(artifacts) = charts.shift_remove(&section.name) {
            ordered_charts.insert(section.name.clone(), artifacts);
        }
    }

    Report {
        topic: topic.to_string(),
        content: ordered_content,
        charts: ordered_charts,
        metadata: ReportMetadata {
            generated_timestamp: Utc::now(),
            section_names: catalog.names().into_iter().map(str::to_string).collect(),
            source_list: dedupe_sources(research),
        },
    }
}

/// 启动报告生成工作流：检查模型连接，生成报告并写入磁盘
///
/// 空白主题在构造任何客户端、发出任何请求之前就以 `InvalidTopic` 失败。
pub async fn launch(
    topic: &str,
    config: &Config,
    sink: Arc<dyn ProgressSink>,
) -> Result<(Report, SavedReport)> {
    if topic.trim().is_empty() {
        return Err(ReportError::InvalidTopic.into());
    }

    let context = GeneratorContext::new(config.clone())?;

    // 启动时检查模型连接
    context.llm_client.check_connection().await?;

    let pipeline = ReportPipeline::new(context);
    let report = pipeline
        .generate(topic, &ProgressReporter::new(sink))
        .await?;

    let outlet = DiskOutlet::new(&config.output_path, config.target_language.clone());
    let saved = outlet.save(&report).await?;

    Ok((report, saved))
}

use std::fmt;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::llm::GenerationError;
use crate::search::SearchResult;

/// 每个章节的检索结果，按目录顺序排列
pub type ResearchData = IndexMap<String, Vec<SearchResult>>;

/// 每个章节生成的正文，按目录顺序排列
pub type SectionContents = IndexMap<String, String>;

/// 章节插图，数据为base64编码后的图片
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartArtifact {
    pub title: String,
    pub mime_type: String,
    pub data: String,
}

impl ChartArtifact {
    pub const SVG_MIME: &'static str = "image/svg+xml";

    pub fn svg(title: impl Into<String>, document: &str) -> Self {
        Self {
            title: title.into(),
            mime_type: Self::SVG_MIME.to_string(),
            data: STANDARD.encode(document.as_bytes()),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMetadata {
    pub generated_timestamp: DateTime<Utc>,
    pub section_names: Vec<String>,
    /// 按URL去重后的全部来源
    pub source_list: Vec<SearchResult>,
}

/// 一次成功运行的最终产物，生成后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub topic: String,
    pub content: IndexMap<String, String>,
    pub charts: IndexMap<String, Vec<ChartArtifact>>,
    pub metadata: ReportMetadata,
}

impl Report {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn chart_count(&self) -> usize {
        self.charts.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Initializing,
    GatheringResearch,
    GeneratingSections,
    GeneratingCharts,
    Compiling,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Initializing => "initializing",
            PipelineState::GatheringResearch => "gathering research",
            PipelineState::GeneratingSections => "generating sections",
            PipelineState::GeneratingCharts => "generating charts",
            PipelineState::Compiling => "compiling",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 报告级别的终止错误，出现时不会返回任何部分报告
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("topic must not be empty")]
    InvalidTopic,

    #[error("section catalog is empty")]
    NoSections,

    #[error("section '{section}' could not be generated: {source}")]
    SectionGenerationFailed {
        section: String,
        #[source]
        source: GenerationError,
    },
}

impl ReportError {
    /// 出错时所处的阶段
    pub fn stage(&self) -> PipelineState {
        match self {
            ReportError::InvalidTopic => PipelineState::Initializing,
            ReportError::NoSections => PipelineState::GatheringResearch,
            ReportError::SectionGenerationFailed { .. } => PipelineState::GeneratingSections,
        }
    }

    pub fn section(&self) -> Option<&str> {
        match self {
            ReportError::SectionGenerationFailed { section, .. } => Some(section),
            _ => None,
        }
    }
}

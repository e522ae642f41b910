//! 已保存报告的浏览与读取

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::generator::types::Report;

/// 已保存报告的摘要信息
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub path: PathBuf,
    pub topic: String,
    pub generated_timestamp: DateTime<Utc>,
    pub section_count: usize,
}

pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 列出目录中的全部报告，最新的在前；无法解析的文件会被跳过
    pub async fn list(&self) -> Result<Vec<StoredReport>> {
        let mut reports = Vec::new();
        if !self.dir.exists() {
            return Ok(reports);
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .context(format!("Failed to read report directory: {:?}", self.dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.load(&path).await {
                Ok(report) => reports.push(StoredReport {
                    path,
                    topic: report.topic,
                    generated_timestamp: report.metadata.generated_timestamp,
                    section_count: report.content.len(),
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable report")
                }
            }
        }

        reports.sort_by(|a, b| b.generated_timestamp.cmp(&a.generated_timestamp));
        Ok(reports)
    }

    pub async fn load(&self, path: &Path) -> Result<Report> {
        let text = fs::read_to_string(path)
            .await
            .context(format!("Failed to read report: {:?}", path))?;
        Report::from_json(&text).context(format!("Failed to parse report: {:?}", path))
    }
}

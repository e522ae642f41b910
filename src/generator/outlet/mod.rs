use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;

use crate::generator::types::Report;
use crate::i18n::TargetLanguage;
use crate::utils::text::slugify;

pub mod markdown;
pub mod store;

pub use store::{ReportStore, StoredReport};

/// 保存后的文件位置
#[derive(Debug, Clone, PartialEq)]
pub struct SavedReport {
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

#[allow(async_fn_in_trait)]
pub trait Outlet {
    async fn save(&self, report: &Report) -> Result<SavedReport>;
}

/// 写入本地磁盘：JSON为持久化格式，Markdown供阅读
pub struct DiskOutlet {
    output_dir: PathBuf,
    language: TargetLanguage,
}

impl DiskOutlet {
    pub fn new(output_dir: impl Into<PathBuf>, language: TargetLanguage) -> Self {
        Self {
            output_dir: output_dir.into(),
            language,
        }
    }

    /// `<主题slug>-<生成时间>`
    fn file_stem(report: &Report) -> String {
        format!(
            "{}-{}",
            slugify(&report.topic),
            report
                .metadata
                .generated_timestamp
                .format("%Y%m%d-%H%M%S")
        )
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, report: &Report) -> Result<SavedReport> {
        fs::create_dir_all(&self.output_dir)
            .await
            .context(format!(
                "Failed to create output directory: {:?}",
                self.output_dir
            ))?;

        let stem = Self::file_stem(report);
        let json_path = self.output_dir.join(format!("{}.json", stem));
        let markdown_path = self.output_dir.join(format!("{}.md", stem));

        fs::write(&json_path, report.to_json()?)
            .await
            .context(format!("Failed to write report: {:?}", json_path))?;

        let rendered = markdown::render(report, &self.language.report_labels());
        fs::write(&markdown_path, rendered)
            .await
            .context(format!("Failed to write report: {:?}", markdown_path))?;

        tracing::info!(
            json = %json_path.display(),
            markdown = %markdown_path.display(),
            "report saved"
        );

        Ok(SavedReport {
            json_path,
            markdown_path,
        })
    }
}

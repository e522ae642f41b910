use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use market_report::cli::{self, Args};
use market_report::generator::outlet::ReportStore;
use market_report::{ProgressEvent, launch};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let list_reports = args.list_reports;
    let topic = args.topic.clone();
    let config = args.into_config()?;
    cli::init_logging(config.verbose);

    if list_reports {
        return list_saved_reports(&config.output_path).await;
    }

    let topic = topic.context("A report topic is required")?;
    println!("🚀 Generating market research report: {}", topic);

    let started = Instant::now();
    let sink = Arc::new(|event: &ProgressEvent| {
        println!(
            "⏳ [{:>3.0}%] {}",
            event.fraction * 100.0,
            event.status_message
        );
    });

    let (report, saved) = launch(&topic, &config, sink).await?;

    println!(
        "✅ Report complete in {:.1}s: {} sections, {} charts, {} sources",
        started.elapsed().as_secs_f64(),
        report.content.len(),
        report.chart_count(),
        report.metadata.source_list.len()
    );
    println!("📄 JSON: {}", saved.json_path.display());
    println!("📝 Markdown: {}", saved.markdown_path.display());

    Ok(())
}

async fn list_saved_reports(dir: &std::path::Path) -> Result<()> {
    let reports = ReportStore::new(dir).list().await?;
    if reports.is_empty() {
        println!("📭 No saved reports in {}", dir.display());
        return Ok(());
    }

    println!("📚 Saved reports in {}:", dir.display());
    for stored in reports {
        println!(
            "  • {} ({} sections, {}) - {}",
            stored.topic,
            stored.section_count,
            stored.generated_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            stored.path.display()
        );
    }
    Ok(())
}

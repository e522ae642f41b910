//! 报告的Markdown渲染

use std::fmt::Write;

use crate::generator::types::Report;
use crate::i18n::ReportLabels;
use crate::utils::text::slugify;

pub fn render(report: &Report, labels: &ReportLabels) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}: {}\n", labels.title, report.topic);
    let _ = writeln!(
        out,
        "*{}: {}*\n",
        labels.generated,
        report
            .metadata
            .generated_timestamp
            .format("%Y-%m-%d %H:%M:%S UTC")
    );

    let _ = writeln!(out, "## {}\n", labels.contents);
    for (index, name) in report.content.keys().enumerate() {
        let _ = writeln!(out, "{}. [{}](#{})", index + 1, name, slugify(name));
    }
    out.push('\n');

    for (name, text) in &report.content {
        let _ = writeln!(out, "## {}\n", name);
        let _ = writeln!(out, "{}\n", text.trim());

        if let Some(charts) = report.charts.get(name)
            && !charts.is_empty()
        {
            let _ = writeln!(out, "### {}\n", labels.figures);
            for chart in charts {
                let _ = writeln!(out, "![{}]({})\n", chart.title, chart.data_uri());
            }
        }
    }

    if !report.metadata.source_list.is_empty() {
        let _ = writeln!(out, "## {}\n", labels.references);
        for (index, source) in report.metadata.source_list.iter().enumerate() {
            let _ = write!(
                out,
                "{}. [{}]({}) - {}",
                index + 1,
                source.title,
                source.url,
                source.source_name
            );
            if let Some(date) = &source.published_date {
                let _ = write!(out, " ({})", date);
            }
            out.push('\n');
        }
    }

    out
}

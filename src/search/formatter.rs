use std::fmt::Write;

use crate::search::types::SearchResult;

/// 没有任何检索结果时写入prompt的固定语句
pub const NO_DATA_AVAILABLE: &str =
    "No research data is available for this section. Rely on general industry knowledge and clearly state assumptions.";

/// 将检索结果渲染为编号文本块，空输入返回固定语句，结果永不为空
pub fn format_for_prompt(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_DATA_AVAILABLE.to_string();
    }

    let mut out = String::new();
    for (index, result) in results.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}", index + 1, result.title);
        let _ = writeln!(out, "Source: {}", result.source_name);
        if let Some(date) = result.published_date.as_deref()
            && !date.trim().is_empty()
        {
            let _ = writeln!(out, "Published: {}", date);
        }
        let _ = writeln!(out, "Summary: {}", result.snippet);
        let _ = writeln!(out, "URL: {}", result.url);
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result(title: &str, date: Option<&str>) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.to_lowercase()),
            snippet: format!("{} snippet", title),
            source_name: "example.com".to_string(),
            published_date: date.map(str::to_string),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_results_render_fixed_sentence() {
        let text = format_for_prompt(&[]);
        assert_eq!(text, NO_DATA_AVAILABLE);
        assert!(!text.is_empty());
    }

    #[test]
    fn test_numbered_blocks() {
        let text = format_for_prompt(&[result("Alpha", Some("2024-05-01")), result("Beta", None)]);

        assert!(text.starts_with("[1] Alpha\nSource: example.com\nPublished: 2024-05-01\n"));
        assert!(text.contains("[2] Beta\nSource: example.com\nSummary: Beta snippet\nURL: https://example.com/beta"));
        assert!(!text.ends_with('\n'));
    }
}

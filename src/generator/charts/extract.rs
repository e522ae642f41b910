//! 从章节正文中抽取可绘图的数据

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// 同一句内、年份后40个字符以内出现的第一个数值
static YEAR_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(20\d{2})\b[^0-9\n.;]{0,40}?\$?(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)")
        .expect("year value pattern is valid")
});

/// "Tesla: 20%"、"BYD Auto: 17.5 %"
static LABELED_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9&.' -]{0,40}?)\s*:\s*(\d{1,3}(?:\.\d+)?)\s*%")
        .expect("labeled percentage pattern is valid")
});

static FINANCIAL_METRIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(revenue|profit|investment|funding|valuation|market size|margin|cagr)\b[^0-9\n.;]{0,30}?\$?(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)",
    )
    .expect("financial metric pattern is valid")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("year pattern is valid"));

const MAX_POINTS: usize = 8;
const MAX_MILESTONES: usize = 6;
const MILESTONE_LABEL_CHARS: usize = 32;

fn strip_markdown(content: &str) -> String {
    content.replace(['*', '_', '`'], "")
}

fn parse_number(text: &str) -> Option<f64> {
    text.replace(',', "").parse::<f64>().ok()
}

fn metric_label(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered == "cagr" {
        return lowered.to_uppercase();
    }
    lowered
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// (年份, 数值) 序列，按年份升序，同一年份只保留首次出现的值
pub fn year_values(content: &str) -> Vec<(u16, f64)> {
    let text = strip_markdown(content);
    let mut by_year = BTreeMap::new();

    for captures in YEAR_VALUE.captures_iter(&text) {
        let (Some(year), Some(value)) = (
            captures[1].parse::<u16>().ok(),
            parse_number(&captures[2]),
        ) else {
            continue;
        };
        by_year.entry(year).or_insert(value);
    }

    by_year.into_iter().take(MAX_POINTS).collect()
}

/// 带标签的百分比，例如市场份额；标签重复时保留第一次出现的值
pub fn labeled_percentages(content: &str) -> Vec<(String, f64)> {
    let text = strip_markdown(content);
    let mut seen = Vec::<String>::new();
    let mut shares = Vec::new();

    for captures in LABELED_PERCENT.captures_iter(&text) {
        let label = captures[1].trim().trim_start_matches('-').trim().to_string();
        let Some(value) = parse_number(&captures[2]) else {
            continue;
        };
        if label.is_empty() || value > 100.0 || seen.contains(&label.to_lowercase()) {
            continue;
        }
        seen.push(label.to_lowercase());
        shares.push((label, value));
        if shares.len() == MAX_POINTS {
            break;
        }
    }

    shares
}

/// 财务指标，每类指标取第一次出现的数值
pub fn financial_metrics(content: &str) -> Vec<(String, f64)> {
    let text = strip_markdown(content);
    let mut metrics: Vec<(String, f64)> = Vec::new();

    for captures in FINANCIAL_METRIC.captures_iter(&text) {
        let name = metric_label(&captures[1]);
        let Some(value) = parse_number(&captures[2]) else {
            continue;
        };
        if metrics.iter().any(|(existing, _)| *existing == name) {
            continue;
        }
        metrics.push((name, value));
    }

    metrics
}

/// 含年份的行作为里程碑，按年份升序，每个年份取第一行
pub fn milestones(content: &str) -> Vec<(u16, String)> {
    let text = strip_markdown(content);
    let mut by_year = BTreeMap::new();

    for line in text.lines() {
        let Some(year) = YEAR
            .captures(line)
            .and_then(|captures| captures[1].parse::<u16>().ok())
        else {
            continue;
        };
        let label = line
            .trim()
            .trim_start_matches(['-', '#', '>', ' '])
            .trim();
        let label = crate::utils::text::truncate_chars(label, MILESTONE_LABEL_CHARS);
        by_year.entry(year).or_insert(label);
    }

    by_year.into_iter().take(MAX_MILESTONES).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_values() {
        let content = "The market was worth $120 billion in 2021. \
            In 2023, it reached **$180.5 billion**, and by 2030 analysts expect 1,200 billion. \
            Another 2023 estimate said 175.";

        assert_eq!(
            year_values(content),
            vec![(2023, 180.5), (2030, 1200.0)]
        );
    }

    #[test]
    fn test_year_values_first_value_per_year() {
        let content = "2022: 100 units\n2024: 300 units\n2022: 999 units";
        assert_eq!(year_values(content), vec![(2022, 100.0), (2024, 300.0)]);
    }

    #[test]
    fn test_labeled_percentages() {
        let content = "Market shares:\n- **Tesla**: 20%\n- BYD Auto: 17.5 %\n- Tesla: 30%\n- Others: 150%";

        assert_eq!(
            labeled_percentages(content),
            vec![("Tesla".to_string(), 20.0), ("BYD Auto".to_string(), 17.5)]
        );
    }

    #[test]
    fn test_financial_metrics() {
        let content = "Revenue grew to $4,500 million while profit reached 320 million. \
            Total investment was 1.2 billion. Revenue later hit 5,000.";

        assert_eq!(
            financial_metrics(content),
            vec![
                ("Revenue".to_string(), 4500.0),
                ("Profit".to_string(), 320.0),
                ("Investment".to_string(), 1.2),
            ]
        );
    }

    #[test]
    fn test_financial_metrics_multiword_and_acronym() {
        let metrics = financial_metrics("Market size: 50 billion with a CAGR of 12.5%");
        assert_eq!(
            metrics,
            vec![
                ("Market Size".to_string(), 50.0),
                ("CAGR".to_string(), 12.5)
            ]
        );
    }

    #[test]
    fn test_milestones() {
        let content = "## Roadmap\n- 2026: Scale production\n- 2025: Pilot program launch\nNo year here\n- 2026: duplicate";

        assert_eq!(
            milestones(content),
            vec![
                (2025, "2025: Pilot program launch".to_string()),
                (2026, "2026: Scale production".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_data() {
        assert!(year_values("nothing numeric").is_empty());
        assert!(labeled_percentages("no shares").is_empty());
        assert!(financial_metrics("no money").is_empty());
        assert!(milestones("no years").is_empty());
    }
}

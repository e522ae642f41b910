/// 无对应提示词时追加的通用后缀
pub const GENERIC_QUERY_SUFFIX: &str = "market research analysis";

/// 章节名 -> 检索关键词
const SECTION_HINTS: [(&str, &str); 12] = [
    ("Executive Summary", "market overview key findings"),
    ("Introduction", "industry background definition"),
    ("Market Analysis", "market size growth rate trends forecast"),
    ("Competitive Landscape", "market share leading companies competitors"),
    ("Technical Analysis", "technology innovation patents"),
    ("Financial Analysis", "revenue investment funding profitability"),
    ("Implementation", "adoption deployment case studies"),
    ("Implementation Roadmap", "adoption timeline milestones"),
    ("Risk Assessment", "risks challenges regulation"),
    ("Future Outlook", "future trends predictions 2030"),
    ("Recommendations", "strategy opportunities best practices"),
    ("Conclusion", "market outlook summary"),
];

pub fn section_hint(section: &str) -> Option<&'static str> {
    SECTION_HINTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(section.trim()))
        .map(|(_, hint)| *hint)
}

/// 组合章节检索语句：主题 + 章节关键词；未知章节使用通用后缀
pub fn section_query(topic: &str, section: &str) -> String {
    let topic = topic.trim();
    match section_hint(section) {
        Some(hint) => format!("{} {}", topic, hint),
        None => format!("{} {}", topic, GENERIC_QUERY_SUFFIX),
    }
}

//! 章节目录：报告由哪些章节组成、以何种顺序输出

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(section|words|topic|context)\}").expect("placeholder pattern is valid")
});

/// 默认的章节prompt模板
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
Write the \"{section}\" section of a professional market research report about {topic}.

Use the following research findings as your primary evidence:
{context}

Requirements:
- Aim for roughly {words} words.
- Use clear headings, bullet points and concrete figures where the research supports them.
- Cite sources inline by their bracketed number, for example [1].
- Do not invent statistics that the research does not support.";

fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}

/// 单个章节的静态定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionSpec {
    /// 章节名，目录内唯一
    pub name: String,
    /// 输出顺序，与完成顺序无关
    pub ordinal: u32,
    pub target_words: u32,
    #[serde(default)]
    pub include_charts: bool,
    /// 支持 `{topic}`、`{context}`、`{section}`、`{words}` 占位符
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

impl SectionSpec {
    pub fn new(name: impl Into<String>, ordinal: u32, target_words: u32, include_charts: bool) -> Self {
        Self {
            name: name.into(),
            ordinal,
            target_words,
            include_charts,
            prompt_template: default_prompt_template(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// 用主题与检索上下文填充模板
    ///
    /// 一次扫描完成替换，填入的文本中即使含有占位符也不会被再次展开。
    pub fn render_prompt(&self, topic: &str, context: &str) -> String {
        PLACEHOLDER
            .replace_all(&self.prompt_template, |captures: &Captures| match &captures[1] {
                "section" => self.name.clone(),
                "words" => self.target_words.to_string(),
                "topic" => topic.to_string(),
                _ => context.to_string(),
            })
            .into_owned()
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate section name: {0}")]
    DuplicateSection(String),

    #[error("section name must not be blank")]
    BlankName,
}

/// 有序的章节目录，启动后不再变化
#[derive(Debug, Clone, PartialEq)]
pub struct SectionCatalog {
    sections: Vec<SectionSpec>,
}

impl SectionCatalog {
    /// 校验章节名并按 `ordinal` 稳定排序
    pub fn new(mut sections: Vec<SectionSpec>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for section in &sections {
            let name = section.name.trim();
            if name.is_empty() {
                return Err(CatalogError::BlankName);
            }
            if !seen.insert(name.to_string()) {
                return Err(CatalogError::DuplicateSection(name.to_string()));
            }
        }

        sections.sort_by_key(|section| section.ordinal);
        Ok(Self { sections })
    }

    /// 内置的市场调研报告目录
    pub fn market_research() -> Self {
        Self {
            sections: vec![
                SectionSpec::new("Executive Summary", 1, 400, false),
                SectionSpec::new("Introduction", 2, 400, false),
                SectionSpec::new("Market Analysis", 3, 900, true),
                SectionSpec::new("Competitive Landscape", 4, 800, true),
                SectionSpec::new("Technical Analysis", 5, 800, false),
                SectionSpec::new("Financial Analysis", 6, 700, true),
                SectionSpec::new("Implementation Roadmap", 7, 600, true),
                SectionSpec::new("Future Outlook", 8, 600, false),
                SectionSpec::new("Recommendations", 9, 500, false),
                SectionSpec::new("Conclusion", 10, 300, false),
            ],
        }
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionSpec> {
        self.sections.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

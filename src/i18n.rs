use serde::{Deserialize, Serialize};

/// 报告语言
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "en")]
    #[default]
    English,
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Chinese => write!(f, "zh"),
            TargetLanguage::Japanese => write!(f, "ja"),
            TargetLanguage::Korean => write!(f, "ko"),
            TargetLanguage::German => write!(f, "de"),
            TargetLanguage::French => write!(f, "fr"),
            TargetLanguage::Russian => write!(f, "ru"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" | "英文" => Ok(TargetLanguage::English),
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            "ja" | "japanese" | "日本語" | "日文" => Ok(TargetLanguage::Japanese),
            "ko" | "korean" | "한국어" | "韩文" => Ok(TargetLanguage::Korean),
            "de" | "german" | "deutsch" | "德文" => Ok(TargetLanguage::German),
            "fr" | "french" | "français" | "法文" => Ok(TargetLanguage::French),
            "ru" | "russian" | "русский" | "俄文" => Ok(TargetLanguage::Russian),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

/// 渲染报告时使用的固定标签
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportLabels {
    pub title: &'static str,
    pub generated: &'static str,
    pub contents: &'static str,
    pub figures: &'static str,
    pub references: &'static str,
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::Chinese => "中文",
            TargetLanguage::Japanese => "日本語",
            TargetLanguage::Korean => "한국어",
            TargetLanguage::German => "Deutsch",
            TargetLanguage::French => "Français",
            TargetLanguage::Russian => "Русский",
        }
    }

    /// 追加到系统提示词中的语言指令
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::English => {
                "Write the report section in English, using precise, professional and easy-to-follow language."
            }
            TargetLanguage::Chinese => "请使用中文撰写报告章节，确保表述准确、专业、易于理解。",
            TargetLanguage::Japanese => {
                "レポートのセクションは日本語で作成してください。正確で専門的、かつ分かりやすい表現を心がけてください。"
            }
            TargetLanguage::Korean => {
                "보고서 섹션을 한국어로 작성해 주세요. 정확하고 전문적이며 이해하기 쉬운 표현을 사용해 주세요."
            }
            TargetLanguage::German => {
                "Bitte verfassen Sie den Berichtsabschnitt auf Deutsch, präzise, professionell und gut verständlich."
            }
            TargetLanguage::French => {
                "Veuillez rédiger la section du rapport en français, de manière précise, professionnelle et facile à comprendre."
            }
            TargetLanguage::Russian => {
                "Пожалуйста, напишите раздел отчёта на русском языке, точно, профессионально и понятно."
            }
        }
    }

    /// 报告标题、目录等固定文字
    pub fn report_labels(&self) -> ReportLabels {
        match self {
            TargetLanguage::English => ReportLabels {
                title: "Market Research Report",
                generated: "Generated",
                contents: "Table of Contents",
                figures: "Figures",
                references: "References",
            },
            TargetLanguage::Chinese => ReportLabels {
                title: "市场调研报告",
                generated: "生成时间",
                contents: "目录",
                figures: "图表",
                references: "参考资料",
            },
            TargetLanguage::Japanese => ReportLabels {
                title: "市場調査レポート",
                generated: "作成日時",
                contents: "目次",
                figures: "図表",
                references: "参考文献",
            },
            TargetLanguage::Korean => ReportLabels {
                title: "시장 조사 보고서",
                generated: "생성 시각",
                contents: "목차",
                figures: "도표",
                references: "참고 자료",
            },
            TargetLanguage::German => ReportLabels {
                title: "Marktforschungsbericht",
                generated: "Erstellt",
                contents: "Inhaltsverzeichnis",
                figures: "Abbildungen",
                references: "Quellen",
            },
            TargetLanguage::French => ReportLabels {
                title: "Rapport d'étude de marché",
                generated: "Généré le",
                contents: "Table des matières",
                figures: "Figures",
                references: "Références",
            },
            TargetLanguage::Russian => ReportLabels {
                title: "Отчёт о маркетинговом исследовании",
                generated: "Создан",
                contents: "Содержание",
                figures: "Диаграммы",
                references: "Источники",
            },
        }
    }
}

use reportgen_common::ReportConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterPlan {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionContent {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterContent {
    pub title: String,
    pub sections: Vec<SectionContent>,
}

/// Everything a [`crate::DocumentBuilder`] needs to serialize one report.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub config: ReportConfig,
    pub chapters: Vec<ChapterContent>,
    pub references: Vec<String>,
}

impl ChapterPlan {
    pub fn new(title: impl Into<String>, sections: &[&str]) -> Self {
        Self {
            title: title.into(),
            sections: sections.iter().map(|section| section.to_string()).collect(),
        }
    }
}

pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

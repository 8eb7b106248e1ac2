use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Type tag of a layout element. Unrecognised tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Table,
    Title,
    Header,
    Footer,
    PageNumber,
    #[default]
    Text,
    Other(String),
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "Table" => ElementKind::Table,
            "Title" => ElementKind::Title,
            "Header" => ElementKind::Header,
            "Footer" => ElementKind::Footer,
            "PageNumber" => ElementKind::PageNumber,
            "" | "NarrativeText" | "Text" => ElementKind::Text,
            _ => ElementKind::Other(tag),
        }
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Table => "Table".into(),
            ElementKind::Title => "Title".into(),
            ElementKind::Header => "Header".into(),
            ElementKind::Footer => "Footer".into(),
            ElementKind::PageNumber => "PageNumber".into(),
            ElementKind::Text => "NarrativeText".into(),
            ElementKind::Other(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Markup rendering of a table (`<table><tr><td>…`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_as_html: Option<String>,
    /// Geometric rendering of a table: rows of nullable cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_rows: Option<Vec<Vec<Option<String>>>>,
}

/// One content unit produced by the external layout step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ElementKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: ElementMetadata,
}

impl Element {
    pub fn text(text: &str) -> Self {
        Element {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// A table element carrying a geometric rendering.
    pub fn table(text: &str, rows: Vec<Vec<Option<String>>>) -> Self {
        Element {
            kind: ElementKind::Table,
            text: text.to_string(),
            metadata: ElementMetadata {
                table_rows: Some(rows),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// A table element carrying a markup rendering.
    pub fn html_table(text: &str, html: &str) -> Self {
        Element {
            kind: ElementKind::Table,
            text: text.to_string(),
            metadata: ElementMetadata {
                text_as_html: Some(html.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn is_table(&self) -> bool {
        self.kind == ElementKind::Table
    }

    /// Running headers, footers and page numbers.
    pub fn is_page_furniture(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Header | ElementKind::Footer | ElementKind::PageNumber
        )
    }

    pub fn page_number(&self) -> Option<u32> {
        self.metadata.page_number
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Bare(Vec<Element>),
    Wrapped { elements: Vec<Element> },
}

/// Parse an element stream: either a bare array or `{ "elements": [...] }`.
pub fn parse_elements(json: &str) -> Result<Vec<Element>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let has_list = value.is_array() || value.get("elements").is_some_and(|e| e.is_array());
    if !has_list {
        return Err(Error::MissingElements);
    }
    match serde_json::from_value(value)? {
        Envelope::Bare(elements) | Envelope::Wrapped { elements } => Ok(elements),
    }
}

pub fn load_elements(path: &std::path::Path) -> Result<Vec<Element>> {
    let json = std::fs::read_to_string(path)?;
    parse_elements(&json)
}

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::element::Element;
use crate::parser::cells::Units;
use crate::parser::classify::{self, RowClass, RowClassifier};
use crate::parser::rows::{self, Row};
use crate::parser::sanitize;
use crate::parser::sections::{self, SectionId};

static ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{2}[LRCM]?)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+|NIL)\s*(.*?)$").unwrap()
});
static CONTINUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s+(\d+)\s+(\d+)\s+(\d+|NIL)\s*(.*?)$").unwrap()
});
static UNIT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ["TORA", "TODA", "ASDA", "LDA"]
        .into_iter()
        .map(|field| (field, Regex::new(&format!(r"{}\s*\(([A-Za-z]+)\)", field)).unwrap()))
        .collect()
});

const HEADER_WORDS: &[&str] = &["RWY", "DESIGNATOR", "TORA", "TODA", "ASDA", "LDA", "REMARKS"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclaredDistanceEntry {
    #[serde(rename = "TORA")]
    pub tora: Option<String>,
    #[serde(rename = "TORA_unit", skip_serializing_if = "Option::is_none")]
    pub tora_unit: Option<String>,
    #[serde(rename = "TODA")]
    pub toda: Option<String>,
    #[serde(rename = "TODA_unit", skip_serializing_if = "Option::is_none")]
    pub toda_unit: Option<String>,
    #[serde(rename = "ASDA")]
    pub asda: Option<String>,
    #[serde(rename = "ASDA_unit", skip_serializing_if = "Option::is_none")]
    pub asda_unit: Option<String>,
    #[serde(rename = "LDA")]
    pub lda: Option<String>,
    #[serde(rename = "LDA_unit", skip_serializing_if = "Option::is_none")]
    pub lda_unit: Option<String>,
    #[serde(rename = "Remarks")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunwayDistanceGroup {
    #[serde(rename = "RWY Designator")]
    pub designator: String,
    pub entries: Vec<DeclaredDistanceEntry>,
}

fn is_header(leading: &str) -> bool {
    let upper = leading.to_uppercase();
    HEADER_WORDS.iter().any(|w| upper.contains(w))
}

/// Leading designator (empty for continuation rows) and the five value
/// captures, or `None` when the row matches neither layout.
fn split_row(text: &str) -> Option<(String, [String; 5])> {
    if let Some(caps) = ROW_RE.captures(text) {
        let values = [2, 3, 4, 5, 6].map(|i| caps.get(i).map_or("", |m| m.as_str()).to_string());
        return Some((caps[1].to_uppercase(), values));
    }
    CONTINUATION_RE.captures(text).map(|caps| {
        let values = [1, 2, 3, 4, 5].map(|i| caps.get(i).map_or("", |m| m.as_str()).to_string());
        (String::new(), values)
    })
}

fn entry(values: &[String; 5], units: &Units) -> DeclaredDistanceEntry {
    let [tora, toda, asda, lda, remarks] = values.clone().map(|v| sanitize::clean_value(&v));
    DeclaredDistanceEntry {
        tora_unit: units.for_value("TORA", &tora),
        toda_unit: units.for_value("TODA", &toda),
        asda_unit: units.for_value("ASDA", &asda),
        lda_unit: units.for_value("LDA", &lda),
        tora,
        toda,
        asda,
        lda,
        remarks,
    }
}

fn designator_number(designator: &str) -> u32 {
    designator
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

pub fn from_rows(rows: &[Row], header_text: &str) -> Vec<RunwayDistanceGroup> {
    let units = Units::lookup(header_text, &UNIT_PATTERNS);
    let mut classifier: RowClassifier<String> = RowClassifier::new(is_header);
    let mut groups: IndexMap<String, Vec<DeclaredDistanceEntry>> = IndexMap::new();

    for row in rows {
        let text = row.joined();
        if classify::is_column_stub(&text) {
            continue;
        }
        let (leading, values) = match split_row(&text) {
            Some((leading, values)) => (leading, Some(values)),
            None => (row.cell(0).to_string(), None),
        };

        let designator = match classifier.classify(&leading, values.is_some(), |d| Some(d.to_string())) {
            RowClass::Skip => continue,
            RowClass::Primary(d) => d,
            RowClass::Continuation(d) => {
                debug!(rwy = %d, "declared distance continuation");
                d
            }
        };
        if let Some(values) = values {
            groups.entry(designator).or_default().push(entry(&values, &units));
        }
    }

    let mut out: Vec<RunwayDistanceGroup> = groups
        .into_iter()
        .map(|(designator, entries)| RunwayDistanceGroup { designator, entries })
        .collect();
    out.sort_by(|a, b| {
        designator_number(&a.designator)
            .cmp(&designator_number(&b.designator))
            .then_with(|| a.designator.cmp(&b.designator))
    });
    out
}

pub fn extract(elements: &[Element]) -> Vec<RunwayDistanceGroup> {
    let located = sections::locate(elements, SectionId::DeclaredDistances);
    let rows: Vec<Row> = located.iter().flat_map(|e| rows::element_rows(e)).collect();
    let header_text = format!(
        "{}\n{}",
        sections::section_text(&located),
        rows.iter().map(Row::joined).collect::<Vec<_>>().join("\n")
    );
    let out = from_rows(&rows, &header_text);
    info!(runways = out.len(), entries = out.iter().map(|g| g.entries.len()).sum::<usize>(), "AD 2.13 extracted");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        Row::from(cells.to_vec())
    }

    #[test]
    fn designators_sort_numerically_then_lexically() {
        let rows = vec![
            row(&["29L", "3640", "3640", "3640", "3640", "NIL"]),
            row(&["11R", "3646", "3646", "3646", "2796", "NIL"]),
            row(&["02C", "2800", "2800", "2800", "2800", ""]),
        ];
        let out = from_rows(&rows, "");
        let order: Vec<&str> = out.iter().map(|g| g.designator.as_str()).collect();
        assert_eq!(order, vec!["02C", "11R", "29L"]);
    }

    #[test]
    fn continuation_rows_become_extra_entries() {
        let rows = vec![
            row(&["RWY Designator", "TORA (M)", "TODA (M)", "ASDA (M)", "LDA (M)", "Remarks"]),
            row(&["1", "2", "3", "4", "5", "6"]),
            row(&["29L", "3640", "3640", "3640", "NIL", "Take-off from\nintersection with U"]),
            row(&["", "3544", "3544", "3544", "NIL", "Take-off from intersection with A2"]),
        ];
        let out = from_rows(&rows, "RWY Designator TORA (M) TODA (M) ASDA (M) LDA (M) Remarks");
        assert_eq!(out.len(), 1);
        let g = &out[0];
        assert_eq!(g.designator, "29L");
        assert_eq!(g.entries.len(), 2);
        assert_eq!(g.entries[0].tora.as_deref(), Some("3640"));
        assert_eq!(g.entries[0].lda, None);
        assert_eq!(g.entries[0].lda_unit, None);
        assert_eq!(g.entries[0].remarks.as_deref(), Some("Take-off from intersection with U"));
        assert_eq!(g.entries[1].asda.as_deref(), Some("3544"));
        assert_eq!(g.entries[1].asda_unit.as_deref(), Some("M"));
    }

    #[test]
    fn continuation_without_designator_is_dropped() {
        let rows = vec![row(&["", "3544", "3544", "3544", "NIL", "x"])];
        assert!(from_rows(&rows, "").is_empty());
    }

    #[test]
    fn flattened_text_lines() {
        let rows = vec![
            row(&["11L 3646 3646 3646 2796 NIL"]),
            row(&["11L 3000 3000 3000 NIL Take-off from intersection with B"]),
            row(&["3544 3544 3544 NIL Take-off from intersection with A2"]),
        ];
        let out = from_rows(&rows, "TORA (FT)");
        assert_eq!(out[0].entries.len(), 3);
        assert_eq!(out[0].entries[0].tora_unit.as_deref(), Some("FT"));
        assert_eq!(out[0].entries[0].toda_unit.as_deref(), Some("M"));
        assert_eq!(out[0].entries[0].remarks, None);
    }

    #[test]
    fn entry_serialization() {
        let out = from_rows(&[row(&["11R", "3646", "3646", "3646", "NIL", "NIL"])], "");
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            serde_json::json!([{
                "RWY Designator": "11R",
                "entries": [{
                    "TORA": "3646", "TORA_unit": "M",
                    "TODA": "3646", "TODA_unit": "M",
                    "ASDA": "3646", "ASDA_unit": "M",
                    "LDA": null,
                    "Remarks": null
                }]
            }])
        );
    }
}

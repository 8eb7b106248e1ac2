use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::element::Element;
use crate::parser::rows::{self, Row};
use crate::parser::sanitize;
use crate::parser::sections::{self, SectionId};

/// AD 2.2 target fields, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminField {
    ArpCoordinates,
    DirectionDistance,
    ElevationTemperature,
    MagneticVariation,
    TrafficTypes,
}

impl AdminField {
    pub const ALL: [AdminField; 5] = [
        AdminField::ArpCoordinates,
        AdminField::DirectionDistance,
        AdminField::ElevationTemperature,
        AdminField::MagneticVariation,
        AdminField::TrafficTypes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AdminField::ArpCoordinates => "ARP coordinates and site at AD",
            AdminField::DirectionDistance => "Direction and distance from (city)",
            AdminField::ElevationTemperature => "Elevation / Reference temperature",
            AdminField::MagneticVariation => "MAG VAR / Annual change",
            AdminField::TrafficTypes => "Types of traffic permitted (IFR/VFR)",
        }
    }

    /// Accepted phrase variants, lowercase.
    fn phrases(self) -> &'static [&'static str] {
        match self {
            AdminField::ArpCoordinates => &["arp coordinates", "coordinates and site"],
            AdminField::DirectionDistance => &["direction and distance from", "direction and distance"],
            AdminField::ElevationTemperature => &["elevation", "reference temperature"],
            AdminField::MagneticVariation => &["mag var", "annual change"],
            AdminField::TrafficTypes => &["types of traffic", "traffic permitted"],
        }
    }

    fn text_pattern(self) -> &'static Regex {
        &TEXT_PATTERNS[self as usize]
    }
}

impl Serialize for AdminField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub field: AdminField,
    pub value: String,
}

// Short function words never count as a shared significant word.
const STOPWORDS: &[&str] = &["from", "with", "and", "the"];

static TEXT_PATTERNS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r"(?im)ARP coordinates and site at AD[:\s]+([^\n]+)",
        r"(?im)Direction and distance from\s*\(city\)[:\s]+([^\n]+)",
        r"(?im)Elevation\s*/\s*Reference temperature[:\s]+([^\n]+)",
        r"(?im)MAG VAR\s*/\s*Annual change[:\s]+([^\n]+)",
        r"(?im)Types of traffic permitted\s*\(IFR/VFR\)[:\s]+([^\n]+)",
    ]
    .map(|p| Regex::new(p).unwrap())
});

/// First target field whose phrases match `name`, by substring or by a
/// shared significant word.
pub fn match_field(name: &str) -> Option<AdminField> {
    let lower = name.to_lowercase();
    AdminField::ALL.into_iter().find(|field| {
        field.phrases().iter().any(|phrase| {
            lower.contains(phrase)
                || phrase
                    .split_whitespace()
                    .filter(|w| w.len() > 3 && !STOPWORDS.contains(w))
                    .any(|w| lower.contains(w))
        })
    })
}

/// Field-name and value cells for a 2-column or numbered 3-column row.
fn name_and_value(row: &Row) -> Option<(&str, &str)> {
    if row.len() < 2 {
        return None;
    }
    let leading = row.cell(0).trim();
    let (name, value) = if row.len() >= 3 && !leading.is_empty() && leading.chars().all(|c| c.is_ascii_digit()) {
        (row.cell(1), row.cell(2))
    } else {
        (row.cell(0), row.cell(1))
    };
    (!name.trim().is_empty()).then_some((name, value))
}

pub fn from_rows(rows: &[Row], text: &str) -> Vec<FieldValue> {
    let mut found: HashMap<AdminField, String> = HashMap::new();

    for row in rows {
        let Some((name, value)) = name_and_value(row) else {
            continue;
        };
        let Some(field) = match_field(name) else {
            continue;
        };
        if found.contains_key(&field) {
            debug!(field = field.label(), "field already filled, row ignored");
            continue;
        }
        if let Some(value) = sanitize::clean_value(value) {
            found.insert(field, value);
        }
    }

    if found.len() < AdminField::ALL.len() {
        for field in AdminField::ALL {
            if found.contains_key(&field) {
                continue;
            }
            let value = field
                .text_pattern()
                .captures(text)
                .and_then(|caps| sanitize::clean_value(&caps[1]));
            if let Some(value) = value {
                debug!(field = field.label(), "filled from page text");
                found.insert(field, value);
            }
        }
    }

    AdminField::ALL
        .into_iter()
        .filter_map(|field| found.remove(&field).map(|value| FieldValue { field, value }))
        .collect()
}

pub fn extract(elements: &[Element]) -> Vec<FieldValue> {
    let located = sections::locate(elements, SectionId::Administrative);
    let rows: Vec<Row> = located.iter().flat_map(|e| rows::element_rows(e)).collect();
    from_rows(&rows, &sections::section_text(&located))
}

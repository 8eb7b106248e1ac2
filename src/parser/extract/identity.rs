use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::element::Element;
use crate::parser::sanitize;
use crate::parser::sections::{self, SectionId};

static NAME_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\b([A-Z]{4}) *- *([A-Za-z]+) */ *([A-Za-z ]+?)(?: +(?i:International|INTL))? *$").unwrap()
});
static PAGE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AIP\s+AD\s+\d+-\d+\s+([A-Z]{4})\b").unwrap());

/// AD 2.1: location indicator, locality and aerodrome name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    /// ICAO location indicator, e.g. `OIII`.
    pub name: Option<String>,
    /// Locality served, title-cased.
    pub country: Option<String>,
    /// Aerodrome name, always ending in `International`.
    pub aip: Option<String>,
}

pub fn extract(elements: &[Element]) -> IdentityRecord {
    let located = sections::locate(elements, SectionId::Identity);
    let text = sections::section_text(&located);

    if let Some(record) = from_text(&text) {
        return record;
    }

    let document = elements
        .iter()
        .map(|e| sanitize::strip_lines(&e.text))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    from_page_header(&document).unwrap_or_default()
}

/// Match the `<ICAO> - <locality> / <name>` line.
pub fn from_text(text: &str) -> Option<IdentityRecord> {
    let caps = NAME_LINE_RE.captures(text)?;
    let aip = caps[3].trim();
    let aip = if aip.to_lowercase().contains("international") {
        aip.to_string()
    } else {
        format!("{} International", aip)
    };
    Some(IdentityRecord {
        name: Some(caps[1].to_uppercase()),
        country: Some(title_case(&caps[2])),
        aip: Some(aip),
    })
}

/// Looser match anchored to the identifier printed in the page header.
pub fn from_page_header(text: &str) -> Option<IdentityRecord> {
    let icao = PAGE_HEADER_RE.captures(text)?.get(1)?.as_str().to_string();
    debug!(icao = %icao, "identity from page header");

    let pattern = format!(
        r"(?m)\b{} *- *([A-Z][A-Za-z]+) */ *([A-Za-z ]+?) *(?:International|INTL|$)",
        regex::escape(&icao)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    Some(IdentityRecord {
        name: Some(icao),
        country: Some(title_case(&caps[1])),
        aip: Some(format!("{} International", caps[2].trim())),
    })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

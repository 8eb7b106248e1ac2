use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::sanitize;
use crate::element::Element;

/// The aerodrome subsections this crate extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionId {
    #[serde(rename = "AD 2.1")]
    Identity,
    #[serde(rename = "AD 2.2")]
    Administrative,
    #[serde(rename = "AD 2.10")]
    Obstacles,
    #[serde(rename = "AD 2.12")]
    RunwayCharacteristics,
    #[serde(rename = "AD 2.13")]
    DeclaredDistances,
}

impl SectionId {
    pub const ALL: [SectionId; 5] = [
        SectionId::Identity,
        SectionId::Administrative,
        SectionId::Obstacles,
        SectionId::RunwayCharacteristics,
        SectionId::DeclaredDistances,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SectionId::Identity => "AD 2.1 AERODROME LOCATION INDICATOR AND NAME",
            SectionId::Administrative => "AD 2.2 AERODROME GEOGRAPHICAL AND ADMINISTRATIVE DATA",
            SectionId::Obstacles => "AD 2.10 AERODROME OBSTACLES",
            SectionId::RunwayCharacteristics => "AD 2.12 RUNWAY PHYSICAL CHARACTERISTICS",
            SectionId::DeclaredDistances => "AD 2.13 DECLARED DISTANCES",
        }
    }

    fn markers(self) -> &'static Markers {
        match self {
            SectionId::Identity => &IDENTITY,
            SectionId::Administrative => &ADMINISTRATIVE,
            SectionId::Obstacles => &OBSTACLES,
            SectionId::RunwayCharacteristics => &RUNWAYS,
            SectionId::DeclaredDistances => &DISTANCES,
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Static marker tables for one section.
struct Markers {
    start: Regex,
    end: Regex,
    /// Case-insensitive substrings that mark a continuation chunk.
    continuation: &'static [&'static str],
    /// Shape-based continuation tokens (designators and the like).
    continuation_re: Option<Regex>,
}

impl Markers {
    fn new(
        start: &str,
        end: &str,
        continuation: &'static [&'static str],
        continuation_re: Option<&str>,
    ) -> Self {
        Markers {
            start: Regex::new(start).unwrap(),
            end: Regex::new(end).unwrap(),
            continuation,
            continuation_re: continuation_re.map(|p| Regex::new(p).unwrap()),
        }
    }

    fn continues(&self, text: &str) -> bool {
        let upper = text.to_uppercase();
        self.continuation.iter().any(|c| upper.contains(c))
            || self.continuation_re.as_ref().is_some_and(|re| re.is_match(text))
    }
}

// `AD 2.1` must not match `AD 2.10`..`AD 2.19`, hence the trailing non-digit.
static IDENTITY: LazyLock<Markers> = LazyLock::new(|| {
    Markers::new(
        r"(?i)\bAD\s*2\.1(?:\D|$)|AERODROME LOCATION INDICATOR|LOCATION INDICATOR AND NAME",
        r"(?i)\bAD\s*2\.2(?:\D|$)",
        &["INTERNATIONAL", "INTL", "AIP"],
        Some(r"\b[A-Z]{4}\s*-\s*[A-Za-z]"),
    )
});

static ADMINISTRATIVE: LazyLock<Markers> = LazyLock::new(|| {
    Markers::new(
        r"(?i)\bAD\s*2\.2(?:\D|$)|AERODROME GEOGRAPHICAL",
        r"(?i)\bAD\s*2\.3(?:\D|$)",
        &[
            "ARP COORDINATES",
            "DIRECTION AND DISTANCE",
            "ELEVATION",
            "MAG VAR",
            "TYPES OF TRAFFIC",
            "GEOID UNDULATION",
            "AD ADMINISTRATION",
            "REMARKS",
        ],
        None,
    )
});

static OBSTACLES: LazyLock<Markers> = LazyLock::new(|| {
    Markers::new(
        r"(?i)\bAD\s*2\.10(?:\D|$)|AERODROME OBSTACLES",
        r"(?i)\bAD\s*2\.11(?:\D|$)",
        &["FT AMSL", "FT AGL", "/ APCH", "/ TKOF", "RWY/AREA AFFECTED", "OBSTACLE TYPE"],
        Some(r"(?i)\b\d{2}[LRC]?(?:/[LRC])?\s*/\s*(?:[LRC]\s+)?(?:APCH|TKOF)\b"),
    )
});

static RUNWAYS: LazyLock<Markers> = LazyLock::new(|| {
    Markers::new(
        r"(?i)\bAD\s*2\.12(?:\D|$)|RUNWAY PHYSICAL CHARACTERISTICS",
        r"(?i)\bAD\s*2\.13(?:\D|$)",
        &[
            "DESIGNATIONS",
            "TRUE BRG",
            "DIMENSIONS OF RWY",
            "THR COORDINATES",
            "THR ELEVATION",
            "SLOPE OF RWY",
            "SWY DIMENSIONS",
            "CWY DIMENSIONS",
            "STRIP DIMENSION",
            "RESA",
            "OFZ",
            "1 2 3 4 5 6",
            "7 8 9 10 11 12",
        ],
        Some(r"\b(?:0[1-9]|[1-2][0-9]|3[0-6])[LRC]\b|\d\s*%\s+(?:NIL|\d)"),
    )
});

static DISTANCES: LazyLock<Markers> = LazyLock::new(|| {
    Markers::new(
        r"(?i)\bAD\s*2\.13(?:\D|$)|DECLARED DISTANCES",
        r"(?i)\bAD\s*2\.14(?:\D|$)",
        &["RWY", "DESIGNATOR", "TORA", "TODA", "ASDA", "LDA", "REMARKS"],
        Some(r"\b\d{2}[LRCM]?\b"),
    )
});

static FURNITURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:.*\bAIRAC AMDT\b.*|.*\bCIVIL AVIATION ORGANIZATION\b.*|AD\s*2-\d+\s+[A-Z]{4}\b.*|WEF\s+\d+\s+\w+\s+\d+.*)$",
    )
    .unwrap()
});

/// Locator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    Searching,
    Collecting,
    Done,
}

/// Scans an element stream for one section's start, continuation and end
/// markers. Content may span any number of pages; the first chunk that is
/// neither a continuation nor the next section's heading ends collection.
pub struct SectionLocator {
    section: SectionId,
    state: LocatorState,
}

impl SectionLocator {
    pub fn new(section: SectionId) -> Self {
        SectionLocator {
            section,
            state: LocatorState::Searching,
        }
    }

    pub fn state(&self) -> LocatorState {
        self.state
    }

    /// Feed one chunk of (sanitised) text; returns whether it is retained.
    pub fn feed(&mut self, text: &str) -> bool {
        let markers = self.section.markers();
        match self.state {
            LocatorState::Searching => {
                if markers.start.is_match(text) {
                    self.state = LocatorState::Collecting;
                    true
                } else {
                    false
                }
            }
            LocatorState::Collecting => {
                if markers.end.is_match(text) {
                    self.state = LocatorState::Done;
                    true
                } else if markers.continues(text) {
                    true
                } else {
                    self.state = LocatorState::Done;
                    false
                }
            }
            LocatorState::Done => false,
        }
    }
}

/// Page furniture never extends nor ends a section.
pub fn is_furniture(element: &Element, text: &str) -> bool {
    element.is_page_furniture()
        || (!text.is_empty() && text.lines().all(|l| FURNITURE_RE.is_match(l.trim())))
}

/// Elements belonging to `section`, in document order.
pub fn locate(elements: &[Element], section: SectionId) -> Vec<&Element> {
    let mut locator = SectionLocator::new(section);
    let mut retained = Vec::new();

    for (idx, element) in elements.iter().enumerate() {
        let text = sanitize::strip_lines(&element.text);
        if text.is_empty() || is_furniture(element, &text) {
            continue;
        }
        if locator.feed(&text) {
            retained.push(element);
        }
        if locator.state() == LocatorState::Done {
            debug!(section = %section, last = idx, retained = retained.len(), "section closed");
            break;
        }
    }

    retained
}

/// Sanitised text of the located elements, one element per line block.
pub fn section_text(elements: &[&Element]) -> String {
    elements
        .iter()
        .map(|e| sanitize::strip_lines(&e.text))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;

    fn titles(found: &[&Element]) -> Vec<String> {
        found.iter().map(|e| e.text.clone()).collect()
    }

    #[test]
    fn identity_does_not_match_later_sections() {
        let mut locator = SectionLocator::new(SectionId::Identity);
        assert!(!locator.feed("AD 2.10 AERODROME OBSTACLES"));
        assert!(!locator.feed("AD 2.12 RUNWAY PHYSICAL CHARACTERISTICS"));
        assert_eq!(locator.state(), LocatorState::Searching);
        assert!(locator.feed("AD 2.1 AERODROME LOCATION INDICATOR AND NAME"));
        assert_eq!(locator.state(), LocatorState::Collecting);
    }

    #[test]
    fn collects_across_pages_until_next_section() {
        let elements = vec![
            Element::text("AD 2.9 SURFACE MOVEMENT GUIDANCE"),
            Element::text("AD 2.13 DECLARED DISTANCES"),
            Element::table("RWY TORA (M) TODA (M) ASDA (M) LDA (M) Remarks", vec![]),
            Element {
                kind: ElementKind::Footer,
                text: "AIRAC AMDT 05/23".into(),
                ..Default::default()
            },
            Element::text("AD 2-12 OIII\nWEF 05 OCT 2023"),
            Element::table("29L 3640 3640 3640 NIL", vec![]),
            Element::text("AD 2.14 APPROACH AND RUNWAY LIGHTING"),
            Element::text("11L PALS CAT I"),
        ];
        let found = locate(&elements, SectionId::DeclaredDistances);
        assert_eq!(
            titles(&found),
            vec![
                "AD 2.13 DECLARED DISTANCES",
                "RWY TORA (M) TODA (M) ASDA (M) LDA (M) Remarks",
                "29L 3640 3640 3640 NIL",
                "AD 2.14 APPROACH AND RUNWAY LIGHTING",
            ]
        );
    }

    #[test]
    fn unrelated_chunk_ends_collection_unretained() {
        let mut locator = SectionLocator::new(SectionId::Obstacles);
        assert!(locator.feed("AD 2.10 AERODROME OBSTACLES"));
        assert!(locator.feed("11R / APCH DVOR/DME antenna 4010 FT AMSL"));
        assert!(locator.feed("31R / L APCH Antenna 3990 FT"));
        assert!(!locator.feed("Meteorological office hours H24"));
        assert_eq!(locator.state(), LocatorState::Done);
        assert!(!locator.feed("29L / TKOF mast 3990 FT AMSL"));
    }

    #[test]
    fn runway_designators_continue_ad2_12() {
        let mut locator = SectionLocator::new(SectionId::RunwayCharacteristics);
        assert!(locator.feed("AD 2.12 RUNWAY PHYSICAL CHARACTERISTICS"));
        assert!(locator.feed("32R 289.65GEO 4033 x 45"));
        assert!(locator.feed("0.3% NIL NIL 4153 x 300 NIL NIL"));
        assert_eq!(locator.state(), LocatorState::Collecting);
    }

    #[test]
    fn missing_section_yields_nothing() {
        let elements = vec![Element::text("AD 2.3 OPERATIONAL HOURS")];
        assert!(locate(&elements, SectionId::Obstacles).is_empty());
    }

    #[test]
    fn furniture_detection() {
        let footer = Element::text("AIRAC AMDT 05/23");
        assert!(is_furniture(&footer, "AIRAC AMDT 05/23"));
        let body = Element::text("Take-off from intersection with U");
        assert!(!is_furniture(&body, "Take-off from intersection with U"));
    }
}

//! Field-level parsers for cells that pack several values.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::sanitize;

static DESIGNATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{2})([LRC](?:/[LRC])*)?\s*/\s*(?:([LRC])\s+)?(APCH|TKOF)\b").unwrap()
});
static LAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{6}\.?\d*[NS]").unwrap());
static LON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"0\d{6}\.?\d*[EW]").unwrap());
static ELEVATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*FT\s*(AMSL|AGL)").unwrap());
static DESCRIPTION_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s/()\-.,]").unwrap());

// ── Runway keys ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    L,
    R,
    C,
}

impl Side {
    fn from_char(c: char) -> Option<Side> {
        match c.to_ascii_uppercase() {
            'L' => Some(Side::L),
            'R' => Some(Side::R),
            'C' => Some(Side::C),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Apch,
    Tkof,
}

/// One approach/take-off area of one runway end, e.g. `11R / APCH`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunwayKey {
    pub number: String,
    pub side: Side,
    pub phase: Phase,
}

impl fmt::Display for RunwayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::L => 'L',
            Side::R => 'R',
            Side::C => 'C',
        };
        let phase = match self.phase {
            Phase::Apch => "APCH",
            Phase::Tkof => "TKOF",
        };
        write!(f, "{}{} / {}", self.number, side, phase)
    }
}

impl Serialize for RunwayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Expand a (possibly multi-line) designator cell into the set of keys it
/// names. No side means both L and R; `L/R` lists sides explicitly, and so
/// does a side after the slash (`31R / L APCH` is 31R and 31L).
pub fn expand_designators(cell: &str) -> BTreeSet<RunwayKey> {
    let mut keys = BTreeSet::new();
    for line in sanitize::strip(cell).lines() {
        for caps in DESIGNATOR_RE.captures_iter(line) {
            let number = caps[1].to_string();
            let phase = if caps[4].eq_ignore_ascii_case("APCH") {
                Phase::Apch
            } else {
                Phase::Tkof
            };
            let mut sides: BTreeSet<Side> = [caps.get(2), caps.get(3)]
                .into_iter()
                .flatten()
                .flat_map(|m| m.as_str().chars().filter_map(Side::from_char))
                .collect();
            if sides.is_empty() {
                sides = BTreeSet::from([Side::L, Side::R]);
            }
            for side in sides {
                keys.insert(RunwayKey {
                    number: number.clone(),
                    side,
                    phase,
                });
            }
        }
    }
    keys
}

// ── Coordinates ──

/// Latitude and longitude found independently, space-joined.
pub fn parse_coordinates(cell: &str) -> Option<String> {
    let text = sanitize::strip(cell);
    let lat = LAT_RE.find(&text).map(|m| m.as_str());
    let lon = LON_RE.find(&text).map(|m| m.as_str());
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(format!("{} {}", lat, lon)),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

// ── Obstacle description ──

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObstacleDescription {
    pub description: Option<String>,
    pub elevation: Option<String>,
    pub markings: Option<String>,
}

impl ObstacleDescription {
    /// Description, elevation and markings in that order, nulls omitted.
    pub fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.description, &self.elevation, &self.markings]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

fn is_marking(token: &str) -> bool {
    token.eq_ignore_ascii_case("LGTD") || sanitize::is_nil(token)
}

pub fn parse_obstacle(cell: &str) -> ObstacleDescription {
    let mut parts: Vec<String> = Vec::new();
    let mut elevations: Vec<String> = Vec::new();
    let mut markings = None;

    for line in sanitize::strip_lines(cell).lines() {
        if is_marking(line) {
            markings = Some(line.to_uppercase());
            continue;
        }
        if ELEVATION_RE.is_match(line) {
            // Elevation and height may both be given (AMSL then AGL).
            elevations.extend(
                ELEVATION_RE
                    .captures_iter(line)
                    .map(|caps| format!("{} FT {}", &caps[1], caps[2].to_uppercase())),
            );
            let rest = ELEVATION_RE.replace_all(line, "");
            let rest = rest.trim();
            if !rest.is_empty() && !rest.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
                parts.push(rest.to_string());
            }
            continue;
        }
        parts.push(line.to_string());
    }

    // Flattened cells carry the marking as the last token of the text.
    if markings.is_none() {
        if let Some(last) = parts.last_mut() {
            if let Some((head, tail)) = last.rsplit_once(' ') {
                if is_marking(tail) {
                    markings = Some(tail.to_uppercase());
                    *last = head.to_string();
                }
            }
        }
    }

    let description = parts.join(" ");
    let description = sanitize::collapse(&DESCRIPTION_NOISE_RE.replace_all(&description, ""));
    ObstacleDescription {
        description: (!description.is_empty()).then_some(description),
        elevation: (!elevations.is_empty()).then(|| elevations.join(" ")),
        markings,
    }
}

// ── Units ──

pub const DEFAULT_LINEAR_UNIT: &str = "M";

/// Units resolved once per document for one section.
#[derive(Debug, Clone, Default)]
pub struct Units {
    found: HashMap<&'static str, String>,
}

impl Units {
    /// Search header text for `<label> ... (<unit>)` annotations; fields
    /// without one fall back to [`DEFAULT_LINEAR_UNIT`].
    pub fn lookup(header_text: &str, patterns: &[(&'static str, Regex)]) -> Self {
        let found = patterns
            .iter()
            .filter_map(|(field, re)| {
                re.captures(header_text)
                    .map(|caps| (*field, caps[1].to_string()))
            })
            .collect();
        Units { found }
    }

    pub fn get(&self, field: &str) -> &str {
        self.found.get(field).map(String::as_str).unwrap_or(DEFAULT_LINEAR_UNIT)
    }

    /// The unit for `field`, only when the value it annotates is present.
    pub fn for_value(&self, field: &str, value: &Option<String>) -> Option<String> {
        value.as_ref().map(|_| self.get(field).to_string())
    }
}

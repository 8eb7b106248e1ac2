//! AD 2.12 runway physical characteristics.
//!
//! The table is published as two column groups (1-6 and 7-12) that arrive as
//! separate chunks, often on different pages. Pass 1 builds one record per
//! designator from the threshold group; pass 2 collects the slope/strip rows,
//! which carry no designator, and a [`FragmentJoin`] pairs the two.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::element::Element;
use crate::error::{Error, Result};
use crate::parser::cells::Units;
use crate::parser::rows::{self, Row};
use crate::parser::sanitize;
use crate::parser::sections::{self, SectionId};

static THRESHOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<rwy>\d{2}[LRCM]?)\s+(?P<brg>\d+(?:\.\d+)?)\s*GEO\s+(?P<dims>\d+\s*x\s*\d+)",
        r"\s+(?P<strength>(?:PC[NR]\s*)?\d+/[A-Z](?:/[A-Z]){3})",
        r"(?:\s+(?P<surface>[A-Za-z]+(?:\s+[A-Za-z]+)*?))?",
        r"\s+(?P<lat>\d{6}(?:\.\d+)?[NS])",
        r"(?:\s+(?P<lon>0?\d{6,7}(?:\.\d+)?[EW]))?",
        r"(?:\s+GUND\s*(?P<gund>[+-]?\s*\d+)\s*FT)?",
        r"\s+THR\s+(?P<elev>\d+)\s*FT",
    ))
    .unwrap()
});
static SURFACE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:(?P<surface>[A-Za-z]+(?:\s+[A-Za-z]+)*)\s+)?(?P<lon>0?\d{6,7}(?:\.\d+)?[EW])",
        r"(?:\s+GUND\s*(?P<gund>[+-]?\s*\d+)\s*FT)?",
    ))
    .unwrap()
});
static GUND_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^GUND\s*(?P<gund>[+-]?\s*\d+)\s*FT").unwrap());
static SLOPE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d+(?:\.\d+)?)\s*%\s+(NIL|\d+\s*x\s*\d+)\s+(NIL|\d+\s*x\s*\d+)\s+(NIL|\d+\s*x\s*\d+)\s+(NIL|\d+\s*x\s*\d+)\s+(NIL|\S+)",
    )
    .unwrap()
});

const DIMENSIONS: &str = "Dimensions of RWY";
const SWY: &str = "SWY dimensions";
const CWY: &str = "CWY dimensions";
const STRIP: &str = "Strip dimensions";
const RESA: &str = "RESA";

static UNIT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (DIMENSIONS, r"RWY\s*\(([A-Za-z]+)\)"),
        (SWY, r"SWY[^\n]*?\(([A-Za-z]+)\)"),
        (CWY, r"CWY[^\n]*?\(([A-Za-z]+)\)"),
        (STRIP, r"Strip[^\n]*?\(([A-Za-z]+)\)"),
        (RESA, r"RESA[^\n]*?\(([A-Za-z]+)\)"),
    ]
    .into_iter()
    .map(|(field, p)| (field, Regex::new(p).unwrap()))
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunwayPhysicalRecord {
    #[serde(rename = "Designations RWY NR")]
    pub designation: String,
    #[serde(rename = "TRUE BRG")]
    pub true_bearing: Option<String>,
    #[serde(rename = "Dimensions of RWY")]
    pub dimensions: Option<String>,
    #[serde(rename = "Dimensions of RWY_unit", skip_serializing_if = "Option::is_none")]
    pub dimensions_unit: Option<String>,
    #[serde(rename = "Strength (PCR or PCN) and surface of RWY and SWY")]
    pub strength: Option<String>,
    #[serde(rename = "THR coordinates THR geoid undulation")]
    pub threshold_coordinates: Option<String>,
    #[serde(rename = "THR elevation and highest elevation of TDZ of precision APP RWY")]
    pub threshold_elevation: Option<String>,
    #[serde(rename = "Slope of RWY - SWY")]
    pub slope: Option<String>,
    #[serde(rename = "SWY dimensions")]
    pub stopway: Option<String>,
    #[serde(rename = "SWY dimensions_unit", skip_serializing_if = "Option::is_none")]
    pub stopway_unit: Option<String>,
    #[serde(rename = "CWY dimensions")]
    pub clearway: Option<String>,
    #[serde(rename = "CWY dimensions_unit", skip_serializing_if = "Option::is_none")]
    pub clearway_unit: Option<String>,
    #[serde(rename = "Strip dimensions")]
    pub strip: Option<String>,
    #[serde(rename = "Strip dimensions_unit", skip_serializing_if = "Option::is_none")]
    pub strip_unit: Option<String>,
    #[serde(rename = "RESA")]
    pub resa: Option<String>,
    #[serde(rename = "RESA_unit", skip_serializing_if = "Option::is_none")]
    pub resa_unit: Option<String>,
    #[serde(rename = "OFZ")]
    pub ofz: Option<String>,
}

/// One row of the slope/strip column group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlopeRow {
    pub slope: String,
    pub stopway: Option<String>,
    pub clearway: Option<String>,
    pub strip: Option<String>,
    pub resa: Option<String>,
    pub ofz: Option<String>,
}

/// Pairs pass-2 rows with pass-1 records. Returns, per record, the index of
/// its slope row (if any).
pub trait FragmentJoin {
    fn pair(&self, records: &[RunwayPhysicalRecord], slopes: &[SlopeRow]) -> Result<Vec<Option<usize>>>;
}

/// k-th slope row goes to the k-th designator. Differing non-zero counts are
/// refused rather than mis-paired.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalJoin;

impl FragmentJoin for PositionalJoin {
    fn pair(&self, records: &[RunwayPhysicalRecord], slopes: &[SlopeRow]) -> Result<Vec<Option<usize>>> {
        if !records.is_empty() && !slopes.is_empty() && records.len() != slopes.len() {
            return Err(Error::FragmentMisalignment {
                runways: records.len(),
                fragments: slopes.len(),
            });
        }
        Ok((0..records.len()).map(|k| (k < slopes.len()).then_some(k)).collect())
    }
}

fn gund(raw: &str) -> String {
    format!("GUND {}FT", raw.split_whitespace().collect::<String>())
}

/// Pass 1: designator-anchored threshold rows plus their follow-up lines.
fn threshold_records(lines: &[String]) -> Vec<RunwayPhysicalRecord> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = THRESHOLD_RE.captures(lines[i].trim()) else {
            i += 1;
            continue;
        };

        let mut surface = caps.name("surface").map(|m| m.as_str().to_string());
        let mut lon = caps.name("lon").map(|m| m.as_str().to_string());
        let mut undulation = caps.name("gund").map(|m| gund(m.as_str()));

        if lon.is_none() {
            if let Some(next) = lines.get(i + 1).and_then(|l| SURFACE_LINE_RE.captures(l.trim())) {
                surface = surface.or_else(|| next.name("surface").map(|m| m.as_str().to_string()));
                lon = Some(next["lon"].to_string());
                undulation = undulation.or_else(|| next.name("gund").map(|m| gund(m.as_str())));
                i += 1;
            }
        }
        if undulation.is_none() {
            if let Some(next) = lines.get(i + 1).and_then(|l| GUND_LINE_RE.captures(l.trim())) {
                undulation = Some(gund(&next["gund"]));
                i += 1;
            }
        }
        i += 1;

        let designation = caps["rwy"].to_string();
        if !seen.insert(designation.clone()) {
            debug!(rwy = %designation, "designator already recorded");
            continue;
        }

        let strength = match surface {
            Some(surface) => format!("{} {}", &caps["strength"], surface),
            None => caps["strength"].to_string(),
        };
        let coordinates = [Some(caps["lat"].to_string()), lon, undulation]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        records.push(RunwayPhysicalRecord {
            designation,
            true_bearing: Some(format!("{} GEO", &caps["brg"])),
            dimensions: Some(sanitize::collapse(&caps["dims"])),
            strength: Some(strength),
            threshold_coordinates: Some(coordinates),
            threshold_elevation: Some(format!("THR {} FT", &caps["elev"])),
            ..Default::default()
        });
    }

    records
}

/// Pass 2: slope/strip rows in document order.
fn slope_rows(lines: &[String]) -> Vec<SlopeRow> {
    lines
        .iter()
        .filter_map(|line| SLOPE_LINE_RE.captures(line.trim()))
        .map(|caps| SlopeRow {
            slope: format!("{}%", &caps[1]),
            stopway: sanitize::clean_value(&caps[2]),
            clearway: sanitize::clean_value(&caps[3]),
            strip: sanitize::clean_value(&caps[4]),
            resa: sanitize::clean_value(&caps[5]),
            ofz: sanitize::clean_value(&caps[6]),
        })
        .collect()
}

/// Build records from the section's visual lines. A join failure leaves the
/// slope/strip fields null and is handed back alongside the records.
pub fn from_lines<J: FragmentJoin>(
    lines: &[String],
    header_text: &str,
    join: &J,
) -> (Vec<RunwayPhysicalRecord>, Option<Error>) {
    let mut records = threshold_records(lines);
    let slopes = slope_rows(lines);
    debug!(runways = records.len(), slope_rows = slopes.len(), "AD 2.12 passes done");

    let failure = match join.pair(&records, &slopes) {
        Ok(pairs) => {
            for (record, pair) in records.iter_mut().zip(pairs) {
                if let Some(row) = pair.and_then(|k| slopes.get(k)) {
                    record.slope = Some(row.slope.clone());
                    record.stopway = row.stopway.clone();
                    record.clearway = row.clearway.clone();
                    record.strip = row.strip.clone();
                    record.resa = row.resa.clone();
                    record.ofz = row.ofz.clone();
                }
            }
            None
        }
        Err(e) => {
            warn!(error = %e, "slope/strip columns left empty");
            Some(e)
        }
    };

    let units = Units::lookup(header_text, &UNIT_PATTERNS);
    for record in &mut records {
        record.dimensions_unit = units.for_value(DIMENSIONS, &record.dimensions);
        record.stopway_unit = units.for_value(SWY, &record.stopway);
        record.clearway_unit = units.for_value(CWY, &record.clearway);
        record.strip_unit = units.for_value(STRIP, &record.strip);
        record.resa_unit = units.for_value(RESA, &record.resa);
    }

    (records, failure)
}

/// [`from_lines`] over the visual lines of already-normalised rows. Unit
/// annotations are searched in `header_text` and in the rows themselves.
pub fn from_rows<J: FragmentJoin>(
    rows: &[Row],
    header_text: &str,
    join: &J,
) -> (Vec<RunwayPhysicalRecord>, Option<Error>) {
    let lines: Vec<String> = rows.iter().flat_map(Row::visual_lines).collect();
    let header_text = format!("{}\n{}", header_text, lines.join("\n"));
    from_lines(&lines, &header_text, join)
}

pub fn extract(elements: &[Element]) -> (Vec<RunwayPhysicalRecord>, Option<Error>) {
    let located = sections::locate(elements, SectionId::RunwayCharacteristics);
    let rows: Vec<Row> = located.iter().flat_map(|e| rows::element_rows(e)).collect();

    let (records, failure) = from_rows(&rows, &sections::section_text(&located), &PositionalJoin);
    info!(runways = records.len(), "AD 2.12 extracted");
    (records, failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    const THREE_LINE: &str = "\
11L 109.63GEO 3646 x 45 720/R/A/W/T 354144.03N THR 3956 FT
Concrete 0511701.6E
GUND -85 FT
29R 289.65GEO 3646 x 45 720/R/A/W/T 354100.12N THR 3962 FT
Asphalt 0511912.3E
GUND -86 FT
0.3% NIL NIL 3766 x 300 NIL NIL
0.3% 60 x 45 NIL 3766 x 300 240 x 150 NIL";

    #[test]
    fn three_line_layout() {
        let (records, failure) = from_lines(&lines(THREE_LINE), "Dimensions of RWY (M)", &PositionalJoin);
        assert!(failure.is_none());
        assert_eq!(records.len(), 2);

        let r = &records[0];
        assert_eq!(r.designation, "11L");
        assert_eq!(r.true_bearing.as_deref(), Some("109.63 GEO"));
        assert_eq!(r.dimensions.as_deref(), Some("3646 x 45"));
        assert_eq!(r.dimensions_unit.as_deref(), Some("M"));
        assert_eq!(r.strength.as_deref(), Some("720/R/A/W/T Concrete"));
        assert_eq!(r.threshold_coordinates.as_deref(), Some("354144.03N 0511701.6E GUND -85FT"));
        assert_eq!(r.threshold_elevation.as_deref(), Some("THR 3956 FT"));
        assert_eq!(r.slope.as_deref(), Some("0.3%"));
        assert_eq!(r.stopway, None);
        assert_eq!(r.stopway_unit, None);
        assert_eq!(r.strip.as_deref(), Some("3766 x 300"));

        let r = &records[1];
        assert_eq!(r.strength.as_deref(), Some("720/R/A/W/T Asphalt"));
        assert_eq!(r.stopway.as_deref(), Some("60 x 45"));
        assert_eq!(r.stopway_unit.as_deref(), Some("M"));
        assert_eq!(r.resa.as_deref(), Some("240 x 150"));
    }

    #[test]
    fn flattened_line() {
        let text = "14L 136.51GEO 4033 x 45 PCN 80/F/A/W/T Asphalt 352250.63N 0510823.12E GUND -92 FT THR 3300 FT";
        let (records, _) = from_lines(&lines(text), "", &PositionalJoin);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].strength.as_deref(), Some("PCN 80/F/A/W/T Asphalt"));
        assert_eq!(
            records[0].threshold_coordinates.as_deref(),
            Some("352250.63N 0510823.12E GUND -92FT")
        );
        assert_eq!(records[0].slope, None);
    }

    #[test]
    fn units_from_headers() {
        let header = "Dimensions of RWY (FT)\nSWY dimensions (FT)\nStrip dimensions (M)";
        let (records, _) = from_lines(&lines(THREE_LINE), header, &PositionalJoin);
        assert_eq!(records[0].dimensions_unit.as_deref(), Some("FT"));
        assert_eq!(records[1].stopway_unit.as_deref(), Some("FT"));
        assert_eq!(records[1].resa_unit.as_deref(), Some("M"));
    }

    #[test]
    fn repeated_designator_is_ignored() {
        let text = "\
32R 289.65GEO 4033 x 45 80/F/A/W/T 352108.2N THR 3340 FT
32R 289.65GEO 4033 x 45 80/F/A/W/T 352108.2N THR 3340 FT";
        let (records, _) = from_lines(&lines(text), "", &PositionalJoin);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn misalignment_leaves_slope_columns_null() {
        let text = "\
11L 109.63GEO 3646 x 45 720/R/A/W/T 354144.03N THR 3956 FT
29R 289.65GEO 3646 x 45 720/R/A/W/T 354100.12N THR 3962 FT
0.3% NIL NIL 3766 x 300 NIL NIL";
        let (records, failure) = from_lines(&lines(text), "", &PositionalJoin);
        assert!(matches!(
            failure,
            Some(Error::FragmentMisalignment { runways: 2, fragments: 1 })
        ));
        assert!(records.iter().all(|r| r.slope.is_none() && r.strip.is_none()));
    }

    #[test]
    fn geometric_and_markup_rows() {
        let rows = vec![
            Row::from(vec!["Designations RWY NR", "TRUE BRG", "Dimensions of RWY (FT)"]),
            Row::from(vec!["1", "2", "3", "4", "5", "6"]),
            Row::from(vec![
                "11L",
                "109.63GEO",
                "3646 x 45",
                "720/R/A/W/T\nConcrete",
                "354144.03N\n0511701.6E\nGUND -85 FT",
                "THR 3956 FT",
            ]),
            Row::from(vec!["0.3%", "NIL", "NIL", "3766 x 300", "NIL", "NIL"]),
        ];
        let (records, failure) = from_rows(&rows, "", &PositionalJoin);
        assert!(failure.is_none());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].strength.as_deref(), Some("720/R/A/W/T Concrete"));
        assert_eq!(records[0].threshold_coordinates.as_deref(), Some("354144.03N 0511701.6E GUND -85FT"));
        assert_eq!(records[0].dimensions_unit.as_deref(), Some("FT"));
        assert_eq!(records[0].strip.as_deref(), Some("3766 x 300"));
        assert_eq!(records[0].strip_unit.as_deref(), Some("M"));
    }

    struct Reversed;

    impl FragmentJoin for Reversed {
        fn pair(&self, records: &[RunwayPhysicalRecord], slopes: &[SlopeRow]) -> Result<Vec<Option<usize>>> {
            let n = slopes.len();
            Ok((0..records.len()).map(|k| (k < n).then(|| n - 1 - k)).collect())
        }
    }

    #[test]
    fn join_strategy_is_pluggable() {
        let (records, _) = from_lines(&lines(THREE_LINE), "", &Reversed);
        assert_eq!(records[0].stopway.as_deref(), Some("60 x 45"));
        assert_eq!(records[1].stopway, None);
    }

    #[test]
    fn serialized_field_order() {
        let (records, _) = from_lines(&lines(THREE_LINE), "", &PositionalJoin);
        let json = serde_json::to_string(&records[0]).unwrap();
        let keys: Vec<&str> = [
            "Designations RWY NR",
            "TRUE BRG",
            "Dimensions of RWY",
            "Dimensions of RWY_unit",
            "Strength (PCR or PCN) and surface of RWY and SWY",
            "THR coordinates THR geoid undulation",
            "THR elevation and highest elevation of TDZ of precision APP RWY",
            "Slope of RWY - SWY",
            "SWY dimensions",
            "CWY dimensions",
            "Strip dimensions",
            "Strip dimensions_unit",
            "RESA",
            "OFZ",
        ]
        .to_vec();
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(&format!("\"{}\"", k)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!json.contains("SWY dimensions_unit"));
    }
}

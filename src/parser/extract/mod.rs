pub mod admin;
pub mod distances;
pub mod identity;
pub mod obstacles;
pub mod runways;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use admin::FieldValue;
use distances::RunwayDistanceGroup;
use identity::IdentityRecord;
use obstacles::ObstacleMap;
use runways::RunwayPhysicalRecord;

use super::sections::SectionId;
use crate::element::Element;

/// Everything extracted from one document.
#[derive(Debug, Clone, Serialize)]
pub struct AerodromeReport {
    pub source: String,
    pub extracted_at: DateTime<Utc>,
    pub ad2_1: IdentityRecord,
    pub ad2_2: Vec<FieldValue>,
    pub ad2_10: ObstacleMap,
    pub ad2_12: Vec<RunwayPhysicalRecord>,
    pub ad2_13: Vec<RunwayDistanceGroup>,
    pub warnings: Vec<String>,
}

/// One section's payload.
#[derive(Debug, Clone)]
pub enum SectionPayload {
    Identity(IdentityRecord),
    Administrative(Vec<FieldValue>),
    Obstacles(ObstacleMap),
    RunwayCharacteristics(Vec<RunwayPhysicalRecord>),
    DeclaredDistances(Vec<RunwayDistanceGroup>),
}

/// Standalone section output: `{ section, source, <payload key>: ... }`.
#[derive(Debug, Clone)]
pub struct SectionOutput {
    pub section: &'static str,
    pub source: String,
    pub payload: SectionPayload,
    pub warnings: Vec<String>,
}

impl Serialize for SectionOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("section", self.section)?;
        map.serialize_entry("source", &self.source)?;
        match &self.payload {
            SectionPayload::Identity(record) => map.serialize_entry("identity", record)?,
            SectionPayload::Administrative(fields) => map.serialize_entry("fields", fields)?,
            SectionPayload::Obstacles(obstacles) => map.serialize_entry("obstacles", obstacles)?,
            SectionPayload::RunwayCharacteristics(runways) => map.serialize_entry("runways", runways)?,
            SectionPayload::DeclaredDistances(runways) => map.serialize_entry("runways", runways)?,
        }
        if !self.warnings.is_empty() {
            map.serialize_entry("warnings", &self.warnings)?;
        }
        map.end()
    }
}

pub fn extract_all(source: &str, elements: &[Element]) -> AerodromeReport {
    let mut warnings = Vec::new();
    let (ad2_12, failure) = runways::extract(elements);
    if let Some(e) = failure {
        warnings.push(e.to_string());
    }

    AerodromeReport {
        source: source.to_string(),
        extracted_at: Utc::now(),
        ad2_1: identity::extract(elements),
        ad2_2: admin::extract(elements),
        ad2_10: obstacles::extract(elements),
        ad2_12,
        ad2_13: distances::extract(elements),
        warnings,
    }
}

pub fn extract_section(source: &str, section: SectionId, elements: &[Element]) -> SectionOutput {
    let mut warnings = Vec::new();
    let payload = match section {
        SectionId::Identity => SectionPayload::Identity(identity::extract(elements)),
        SectionId::Administrative => SectionPayload::Administrative(admin::extract(elements)),
        SectionId::Obstacles => SectionPayload::Obstacles(obstacles::extract(elements)),
        SectionId::RunwayCharacteristics => {
            let (records, failure) = runways::extract(elements);
            warnings.extend(failure.map(|e| e.to_string()));
            SectionPayload::RunwayCharacteristics(records)
        }
        SectionId::DeclaredDistances => SectionPayload::DeclaredDistances(distances::extract(elements)),
    };
    SectionOutput {
        section: section.title(),
        source: source.to_string(),
        payload,
        warnings,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::parse_elements;

    fn fixture(name: &str) -> Vec<Element> {
        let json = std::fs::read_to_string(format!("tests/fixtures/{}.json", name)).unwrap();
        parse_elements(&json).unwrap()
    }

    #[test]
    fn oiii_identity() {
        let r = identity::extract(&fixture("oiii_elements"));
        assert_eq!(r.name.as_deref(), Some("OIII"));
        assert_eq!(r.country.as_deref(), Some("Tehran"));
        assert_eq!(r.aip.as_deref(), Some("Mehrabad International"));
    }

    #[test]
    fn oiii_administrative() {
        let fields = admin::extract(&fixture("oiii_elements"));
        let labels: Vec<&str> = fields.iter().map(|f| f.field.label()).collect();
        assert_eq!(
            labels,
            vec![
                "ARP coordinates and site at AD",
                "Direction and distance from (city)",
                "Elevation / Reference temperature",
                "MAG VAR / Annual change",
                "Types of traffic permitted (IFR/VFR)",
            ]
        );
        assert_eq!(fields[0].value, "354121N 0511850E Centre of RWY 11L/29R");
        assert_eq!(fields[4].value, "IFR/VFR");
    }

    #[test]
    fn oiii_obstacles() {
        let obstacles = obstacles::extract(&fixture("oiii_elements"));
        let keys: Vec<String> = obstacles.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["11R / APCH", "11L / APCH", "29L / TKOF", "29R / TKOF"]);
        let first = &obstacles[0];
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].coordinates.as_deref(), Some("354149.1N 0511701.6E"));
        assert_eq!(first[0].description.as_deref(), Some("DVOR/DME antenna 4010 FT AMSL LGTD"));
        // continued on the next page without a designator
        assert_eq!(first[1].description.as_deref(), Some("Tower 4020 FT AMSL LGTD"));
        assert_eq!(obstacles[2], obstacles[3]);
    }

    #[test]
    fn oiii_runways() {
        let (runways, failure) = runways::extract(&fixture("oiii_elements"));
        assert!(failure.is_none());
        let designators: Vec<&str> = runways.iter().map(|r| r.designation.as_str()).collect();
        assert_eq!(designators, vec!["11L", "29R"]);
        assert_eq!(runways[0].threshold_coordinates.as_deref(), Some("354144.03N 0511701.6E GUND -85FT"));
        assert_eq!(runways[0].strength.as_deref(), Some("720/R/A/W/T Concrete"));
        assert_eq!(runways[1].strip.as_deref(), Some("3766 x 300"));
        assert_eq!(runways[1].strip_unit.as_deref(), Some("M"));
    }

    #[test]
    fn oiii_declared_distances() {
        let groups = distances::extract(&fixture("oiii_elements"));
        let designators: Vec<&str> = groups.iter().map(|g| g.designator.as_str()).collect();
        assert_eq!(designators, vec!["11L", "29R"]);
        assert_eq!(groups[1].entries.len(), 2);
        assert_eq!(
            groups[1].entries[1].remarks.as_deref(),
            Some("Take-off from intersection with U")
        );
    }

    #[test]
    fn full_report_serializes() {
        let report = extract_all("oiii_elements.json", &fixture("oiii_elements"));
        assert!(report.warnings.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ad2_1"]["name"], "OIII");
        assert_eq!(json["ad2_10"]["29L / TKOF"][0]["Coordinates"], "354010N 0511500E");
        assert_eq!(json["ad2_13"][0]["RWY Designator"], "11L");
        assert!(json["extracted_at"].is_string());
    }

    #[test]
    fn empty_stream_gives_empty_report() {
        let report = extract_all("empty", &[]);
        assert_eq!(report.ad2_1, IdentityRecord::default());
        assert!(report.ad2_2.is_empty());
        assert!(report.ad2_10.is_empty());
        assert!(report.ad2_12.is_empty());
        assert!(report.ad2_13.is_empty());
    }

    #[test]
    fn single_section_envelope() {
        let out = extract_section("x.json", SectionId::Obstacles, &fixture("oiii_elements"));
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["section"], "AD 2.10 AERODROME OBSTACLES");
        assert_eq!(json["source"], "x.json");
        assert!(json["obstacles"]["11R / APCH"].is_array());
        assert!(json.get("warnings").is_none());
    }
}

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::element::Element;
use crate::parser::cells::{self, RunwayKey};
use crate::parser::classify::{self, RowClass, RowClassifier};
use crate::parser::rows::{self, Row};
use crate::parser::sections::{self, SectionId};

const COLUMNS: usize = 3;
const HEADER_CELLS: &[&str] = &["In approach / TKOF areas", "RWY/Area affected"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObstacleRecord {
    #[serde(rename = "Coordinates")]
    pub coordinates: Option<String>,
    #[serde(rename = "Obstacle description")]
    pub description: Option<String>,
}

/// Obstacles keyed by approach/take-off area, in first-appearance order.
pub type ObstacleMap = IndexMap<RunwayKey, Vec<ObstacleRecord>>;

fn is_header(cell: &str) -> bool {
    HEADER_CELLS.iter().any(|h| h.eq_ignore_ascii_case(cell)) || classify::is_column_stub(cell)
}

fn parse_keys(cell: &str) -> Option<BTreeSet<RunwayKey>> {
    let keys = cells::expand_designators(cell);
    (!keys.is_empty()).then_some(keys)
}

/// Walk obstacle rows. `classifier` carries the current key set across
/// calls so a table split over pages keeps its groups.
fn collect(rows: &[Row], classifier: &mut RowClassifier<BTreeSet<RunwayKey>>, out: &mut ObstacleMap) {
    for row in rows {
        let mut row = row.clone();
        row.pad_to(COLUMNS);

        let obstacle = row.cell(1).trim();
        let coordinates = row.cell(2).trim();
        let has_data = !obstacle.is_empty() || !coordinates.is_empty();

        let keys = match classifier.classify(row.cell(0), has_data, parse_keys) {
            RowClass::Skip => continue,
            RowClass::Primary(keys) => keys,
            RowClass::Continuation(keys) => {
                debug!(keys = keys.len(), "obstacle continuation row");
                keys
            }
        };

        let record = ObstacleRecord {
            coordinates: cells::parse_coordinates(coordinates),
            description: cells::parse_obstacle(obstacle).display(),
        };
        for key in keys {
            out.entry(key).or_default().push(record.clone());
        }
    }
}

pub fn from_rows(rows: &[Row]) -> ObstacleMap {
    let mut out = ObstacleMap::new();
    collect(rows, &mut RowClassifier::new(is_header), &mut out);
    out
}

pub fn extract(elements: &[Element]) -> ObstacleMap {
    let mut out = ObstacleMap::new();
    let mut classifier = RowClassifier::new(is_header);
    for element in sections::locate(elements, SectionId::Obstacles) {
        collect(&rows::element_rows(element), &mut classifier, &mut out);
    }
    info!(keys = out.len(), obstacles = out.values().map(Vec::len).sum::<usize>(), "AD 2.10 extracted");
    out
}

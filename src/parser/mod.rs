pub mod cells;
pub mod classify;
pub mod extract;
pub mod rows;
pub mod sanitize;
pub mod sections;

use crate::element::Element;
use extract::AerodromeReport;

/// Per section: locate elements → normalise rows → classify and decompose →
/// aggregate records. Pure; safe to run on many documents in parallel.
pub fn process_document(source: &str, elements: &[Element]) -> AerodromeReport {
    extract::extract_all(source, elements)
}

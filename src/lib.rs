//! Structured extraction of aerodrome data (AD 2.1, 2.2, 2.10, 2.12, 2.13)
//! from the element stream a layout-analysis step produces for an AIP
//! document.

pub mod config;
pub mod element;
pub mod error;
pub mod layout;
pub mod parser;

pub use element::{load_elements, parse_elements, Element};
pub use error::{Error, Result};
pub use parser::extract::{AerodromeReport, SectionOutput};
pub use parser::process_document;
pub use parser::sections::SectionId;

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use super::sanitize;
use crate::element::Element;

/// One table row: ordered cell strings. Out-of-range cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Row { cells }
    }

    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn pad_to(&mut self, width: usize) {
        if self.cells.len() < width {
            self.cells.resize(width, String::new());
        }
    }

    /// Every non-blank cell, whitespace-collapsed, joined by one space.
    pub fn joined(&self) -> String {
        self.cells
            .iter()
            .map(|c| sanitize::collapse(c))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The row as a text extractor would print it: line k joins the k-th
    /// line of every cell.
    pub fn visual_lines(&self) -> Vec<String> {
        let split: Vec<Vec<&str>> = self
            .cells
            .iter()
            .map(|c| c.lines().map(str::trim).filter(|l| !l.is_empty()).collect())
            .collect();
        let depth = split.iter().map(Vec::len).max().unwrap_or(0);
        (0..depth)
            .map(|k| {
                split
                    .iter()
                    .filter_map(|lines| lines.get(k).copied())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

impl From<Vec<&str>> for Row {
    fn from(cells: Vec<&str>) -> Self {
        Row::new(cells.into_iter().map(String::from).collect())
    }
}

/// Geometric rows: already cell-shaped, only sanitised.
pub fn from_geometric(rows: &[Vec<Option<String>>]) -> Vec<Row> {
    rows.iter()
        .map(|cells| {
            Row::new(
                cells
                    .iter()
                    .map(|c| c.as_deref().map(sanitize::strip_lines).unwrap_or_default())
                    .collect(),
            )
        })
        .collect()
}

/// Markup rows: walk `<tr>`/`<td>`/`<th>` boundaries, flushing a cell into
/// the current row on cell end and the row into the output on row end.
/// Malformed markup stops the walk; rows flushed so far are kept.
pub fn from_markup(html: &str) -> Vec<Row> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;
    reader.config_mut().trim_text(true);

    let mut rows = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref().to_ascii_lowercase().as_slice() {
                b"tr" => {
                    row = Some(Vec::new());
                    cell = None;
                }
                b"td" | b"th" => cell = Some(String::new()),
                b"br" => push_break(&mut cell),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref().to_ascii_lowercase().as_slice() {
                b"td" | b"th" => {
                    if let Some(r) = row.as_mut() {
                        r.push(String::new());
                    }
                }
                b"br" => push_break(&mut cell),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(c) = cell.as_mut() {
                    // HTML5 named references (`&nbsp;`) as well as the XML ones.
                    let text = match e.unescape_with(resolve_html5_entity) {
                        Ok(t) => t.into_owned(),
                        Err(err) => {
                            debug!(error = %err, "undecodable character reference kept raw");
                            String::from_utf8_lossy(&e).into_owned()
                        }
                    };
                    if !c.is_empty() && !c.ends_with('\n') {
                        c.push(' ');
                    }
                    c.push_str(text.trim());
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref().to_ascii_lowercase().as_slice() {
                b"td" | b"th" => {
                    if let (Some(r), Some(c)) = (row.as_mut(), cell.take()) {
                        r.push(sanitize::strip_lines(&c));
                    }
                }
                b"tr" => {
                    if let Some(r) = row.take() {
                        if !r.is_empty() {
                            rows.push(Row::new(r));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, rows = rows.len(), "markup table ended early");
                break;
            }
            _ => {}
        }
    }

    rows
}

fn push_break(cell: &mut Option<String>) {
    if let Some(c) = cell.as_mut() {
        c.push('\n');
    }
}

/// Normalise any element into rows. Tables use their geometric rendering
/// when present, then their markup; everything else yields one single-cell
/// row per non-blank text line.
pub fn element_rows(element: &Element) -> Vec<Row> {
    if element.is_table() {
        if let Some(rows) = &element.metadata.table_rows {
            return from_geometric(rows);
        }
        if let Some(html) = element.metadata.text_as_html.as_deref().filter(|h| !h.trim().is_empty()) {
            return from_markup(html);
        }
    }
    sanitize::strip_lines(&element.text)
        .lines()
        .map(|line| Row::new(vec![line.to_string()]))
        .collect()
}

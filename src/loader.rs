//! Tabular dataset loading: ordered strategies tried in sequence.
//!
//! The primary knowledge table and uploaded secondary tables arrive as
//! spreadsheet-like files. Rather than dispatching on file extension, each
//! strategy (XLSX first, then CSV) attempts a parse and returns a
//! success/failure result; the first success wins and all failures combine
//! into one error. The first row supplies column headers; blank cells
//! become [`FieldValue::Missing`] and numeric cells parse as
//! [`FieldValue::Number`].

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{FieldValue, RecordFields};

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Per-strategy parse failure.
#[derive(Debug)]
pub enum LoadError {
    Workbook(String),
    Csv(String),
    NoRows,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Workbook(e) => write!(f, "XLSX parse failed: {}", e),
            LoadError::Csv(e) => write!(f, "CSV parse failed: {}", e),
            LoadError::NoRows => write!(f, "table contains no data rows"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Load a table from disk, trying each strategy in order.
pub fn load_table(path: &Path) -> Result<Vec<RecordFields>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read table file: {}", path.display()))?;
    load_table_bytes(&bytes)
        .with_context(|| format!("No loader strategy accepted {}", path.display()))
}

/// Load a table from raw bytes, trying each strategy in order.
pub fn load_table_bytes(bytes: &[u8]) -> Result<Vec<RecordFields>> {
    let strategies: [(&str, fn(&[u8]) -> Result<Vec<RecordFields>, LoadError>); 2] =
        [("xlsx", load_xlsx), ("csv", load_csv)];

    let mut failures = Vec::new();
    for (name, strategy) in strategies {
        match strategy(bytes) {
            Ok(rows) => return Ok(rows),
            Err(e) => failures.push(format!("{}: {}", name, e)),
        }
    }
    anyhow::bail!("all loader strategies failed: {}", failures.join("; "))
}

// ============ XLSX strategy ============

fn load_xlsx(bytes: &[u8]) -> Result<Vec<RecordFields>, LoadError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| LoadError::Workbook(e.to_string()))?;

    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_name = first_worksheet_name(&mut archive)?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet_name)?;

    let grid = parse_sheet_rows(&sheet_xml, &shared_strings)?;
    rows_to_records(grid)
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, LoadError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| LoadError::Workbook(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| LoadError::Workbook(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(LoadError::Workbook(format!(
            "ZIP entry {} exceeds size limit",
            name
        )));
    }
    Ok(out)
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, LoadError> {
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml")?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = true;
                    current.clear();
                } else if in_si && e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        current.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(current.clone());
                    in_si = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(LoadError::Workbook(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn first_worksheet_name(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<String, LoadError> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::Workbook("no worksheet found".to_string()))
}

/// Parse one worksheet into a sparse grid of `(column, value)` rows.
fn parse_sheet_rows(
    xml: &[u8],
    shared_strings: &[String],
) -> Result<Vec<Vec<(usize, FieldValue)>>, LoadError> {
    let mut rows: Vec<Vec<(usize, FieldValue)>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut current_row: Vec<(usize, FieldValue)> = Vec::new();
    let mut in_row = false;
    let mut in_v = false;
    let mut cell_col: usize = 0;
    let mut cell_is_shared = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    current_row.clear();
                }
                b"c" if in_row => {
                    cell_is_shared = false;
                    cell_col = current_row.len();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                let r = String::from_utf8_lossy(&attr.value);
                                cell_col = column_index(&r);
                            }
                            b"t" => {
                                cell_is_shared = attr.value.as_ref() == b"s";
                            }
                            _ => {}
                        }
                    }
                }
                b"v" => in_v = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_v => {
                let raw = te.unescape().unwrap_or_default();
                let value = if cell_is_shared {
                    raw.trim()
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared_strings.get(i))
                        .map(|s| cell_value(s))
                        .unwrap_or(FieldValue::Missing)
                } else {
                    cell_value(raw.as_ref())
                };
                current_row.push((cell_col, value));
                in_v = false;
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"row" => {
                    rows.push(current_row.clone());
                    in_row = false;
                }
                b"v" => in_v = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(LoadError::Workbook(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

/// Column letters of a cell reference (`"B12"` → 1).
fn column_index(cell_ref: &str) -> usize {
    let mut index = 0usize;
    for c in cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()) {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    index.saturating_sub(1)
}

/// First grid row becomes the headers; remaining rows become records.
fn rows_to_records(grid: Vec<Vec<(usize, FieldValue)>>) -> Result<Vec<RecordFields>, LoadError> {
    let mut iter = grid.into_iter();
    let header_row = iter.next().ok_or(LoadError::NoRows)?;

    let width = header_row
        .iter()
        .map(|(col, _)| col + 1)
        .max()
        .unwrap_or(0);
    if width == 0 {
        return Err(LoadError::NoRows);
    }

    let mut headers: Vec<String> = (0..width).map(|i| format!("Column {}", i + 1)).collect();
    for (col, value) in &header_row {
        if let Some(text) = value.as_display() {
            if *col < width {
                headers[*col] = text;
            }
        }
    }

    let mut records = Vec::new();
    for row in iter {
        let mut fields: RecordFields = headers
            .iter()
            .map(|h| (h.clone(), FieldValue::Missing))
            .collect();
        for (col, value) in row {
            if col < width {
                fields[col].1 = value;
            }
        }
        records.push(fields);
    }

    if records.is_empty() {
        return Err(LoadError::NoRows);
    }
    Ok(records)
}

// ============ CSV strategy ============

/// Minimal RFC-4180-style parser: quoted fields, doubled-quote escapes,
/// CRLF or LF row endings. No pack repo carries a CSV crate; this mirrors
/// the hand-parsed formats elsewhere in the loader.
fn load_csv(bytes: &[u8]) -> Result<Vec<RecordFields>, LoadError> {
    let text =
        std::str::from_utf8(bytes).map_err(|_| LoadError::Csv("not valid UTF-8".to_string()))?;

    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => row.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    grid.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }
    if in_quotes {
        return Err(LoadError::Csv("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        grid.push(row);
    }

    let sparse: Vec<Vec<(usize, FieldValue)>> = grid
        .into_iter()
        .filter(|cells| !(cells.len() == 1 && cells[0].trim().is_empty()))
        .map(|cells| {
            cells
                .into_iter()
                .enumerate()
                .map(|(i, cell)| (i, cell_value(&cell)))
                .collect()
        })
        .collect();

    rows_to_records(sparse).map_err(|_| LoadError::NoRows)
}

/// Interpret one cell: blank → missing, numeric → number, else text.
fn cell_value(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValue::Missing;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return FieldValue::Number(n);
        }
    }
    FieldValue::Text(trimmed.to_string())
}

//! Finishing pass over a workbook before it is written.
//!
//! Numbers the rows, turns on borders and left alignment, sets column widths
//! and drops sheets that carry no data.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::{Cell, Sheet, SheetError, Workbook};

/// Largest column count an xlsx worksheet allows.
const MAX_COLUMNS: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub enabled: bool,
    /// Header of the 1-based row number column inserted on the left.
    pub index_header: String,
    /// Width for any column without an explicit entry in `widths`.
    pub default_width: f64,
    /// Sheet name -> header or column letter -> width in characters.
    /// Headers missing from a sheet are skipped.
    pub widths: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_header: "Index".to_string(),
            default_width: 23.0,
            widths: default_widths(),
        }
    }
}

fn default_widths() -> BTreeMap<String, BTreeMap<String, f64>> {
    // Keyed by header so both header locales get the same layout.
    let review: BTreeMap<String, f64> = [
        ("A", 5.0),
        ("review message", 55.0),
        ("检视信息", 55.0),
        ("reviewed file", 55.0),
        ("文件", 55.0),
        ("line number of reviewed file", 10.0),
        ("文件行数", 10.0),
        ("inline message severity level", 10.0),
        ("严重级别", 10.0),
        ("inline message problem type", 15.0),
        ("问题类型", 15.0),
        ("change status", 15.0),
        ("状态", 15.0),
        ("patch set uploader", 15.0),
        ("上传者", 15.0),
        ("reviewer", 15.0),
        ("检视人", 15.0),
    ]
    .into_iter()
    .map(|(col, width)| (col.to_string(), width))
    .collect();

    BTreeMap::from([("Review Info".to_string(), review)])
}

/// Zero-based index of a column letter: `A` -> 0, `Z` -> 25, `AA` -> 26.
pub fn column_index(letters: &str) -> Option<u16> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        if n > MAX_COLUMNS {
            return None;
        }
    }
    u16::try_from(n - 1).ok()
}

fn is_column_letter(key: &str) -> bool {
    (1..=3).contains(&key.len()) && key.bytes().all(|b| b.is_ascii_uppercase())
}

/// Column a width key refers to. A header name wins over a column letter.
fn resolve_column(sheet: &Sheet, key: &str) -> Result<Option<u16>, SheetError> {
    if let Some(pos) = sheet.headers.iter().position(|h| h == key) {
        return Ok(u16::try_from(pos).ok());
    }
    if !is_column_letter(key) {
        return Ok(None);
    }
    column_index(key).map(Some).ok_or_else(|| SheetError::InvalidColumn {
        sheet: sheet.name.clone(),
        column: key.to_string(),
    })
}

/// Remove a leading row number column left by an earlier run, so it is
/// renumbered instead of carried along as data.
pub fn strip_index(workbook: &mut Workbook, index_header: &str) {
    for sheet in workbook.sheets_mut() {
        if sheet.headers.first().map(String::as_str) != Some(index_header) {
            continue;
        }
        sheet.headers.remove(0);
        for row in &mut sheet.rows {
            if !row.is_empty() {
                row.remove(0);
            }
        }
        debug!(sheet = %sheet.name, "stripped index column");
    }
}

/// Apply the finishing pass in place.
pub fn apply(workbook: &mut Workbook, config: &LayoutConfig) -> Result<(), SheetError> {
    let sheets = workbook.sheets_mut();

    // A sheet with a single column (or none) holds no report data.
    sheets.retain(|sheet| {
        let keep = sheet.column_count() > 1;
        if !keep {
            debug!(sheet = %sheet.name, "dropping empty sheet");
        }
        keep
    });

    for sheet in sheets.iter_mut() {
        sheet.headers.insert(0, config.index_header.clone());
        for (i, row) in sheet.rows.iter_mut().enumerate() {
            row.insert(0, Cell::Int(i as i64 + 1));
        }

        sheet.style.bordered = true;
        sheet.style.widths.clear();
        for col in 0..sheet.column_count() {
            sheet.style.widths.insert(col as u16, config.default_width);
        }
        if let Some(overrides) = config.widths.get(&sheet.name) {
            for (key, &width) in overrides {
                match resolve_column(sheet, key)? {
                    Some(col) => {
                        sheet.style.widths.insert(col, width);
                    }
                    None => debug!(sheet = %sheet.name, column = %key, "no such column, width skipped"),
                }
            }
        }
    }
    Ok(())
}

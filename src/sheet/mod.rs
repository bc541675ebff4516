pub mod layout;
pub mod types;

pub use types::{Cell, Row, Sheet};

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Worksheet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Failed to read workbook {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("Failed to build workbook: {0}")]
    Build(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to write workbook {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid column letter {column:?} in widths for sheet {sheet:?}")]
    InvalidColumn { sheet: String, column: String },
}

/// Every sheet of an output workbook, held in memory until it is saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` if it exists, otherwise start empty.
    pub fn open_or_new(path: &Path) -> Result<Self, SheetError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "target workbook does not exist yet");
            Ok(Self::new())
        }
    }

    /// Read every sheet of an xlsx file. The first row of each sheet is its header row.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, SheetError> {
        let read_error = |source: calamine::XlsxError| SheetError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut book: Xlsx<_> = open_workbook(path).map_err(read_error)?;

        let mut sheets = Vec::new();
        for name in book.sheet_names() {
            let range = book.worksheet_range(&name).map_err(read_error)?;
            // Ranges start at the first used cell; pad back out to A1.
            let (top, lead) = range.start().map_or((0, 0), |(row, col)| (row as usize, col as usize));
            let width = lead + range.width();
            let blank_rows = std::iter::repeat_with(|| vec![Cell::Empty; width]).take(top);
            let mut rows = blank_rows.chain(range.rows().map(|cells| {
                let mut row = vec![Cell::Empty; lead];
                row.extend(cells.iter().map(cell_from_data));
                row
            }));

            let mut sheet = Sheet::new(&name);
            sheet.headers = rows
                .next()
                .map(|header| header.iter().map(Cell::to_string).collect())
                .unwrap_or_default();
            sheet.rows = rows.collect();
            debug!(sheet = %name, columns = sheet.headers.len(), rows = sheet.rows.len(), "loaded sheet");
            sheets.push(sheet);
        }
        Ok(Self { sheets })
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> &mut Vec<Sheet> {
        &mut self.sheets
    }

    #[cfg(test)]
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Append rows to the named sheet, creating it after the existing sheets if needed.
    /// Returns the sheet's row count afterwards.
    pub fn append(&mut self, name: &str, headers: &[&str], rows: Vec<Row>) -> usize {
        let index = match self.sheets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        let sheet = &mut self.sheets[index];
        sheet.append(headers, rows);
        sheet.rows.len()
    }

    /// Serialize to xlsx and replace `path` atomically.
    ///
    /// The bytes go to a temp file next to `path` which is then renamed over
    /// it, so a failure leaves whatever was at `path` untouched.
    #[instrument(skip(self, path), fields(path = %path.display(), sheets = self.sheets.len()))]
    pub fn save(&self, path: &Path) -> Result<(), SheetError> {
        let mut book = rust_xlsxwriter::Workbook::new();
        let plain = Format::new();
        let bordered = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Left);

        for sheet in &self.sheets {
            let worksheet = book.add_worksheet();
            worksheet.set_name(sheet.name.as_str())?;
            let format = if sheet.style.bordered { &bordered } else { &plain };

            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, header.as_str(), format)?;
            }
            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    write_cell(worksheet, r as u32 + 1, c as u16, cell, format)?;
                }
            }
            for (&col, &width) in &sheet.style.widths {
                worksheet.set_column_width(col, width)?;
            }
        }

        let bytes = book.save_to_buffer()?;
        atomic_write(path, &bytes).map_err(|source| SheetError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(bytes = bytes.len(), "saved workbook");
        Ok(())
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    match cell {
        Cell::Empty => worksheet.write_blank(row, col, format)?,
        Cell::Text(s) => worksheet.write_string_with_format(row, col, s.as_str(), format)?,
        Cell::Int(n) => worksheet.write_number_with_format(row, col, *n as f64, format)?,
        Cell::Float(x) => worksheet.write_number_with_format(row, col, *x, format)?,
    };
    Ok(())
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Int(n) => Cell::Int(*n),
        // xlsx stores every number as a double
        Data::Float(x) if x.fract() == 0.0 && x.abs() < 9.0e15 => Cell::Int(*x as i64),
        Data::Float(x) => Cell::Float(*x),
        other => Cell::from(other.to_string()),
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

use std::collections::BTreeMap;

/// A single worksheet cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
}

// Empty text is stored as an empty cell, the same way it reads back.
impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => Cell::Int(n),
            Err(_) => Cell::Text(value.to_string()),
        }
    }
}

impl From<Option<u64>> for Cell {
    fn from(value: Option<u64>) -> Self {
        value.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Float(x) => write!(f, "{}", x),
        }
    }
}

pub type Row = Vec<Cell>;

/// Presentation applied when the sheet is written out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetStyle {
    /// Thin border and left alignment on every written cell.
    pub bordered: bool,
    /// Column width in characters, by zero-based column index.
    pub widths: BTreeMap<u16, f64>,
}

/// One named tab: a header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub style: SheetStyle,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            headers: Vec::new(),
            rows: Vec::new(),
            style: SheetStyle::default(),
        }
    }

    /// Widest of the header row and any data row.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Append `rows` laid out under `headers` after the existing rows.
    ///
    /// Columns are matched by header name. Headers this sheet has not seen are
    /// added on the right and earlier rows get empty cells there. Nothing is
    /// deduplicated.
    pub fn append(&mut self, headers: &[&str], rows: Vec<Row>) {
        let positions: Vec<usize> = headers
            .iter()
            .map(|h| match self.headers.iter().position(|existing| existing == h) {
                Some(pos) => pos,
                None => {
                    self.headers.push(h.to_string());
                    self.headers.len() - 1
                }
            })
            .collect();

        let width = self.headers.len();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, Cell::Empty);
            }
        }

        for row in rows {
            let mut aligned = vec![Cell::Empty; width];
            for (cell, &pos) in row.into_iter().zip(positions.iter()) {
                aligned[pos] = cell;
            }
            self.rows.push(aligned);
        }
    }
}

//! Row and cell capabilities the mapper works against.
//!
//! The engine never touches a spreadsheet format directly. Anything that can
//! hand out cells by column index and create a cell at an index can be read
//! from and written to: [`SheetRow`] keeps typed [`CellValue`]s in memory,
//! and `Vec<String>` serves decoded CSV records.

use std::{borrow::Cow, fmt};

/// Content written into, or held by, a single cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Textual view used for header matching and default parsing.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::String(s) => Cow::Borrowed(s.as_str()),
            CellValue::Int(i) => Cow::Owned(i.to_string()),
            CellValue::Float(f) => Cow::Owned(f.to_string()),
            CellValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

pub trait Cell {
    fn text(&self) -> Cow<'_, str>;
    fn set_value(&mut self, value: CellValue);
}

/// An ordered, zero-indexed sequence of cells.
pub trait Row {
    type Cell: Cell;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `None` for out-of-range indexes instead of failing.
    fn cell(&self, index: usize) -> Option<&Self::Cell>;

    /// Returns the cell at `index`, growing the row with empty cells when needed.
    fn create_cell(&mut self, index: usize) -> &mut Self::Cell;

    /// Header texts in column order; `None` where the row has no cell.
    fn header_texts(&self) -> Vec<Option<String>> {
        (0..self.len())
            .map(|idx| self.cell(idx).map(|cell| cell.text().into_owned()))
            .collect()
    }
}

impl Cell for CellValue {
    fn text(&self) -> Cow<'_, str> {
        self.as_text()
    }

    fn set_value(&mut self, value: CellValue) {
        *self = value;
    }
}

impl Cell for String {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }

    fn set_value(&mut self, value: CellValue) {
        *self = value.as_text().into_owned();
    }
}

/// In-memory row of typed cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: Vec<CellValue>,
}

impl SheetRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        SheetRow { cells }
    }

    /// Builds a row of string cells, mostly useful for header rows.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SheetRow {
            cells: texts
                .into_iter()
                .map(|text| CellValue::String(text.into()))
                .collect(),
        }
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|cell| cell.as_text().into_owned())
            .collect()
    }
}

impl Row for SheetRow {
    type Cell = CellValue;

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    fn create_cell(&mut self, index: usize) -> &mut CellValue {
        if index >= self.cells.len() {
            self.cells.resize(index + 1, CellValue::Empty);
        }
        &mut self.cells[index]
    }

    fn header_texts(&self) -> Vec<Option<String>> {
        self.cells
            .iter()
            .map(|cell| match cell {
                CellValue::Empty => None,
                other => Some(other.as_text().into_owned()),
            })
            .collect()
    }
}

impl Row for Vec<String> {
    type Cell = String;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn cell(&self, index: usize) -> Option<&String> {
        self.get(index)
    }

    fn create_cell(&mut self, index: usize) -> &mut String {
        if index >= Vec::len(self) {
            self.resize(index + 1, String::new());
        }
        &mut self[index]
    }
}

use crate::cell::Cell;

/// One row of cells. Rows within a sheet may differ in length.
pub type Row = Vec<Cell>;

/// One logical table within a parsed document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: Option<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn unnamed(rows: Vec<Row>) -> Self {
        Self { name: None, rows }
    }

    pub fn named(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self { name: Some(name.into()), rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length (rows may be ragged)
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn from_strings<S: AsRef<str>>(name: Option<String>, data: Vec<Vec<S>>) -> Self {
        let rows = data
            .into_iter()
            .map(|row| row.into_iter().map(|s| Cell::from(s.as_ref())).collect())
            .collect();
        Self { name, rows }
    }
}

/// Everything parsed out of one input file. Always holds at least one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    sheets: Vec<Sheet>,
}

impl ParsedDocument {
    /// An empty sheet list becomes a single unnamed empty sheet.
    pub fn new(sheets: Vec<Sheet>) -> Self {
        if sheets.is_empty() {
            return Self { sheets: vec![Sheet::default()] };
        }
        Self { sheets }
    }

    pub fn single(sheet: Sheet) -> Self {
        Self { sheets: vec![sheet] }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_multi_sheet(&self) -> bool {
        self.sheets.len() > 1
    }

    /// Total rows and widest row across every sheet
    pub fn dimensions(&self) -> (usize, usize) {
        let rows = self.sheets.iter().map(Sheet::row_count).sum();
        let cols = self.sheets.iter().map(Sheet::col_count).max().unwrap_or(0);
        (rows, cols)
    }
}

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;
use tracing::{debug, info};

use crate::cell::Cell;
use crate::table::{ParsedDocument, Row, Sheet};
use crate::util::{delimiter_name, WidthMode};

/// Candidate delimiters tried by auto-detection, in preference order
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Lines sampled when guessing the delimiter
const DETECT_SAMPLE_LINES: usize = 10;

/// Which external parser handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// `.csv`
    Delimited,
    /// `.xlsx` / `.xls`
    Spreadsheet,
}

impl ParserKind {
    /// Detect the parser from a file extension (case-insensitive)
    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(ParserKind::Delimited),
            "xlsx" | "xls" => Some(ParserKind::Spreadsheet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unsupported file type. Please upload a CSV or Excel file.")]
    UnsupportedType,
    #[error("Error parsing CSV: {0}")]
    Csv(String),
    #[error("Error parsing Excel: {0}")]
    Excel(String),
    #[error("Error reading file: {0}")]
    Io(String),
    #[error("File too large: {rows} rows x {cols} columns (limit {max_rows} x {max_cols})")]
    TooLarge {
        rows: usize,
        cols: usize,
        max_rows: usize,
        max_cols: usize,
    },
}

/// Pick the parser for a file name. Nothing is read or parsed here.
pub fn route(file_name: &str) -> Result<ParserKind, ParseError> {
    ParserKind::from_extension(Path::new(file_name)).ok_or(ParseError::UnsupportedType)
}

/// Knobs for loading, filled from config and the command line
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Explicit delimiter; `None` means auto-detect
    pub delimiter: Option<u8>,
    pub trim: bool,
    pub max_rows: usize,
    pub max_cols: usize,
    /// How the loaded document is measured when aligned
    pub width_mode: WidthMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            trim: false,
            max_rows: 10_000_000,
            max_cols: 10_000_000,
            width_mode: WidthMode::Chars,
        }
    }
}

/// Result of loading a file, plus notes worth showing the user
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub document: ParsedDocument,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FileIO {
    options: LoadOptions,
}

impl FileIO {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn width_mode(&self) -> WidthMode {
        self.options.width_mode
    }

    /// Parse already-read content with the given parser
    pub fn load_bytes(&self, kind: ParserKind, bytes: &[u8]) -> Result<LoadResult, ParseError> {
        let result = match kind {
            ParserKind::Delimited => self.read_csv(bytes)?,
            ParserKind::Spreadsheet => LoadResult {
                document: ParsedDocument::new(read_spreadsheet(bytes)?),
                notes: Vec::new(),
            },
        };

        self.check_size(&result.document)?;
        debug!(sheets = result.document.sheet_count(), "document loaded");
        Ok(result)
    }

    fn check_size(&self, document: &ParsedDocument) -> Result<(), ParseError> {
        let (rows, cols) = document.dimensions();
        if rows > self.options.max_rows || cols > self.options.max_cols {
            return Err(ParseError::TooLarge {
                rows,
                cols,
                max_rows: self.options.max_rows,
                max_cols: self.options.max_cols,
            });
        }
        Ok(())
    }

    // === CSV ===

    fn read_csv(&self, bytes: &[u8]) -> Result<LoadResult, ParseError> {
        let mut notes = Vec::new();
        let delim = match self.options.delimiter {
            Some(d) => d,
            None => {
                let d = detect_delimiter(bytes);
                notes.push(format!("Delimiter: {}", delimiter_name(d)));
                d
            }
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .trim(if self.options.trim { csv::Trim::Fields } else { csv::Trim::None })
            .from_reader(bytes);

        let mut rows: Vec<Row> = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|e| ParseError::Csv(e.to_string()))?;
            if rows.len() >= self.options.max_rows || record.len() > self.options.max_cols {
                return Err(ParseError::TooLarge {
                    rows: rows.len() + 1,
                    cols: record.len(),
                    max_rows: self.options.max_rows,
                    max_cols: self.options.max_cols,
                });
            }
            rows.push(record.iter().map(Cell::from).collect());
        }

        debug!(rows = rows.len(), delimiter = %delimiter_name(delim), "parsed csv");
        Ok(LoadResult {
            document: ParsedDocument::single(Sheet::unnamed(rows)),
            notes,
        })
    }
}

/// Read a whole file into memory
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ParseError> {
    let bytes = fs::read(path).map_err(|e| ParseError::Io(e.to_string()))?;
    info!(path = %path.display(), bytes = bytes.len(), "read file");
    Ok(bytes)
}

/// Guess the field delimiter from the first few lines.
///
/// A candidate must average at least two fields per sampled line; among those,
/// the one whose field count varies least between lines wins, then the one with
/// more fields. Falls back to comma.
pub fn detect_delimiter(bytes: &[u8]) -> u8 {
    let sample = String::from_utf8_lossy(&bytes[..bytes.len().min(64 * 1024)]);
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DETECT_SAMPLE_LINES)
        .collect();

    if lines.is_empty() {
        return b',';
    }

    let mut best: Option<(u8, usize, f64)> = None;
    for &delim in DELIMITER_CANDIDATES.iter() {
        let counts: Vec<usize> = lines.iter().map(|l| count_fields(l, delim)).collect();
        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        // A stray occurrence on one line does not make a delimiter
        if avg < 2.0 {
            continue;
        }
        let delta: usize = counts.windows(2).map(|w| w[0].abs_diff(w[1])).sum();

        let better = match best {
            None => true,
            Some((_, best_delta, best_avg)) => {
                delta < best_delta || (delta == best_delta && avg > best_avg)
            }
        };
        if better {
            best = Some((delim, delta, avg));
        }
    }

    best.map(|(d, _, _)| d).unwrap_or(b',')
}

/// Fields on one line, ignoring delimiters inside double quotes
fn count_fields(line: &str, delim: u8) -> usize {
    let mut in_quotes = false;
    let mut fields = 1;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delim && !in_quotes {
            fields += 1;
        }
    }
    fields
}

// === Spreadsheets ===

/// Every sheet of a workbook in workbook order. The first row is ordinary data.
fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<Sheet>, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ParseError::Excel(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ParseError::Excel(format!("sheet `{}`: {}", sheet_name, e)))?;

        let rows: Vec<Row> = range.rows().map(convert_row).collect();
        debug!(sheet = %sheet_name, rows = rows.len(), "parsed sheet");
        sheets.push(Sheet::named(sheet_name, rows));
    }

    Ok(sheets)
}

/// Trailing empty cells are dropped so a row is only as wide as its data
fn convert_row(row: &[Data]) -> Row {
    let used = row
        .iter()
        .rposition(|v| !matches!(v, Data::Empty))
        .map(|i| i + 1)
        .unwrap_or(0);
    row[..used].iter().map(convert_value).collect()
}

fn convert_value(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(f) => Cell::from(*f),
        Data::Int(i) => Cell::from(*i),
        Data::Bool(b) => Cell::from(*b),
        // Raw serial value, the way spreadsheet cells read without date formatting
        Data::DateTime(dt) => Cell::from(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from(s.as_str()),
        Data::Error(e) => Cell::from(e.to_string()),
    }
}

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// How cell widths are measured when aligning columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthMode {
    /// One column per `char`, so separators sit at the same character offset
    #[default]
    Chars,
    /// Terminal display columns: wide glyphs count two, combining marks zero
    Display,
}

impl WidthMode {
    #[inline]
    pub fn measure(self, s: &str) -> usize {
        match self {
            WidthMode::Chars => s.chars().count(),
            WidthMode::Display => UnicodeWidthStr::width(s),
        }
    }
}

/// Right-pad `s` with spaces until it measures `width`.
/// Strings already at least `width` wide are returned unchanged.
pub fn pad_to_width(s: &str, width: usize, mode: WidthMode) -> String {
    let current = mode.measure(s);
    let mut out = String::with_capacity(s.len() + width.saturating_sub(current));
    out.push_str(s);
    for _ in current..width {
        out.push(' ');
    }
    out
}

/// Human name for a field delimiter byte
pub fn delimiter_name(delim: u8) -> String {
    match delim {
        b',' => "comma".to_string(),
        b'\t' => "tab".to_string(),
        b';' => "semicolon".to_string(),
        b'|' => "pipe".to_string(),
        other => format!("'{}'", other as char),
    }
}

/// Parse a delimiter given on the command line or in the config file
pub fn parse_delimiter(s: &str) -> Option<u8> {
    match s.to_lowercase().as_str() {
        "comma" | "," => Some(b','),
        "tab" | "\\t" | "\t" => Some(b'\t'),
        "semicolon" | ";" => Some(b';'),
        "pipe" | "|" => Some(b'|'),
        _ if s.len() == 1 => Some(s.as_bytes()[0]),
        _ => None,
    }
}

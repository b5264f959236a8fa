//! Delimited-text parser with encoding and delimiter auto-detection.
//!
//! Produces `(rows, headers)`:
//! - leading fully-blank lines are skipped and the first non-blank line is
//!   the header row;
//! - headers are de-duplicated in order of appearance (`qty`, `qty_1`,
//!   `qty_2`, ...) and blank header cells are named `column_<n>`;
//! - every row carries every header, with `""` for missing cells;
//! - fully-blank data lines are skipped.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::Row;

/// Delimiters tried by [`detect_delimiter`], in tie-break order.
pub const CANDIDATE_DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows keyed by header
    pub rows: Vec<Row>,
    /// Ordered, de-duplicated column headers
    pub headers: Vec<String>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            // Fallback: UTF-8 with lossy conversion
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line with content
///
/// Lines made only of whitespace and candidate delimiters (`;;;` spacer rows)
/// are skipped, as the parser skips them.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|line| !is_spacer(line))
        .unwrap_or("");

    let mut best_sep = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0;

    for &sep in &CANDIDATE_DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Text made only of whitespace and candidate delimiters.
fn is_spacer(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || CANDIDATE_DELIMITERS.contains(&c))
}

/// Make header names unique and non-empty, keeping their order.
///
/// # Example
/// ```
/// use tableshape::parser::dedupe_headers;
///
/// let raw = vec!["qty".to_string(), "".to_string(), "qty".to_string()];
/// assert_eq!(dedupe_headers(&raw), vec!["qty", "column_2", "qty_1"]);
/// ```
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (i, name) in raw.iter().enumerate() {
        let base = match name.trim() {
            "" => format!("column_{}", i + 1),
            trimmed => trimmed.to_string(),
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while used.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        used.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

/// Parse CSV text into `(rows, headers)` with an explicit delimiter.
///
/// # Example
/// ```
/// use tableshape::parser::parse_csv;
///
/// let (rows, headers) = parse_csv("name;age\nAlice;30\nBob;25", ';').unwrap();
///
/// assert_eq!(headers, vec!["name", "age"]);
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0]["name"], "Alice");
/// assert_eq!(rows[0]["age"], "30");
/// ```
pub fn parse_csv(content: &str, delimiter: char) -> CsvResult<(Vec<Row>, Vec<String>)> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    if !delimiter.is_ascii() {
        return Err(CsvError::ParseError {
            line: 0,
            message: format!("delimiter '{}' is not ASCII", delimiter),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let cells: Vec<&str> = record.iter().map(str::trim).collect();

        // Blank and spacer rows (`;;;` read with another delimiter)
        if cells.iter().all(|c| is_spacer(c)) {
            continue;
        }

        match &headers {
            None => {
                let raw: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
                headers = Some(dedupe_headers(&raw));
            }
            Some(names) => {
                let mut row = Map::new();
                for (i, header) in names.iter().enumerate() {
                    let value = cells.get(i).copied().unwrap_or("");
                    row.insert(header.clone(), Value::String(value.to_string()));
                }
                rows.push(row);
            }
        }
    }

    let headers = headers.ok_or(CsvError::NoHeaders)?;
    Ok((rows, headers))
}

/// Parse CSV string with explicit delimiter and return metadata.
pub fn parse_string_with_metadata(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    let (rows, headers) = parse_csv(content, delimiter)?;
    Ok(ParseResult {
        rows,
        headers,
        encoding,
        delimiter,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_file_auto("/path/to/file.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Rows: {}", result.rows.len());
/// ```
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse a CSV file with an explicit delimiter (encoding still detected).
pub fn parse_file_with_delimiter<P: AsRef<Path>>(path: P, delimiter: char) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding)?;
    parse_string_with_metadata(&content, delimiter, encoding)
}

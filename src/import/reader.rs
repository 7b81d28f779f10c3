//! CSV upload parsing
//!
//! First record is the header. Quoted fields may contain commas, newlines
//! and doubled quotes. A leading UTF-8 BOM is ignored.

use std::collections::BTreeMap;

use crate::error::AppError;

/// One data row, keyed by trimmed header name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: BTreeMap<String, String>,
}

impl Row {
    /// Value of `column`, empty when the column is absent
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Value of `column` if present and non-empty
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        Some(self.get(column)).filter(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parse CSV text into rows
///
/// Values are trimmed, short rows are padded with empty values, and rows
/// whose every value is blank are skipped.
///
/// # Errors
/// Returns `AppError::Validation` on malformed CSV (e.g. invalid UTF-8)
pub fn parse_csv(text: &str) -> Result<Vec<Row>, AppError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(invalid_csv)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(invalid_csv)?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }

        let row = headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let value = record.get(index).unwrap_or("").trim();
                (header.clone(), value.to_string())
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn invalid_csv(error: csv::Error) -> AppError {
    AppError::Validation(format!("Could not read CSV: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let rows = parse_csv("title,icon\nWeb Design,brush\nSEO,search\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("title"), "Web Design");
        assert_eq!(rows[1].get("icon"), "search");
        assert_eq!(rows[1].get("missing"), "");
    }

    #[test]
    fn handles_quotes_commas_and_newlines() {
        let text = "title,content\r\n\"Hello, world\",\"Line one\nLine \"\"two\"\"\"\r\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), "Hello, world");
        assert_eq!(rows[0].get("content"), "Line one\nLine \"two\"");
    }

    #[test]
    fn strips_bom_and_trims_headers() {
        let rows = parse_csv("\u{feff} title , name\nA,B\n").unwrap();
        assert_eq!(rows[0].get("title"), "A");
        assert_eq!(rows[0].get("name"), "B");
    }

    #[test]
    fn skips_blank_rows_and_pads_short_ones() {
        let rows = parse_csv("title,icon,extra\nA\n\n , ,\nB,b\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("title"), "A");
        assert_eq!(rows[0].non_empty("icon"), None);
        assert_eq!(rows[1].get("icon"), "b");
    }

    #[test]
    fn header_only_yields_no_rows() {
        assert!(parse_csv("title,icon\n").unwrap().is_empty());
        assert!(parse_csv("").unwrap().is_empty());
    }
}

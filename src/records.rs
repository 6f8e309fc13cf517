// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input records and the records-file loader.
//!
//! A records file is CSV with a header row (picked by the `.csv` extension),
//! a JSON array of objects, or JSON Lines. Field names follow the scraper's
//! column headers (`Title`, `Text`, `Link`); lowercase names are accepted as
//! well and extra columns such as a leading `index` are ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One (title, text, link) row to be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Title", alias = "title")]
    pub title: String,
    #[serde(rename = "Text", alias = "text")]
    pub text: String,
    #[serde(rename = "Link", alias = "link")]
    pub link: String,
}

impl RawRecord {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            link: link.into(),
        }
    }
}

/// Reads records from a CSV, JSON or JSON Lines file, preserving file order.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let records = if is_csv {
        parse_csv_records(&content)
    } else {
        parse_records(&content)
    };
    records.with_context(|| format!("Invalid records file: {}", path.display()))
}

/// Parses records from CSV with a header row.
pub fn parse_csv_records(content: &str) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<RawRecord>().enumerate() {
        let record = row.with_context(|| format!("Failed to parse CSV row {}", idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Parses records from a JSON array or JSON Lines string.
pub fn parse_records(content: &str) -> Result<Vec<RawRecord>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse JSON array of records");
    }

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse record on line {}", idx + 1))?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_json_array_with_header_names() {
        let records = parse_records(
            r#"[{"Title": "TextMatcher", "Text": "match phrases", "Link": "https://x/#tm"}]"#,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![RawRecord::new("TextMatcher", "match phrases", "https://x/#tm")]
        );
    }

    #[test]
    fn parses_json_lines_in_order() {
        let content = concat!(
            "{\"title\": \"a\", \"text\": \"one\", \"link\": \"l1\"}\n",
            "\n",
            "{\"Title\": \"b\", \"Text\": \"two\", \"Link\": \"l2\"}\n",
        );
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "a");
        assert_eq!(records[1].text, "two");
    }

    #[test]
    fn reports_line_of_bad_record() {
        let content = "{\"title\": \"a\", \"text\": \"one\", \"link\": \"l1\"}\n{\"title\": 3}\n";
        let err = parse_records(content).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn parses_scraper_csv_with_index_column() {
        let content = concat!(
            "index,Title,Text,Link\n",
            "0,Chunk2Doc,\"Converts chunks, then documents\",https://x/#chunk2doc\n",
            "1,TextMatcher,\"Matches phrases\nacross lines\",https://x/#textmatcher\n",
            "2,Empty,,https://x/#empty\n",
        );
        let records = parse_csv_records(content).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            RawRecord::new("Chunk2Doc", "Converts chunks, then documents", "https://x/#chunk2doc")
        );
        assert_eq!(records[1].text, "Matches phrases\nacross lines");
        assert_eq!(records[2].text, "");
    }

    #[test]
    fn csv_missing_column_is_an_error() {
        let err = parse_csv_records("Title,Link\na,b\n").unwrap_err();
        assert!(format!("{:#}", err).contains("row 1"));
    }

    #[test]
    fn load_records_picks_csv_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotators.CSV");
        std::fs::write(&path, "index,Title,Text,Link\n0,a,one,l1\n").unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records, vec![RawRecord::new("a", "one", "l1")]);
    }

    #[test]
    fn load_records_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");
        std::fs::write(&path, "{\"title\": \"a\", \"text\": \"one\", \"link\": \"l1\"}\n").unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert!(load_records(&dir.path().join("missing.jsonl")).is_err());
    }
}

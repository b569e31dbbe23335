//! Turning uploaded files into plain text.
//!
//! Malformed JSON or CSV never fails ingestion: the parse error is rendered
//! into the returned text instead.

use serde_json::Value;
use std::path::Path;
use tracing::warn;

/// How a stored file is interpreted, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Json,
    Csv,
    Text,
}

impl FileKind {
    pub fn from_path(path: &str) -> Self {
        match Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Text,
        }
    }
}

/// Render file bytes as text according to the file's extension.
pub fn resolve_file_content(path: &str, bytes: &[u8]) -> String {
    match FileKind::from_path(path) {
        FileKind::Json => render_json(bytes),
        FileKind::Csv => render_csv(bytes),
        FileKind::Text => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Prefix the content with the description and a blank line, if there is one.
pub fn prepend_description(description: Option<&str>, content: String) -> String {
    match description {
        Some(description) if !description.is_empty() => {
            format!("{}\n\n{}", description, content)
        }
        _ => content,
    }
}

/// Arrays become one compact JSON line per element separated by blank
/// lines; any other value is pretty-printed.
fn render_json(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n\n"),
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
        Err(e) => {
            warn!(error = %e, "Uploaded JSON is malformed, ingesting as text");
            format!("JSON parse error: {}\n{}", e, raw)
        }
    }
}

/// Each row becomes `column: value, column: value`; rows are separated by
/// blank lines.
///
/// Ragged rows are kept: missing cells render empty and cells past the last
/// header go under `extra`.
fn render_csv(bytes: &[u8]) -> String {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return csv_error(e),
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => return csv_error(e),
        };
        let mut cells: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{}: {}", column, record.get(i).unwrap_or_default()))
            .collect();
        if record.len() > headers.len() {
            let extra: Vec<&str> = record.iter().skip(headers.len()).collect();
            cells.push(format!("{}: {}", EXTRA_CSV_COLUMN, extra.join(" | ")));
        }
        rows.push(cells.join(", "));
    }
    rows.join("\n\n")
}

/// Label for cells beyond the header row.
const EXTRA_CSV_COLUMN: &str = "extra";

fn csv_error(e: csv::Error) -> String {
    warn!(error = %e, "Uploaded CSV is malformed, ingesting as text");
    format!("CSV parse error: {}", e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(FileKind::from_path("abc.json"), FileKind::Json);
        assert_eq!(FileKind::from_path("abc.CSV"), FileKind::Csv);
        assert_eq!(FileKind::from_path("abc.txt"), FileKind::Text);
        assert_eq!(FileKind::from_path("abc"), FileKind::Text);
    }

    #[test]
    fn test_json_array_one_line_per_item() {
        let bytes = br#"[{"text": "slow search"}, {"text": "love it"}, 3]"#;
        let content = resolve_file_content("f.json", bytes);
        assert_eq!(
            content,
            "{\"text\":\"slow search\"}\n\n{\"text\":\"love it\"}\n\n3"
        );
    }

    #[test]
    fn test_json_object_pretty_printed() {
        let content = resolve_file_content("f.json", br#"{"nps": 31}"#);
        assert_eq!(content, "{\n  \"nps\": 31\n}");
    }

    #[test]
    fn test_malformed_json_degrades_to_text() {
        let content = resolve_file_content("f.json", b"{not json");
        assert!(content.starts_with("JSON parse error: "));
        assert!(content.ends_with("\n{not json"));
    }

    #[test]
    fn test_csv_rows_keyed_by_header() {
        let bytes = b"user,comment\nana,search is slow\nbo,\"exports fail, often\"\n";
        let content = resolve_file_content("survey.csv", bytes);
        assert_eq!(
            content,
            "user: ana, comment: search is slow\n\nuser: bo, comment: exports fail, often"
        );
    }

    #[test]
    fn test_short_csv_row_keeps_other_rows() {
        let content = resolve_file_content("s.csv", b"user,comment\nana,search is slow\nbo\n");
        assert_eq!(
            content,
            "user: ana, comment: search is slow\n\nuser: bo, comment: "
        );
    }

    #[test]
    fn test_long_csv_row_keeps_extra_cells() {
        let content = resolve_file_content("s.csv", b"a,b\n1,2,3,4\n5,6\n");
        assert_eq!(content, "a: 1, b: 2, extra: 3 | 4\n\na: 5, b: 6");
    }

    #[test]
    fn test_invalid_utf8_csv_degrades_to_text() {
        let content = resolve_file_content("s.csv", b"a,b\n\xff\xfe,2\n");
        assert!(content.starts_with("CSV parse error: "), "{}", content);
    }

    #[test]
    fn test_plain_text_lossy() {
        let content = resolve_file_content("notes.md", b"caf\xc3\xa9 \xff");
        assert!(content.starts_with("café"));
    }

    #[test]
    fn test_prepend_description() {
        assert_eq!(
            prepend_description(Some("Q3 survey"), "slow".into()),
            "Q3 survey\n\nslow"
        );
        assert_eq!(prepend_description(Some(""), "slow".into()), "slow");
        assert_eq!(prepend_description(None, "slow".into()), "slow");
    }
}

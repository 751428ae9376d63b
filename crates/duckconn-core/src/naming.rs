//! SQL identifier helpers

use url::Url;

/// Fallback when nothing usable is left of the source file name
pub const FALLBACK_TABLE_NAME: &str = "auto_table";

/// Known data-file and compression suffixes stripped from a source name
const STRIPPED_SUFFIXES: &[&str] = &[
    "gz", "gzip", "bz2", "xz", "zst", "zstd", "csv", "tsv", "txt", "parquet", "json", "jsonl",
    "ndjson",
];

/// Derive a table name from the last path segment of a source URL.
///
/// `https://host/data/services-2024.csv.gz` becomes `services_2024`.
pub fn default_table_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .unwrap_or_default();

    let mut stem = segment;
    while let Some((head, ext)) = stem.rsplit_once('.') {
        if head.is_empty() || !STRIPPED_SUFFIXES.contains(&ext.to_ascii_lowercase().as_str()) {
            break;
        }
        stem = head;
    }

    sanitize_identifier(stem)
}

/// Replace everything outside `[A-Za-z0-9_]` and keep the result a valid identifier.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.trim_matches('_').is_empty() {
        return FALLBACK_TABLE_NAME.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Plain SQL identifier: letter or underscore, then letters, digits, underscores
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Double-quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal for interpolation into SQL
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_strips_data_and_compression_suffixes() {
        assert_eq!(
            default_table_name(&url("https://h/data/services-2024.csv.gz")),
            "services_2024"
        );
        assert_eq!(default_table_name(&url("https://h/events.parquet")), "events");
    }

    #[test]
    fn test_keeps_unknown_suffix_as_part_of_name() {
        assert_eq!(default_table_name(&url("https://h/v1.2")), "v1_2");
    }

    #[test]
    fn test_leading_digit_is_prefixed() {
        assert_eq!(default_table_name(&url("https://h/2024.csv")), "_2024");
    }

    #[test]
    fn test_empty_path_falls_back() {
        assert_eq!(default_table_name(&url("https://h/")), FALLBACK_TABLE_NAME);
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("services"));
        assert!(is_identifier("_t1"));
        assert!(!is_identifier("1t"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_quoting_escapes() {
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}

//! Content format detection and display helpers.

use serde::{Deserialize, Serialize};

/// Display mode for an editor buffer.
///
/// Detection is a best-effort default; callers may override it freely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Json,
    Yaml,
    #[default]
    Text,
}

impl ContentFormat {
    /// Guess the format of `content`.
    ///
    /// Valid JSON wins; otherwise text containing `:` plus a newline or a
    /// `- ` list marker is taken as YAML; anything else is plain text.
    pub fn detect(content: &str) -> Self {
        if content.trim().is_empty() {
            return ContentFormat::Text;
        }
        if serde_json::from_str::<serde_json::Value>(content).is_ok() {
            return ContentFormat::Json;
        }
        if content.contains(':') && (content.contains('\n') || content.contains("- ")) {
            return ContentFormat::Yaml;
        }
        ContentFormat::Text
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContentFormat::Json => "JSON",
            ContentFormat::Yaml => "YAML",
            ContentFormat::Text => "Text",
        }
    }

    pub fn all_variants() -> &'static [ContentFormat] {
        &[ContentFormat::Json, ContentFormat::Yaml, ContentFormat::Text]
    }

    /// Parse `content` as this format and describe the first problem found.
    ///
    /// Purely informational: a diagnostic never blocks a save.
    pub fn check(&self, content: &str) -> Option<String> {
        match self {
            ContentFormat::Json => serde_json::from_str::<serde_json::Value>(content)
                .err()
                .map(|e| format!("invalid JSON: {}", e)),
            ContentFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
                .err()
                .map(|e| format!("invalid YAML: {}", e)),
            ContentFormat::Text => None,
        }
    }
}

impl std::str::FromStr for ContentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ContentFormat::Json),
            "yaml" | "yml" => Ok(ContentFormat::Yaml),
            "text" | "txt" | "plaintext" => Ok(ContentFormat::Text),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

/// Human-readable TTL: `No TTL`, `45s`, `5m`, `2h`, `3d`.
pub fn format_ttl(ttl: i64) -> String {
    match ttl {
        t if t <= 0 => "No TTL".to_string(),
        t if t < 60 => format!("{}s", t),
        t if t < 3600 => format!("{}m", t / 60),
        t if t < 86400 => format!("{}h", t / 3600),
        t => format!("{}d", t / 86400),
    }
}

/// Maximum characters shown for an inline value preview.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Shorten a value for list previews, appending `...` when cut.
pub fn truncate_preview(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let cut: String = value.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_json() {
        assert_eq!(ContentFormat::detect(r#"{"a": 1}"#), ContentFormat::Json);
        assert_eq!(ContentFormat::detect("[1, 2]"), ContentFormat::Json);
        assert_eq!(ContentFormat::detect("42"), ContentFormat::Json);
    }

    #[test]
    fn detect_yaml_heuristic() {
        assert_eq!(ContentFormat::detect("a: 1\nb: 2"), ContentFormat::Yaml);
        assert_eq!(ContentFormat::detect("items: - one"), ContentFormat::Yaml);
    }

    #[test]
    fn detect_text_fallbacks() {
        assert_eq!(ContentFormat::detect(""), ContentFormat::Text);
        assert_eq!(ContentFormat::detect("   "), ContentFormat::Text);
        assert_eq!(ContentFormat::detect("hello world"), ContentFormat::Text);
        // a colon alone is not enough
        assert_eq!(ContentFormat::detect("host:port"), ContentFormat::Text);
    }

    #[test]
    fn check_reports_parse_errors() {
        assert!(ContentFormat::Json.check(r#"{"a": 1}"#).is_none());
        assert!(ContentFormat::Json.check("{oops").is_some());
        assert!(ContentFormat::Yaml.check("a: 1\nb: [2, 3]").is_none());
        assert!(ContentFormat::Yaml.check("a: [1, 2").is_some());
        assert!(ContentFormat::Text.check("{oops").is_none());
    }

    #[test]
    fn format_from_str() {
        assert_eq!("JSON".parse::<ContentFormat>(), Ok(ContentFormat::Json));
        assert_eq!("yml".parse::<ContentFormat>(), Ok(ContentFormat::Yaml));
        assert!("xml".parse::<ContentFormat>().is_err());
    }

    #[test]
    fn format_ttl_units() {
        assert_eq!(format_ttl(0), "No TTL");
        assert_eq!(format_ttl(45), "45s");
        assert_eq!(format_ttl(300), "5m");
        assert_eq!(format_ttl(7200), "2h");
        assert_eq!(format_ttl(3 * 86400 + 5), "3d");
    }

    #[test]
    fn truncate_preview_appends_ellipsis() {
        assert_eq!(truncate_preview("short", 10), "short");
        assert_eq!(truncate_preview("abcdefghij", 4), "abcd...");
    }
}

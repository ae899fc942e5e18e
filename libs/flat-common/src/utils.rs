//! Utility functions for the FLAT store

use crate::constants::{STORAGE_DIR, STORAGE_FILENAME};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Get the default storage file path (`~/.flat/flat.sqlite`)
#[must_use]
pub fn get_default_storage_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
    PathBuf::from(home).join(STORAGE_DIR).join(STORAGE_FILENAME)
}

/// Format a date for display
#[must_use]
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format an optional date, using `-` when absent
#[must_use]
pub fn format_optional_date(date: Option<&NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), format_date)
}

/// Generate a new opaque id with a readable prefix, e.g. `project-3f2a…`
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    if prefix.is_empty() {
        id
    } else {
        format!("{prefix}-{id}")
    }
}

/// Check that an id is usable as a record key
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.chars().any(char::is_control)
}

/// Truncate a string to a maximum length (in characters)
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_storage_path() {
        let path = get_default_storage_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.contains(".flat"));
        assert!(path_str.ends_with("flat.sqlite"));
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(format_date(&date), "2025-01-05");
    }

    #[test]
    fn test_format_optional_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(format_optional_date(Some(&date)), "2024-02-29");
        assert_eq!(format_optional_date(None), "-");
    }

    #[test]
    fn test_generate_id() {
        let a = generate_id("project");
        let b = generate_id("project");
        assert!(a.starts_with("project-"));
        assert_ne!(a, b);
        assert!(!generate_id("").contains('-'));
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("factory-1"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("   "));
        assert!(!is_valid_id("bad\nid"));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello world", 5), "he...");
        assert_eq!(truncate_string("hi", 10), "hi");
        assert_eq!(truncate_string("화장품 프로젝트", 5), "화장...");
    }
}

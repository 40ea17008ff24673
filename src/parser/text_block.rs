//! Key/value extraction from brace-delimited text blocks.
//!
//! Steam's `.acf` and `.vdf` text files have no published grammar, so
//! instead of a full parser values are pulled out by key. Three spellings
//! are recognised:
//!
//! - `"key" "value"` (block style, with `\\` and `\"` escapes)
//! - `key="value"`
//! - `key='value'`
//!
//! Keys match case-insensitively and the earliest occurrence in the text
//! wins. Nesting is not tracked: a key inside a nested block is
//! indistinguishable from a top-level key with the same name. The formats
//! themselves accept this ambiguity, so callers pick keys that are unique
//! in practice (`appid`, `installdir`, `StateFlags`).

use regex::{Captures, Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Returns the first value stored under `key`, or `None` if it is absent.
///
/// # Example
///
/// ```
/// use gamescan::parser::text_block::extract_value;
///
/// let acf = r#""AppState" { "appid" "440" "name" "Team Fortress 2" }"#;
/// assert_eq!(extract_value(acf, "AppID").as_deref(), Some("440"));
/// assert_eq!(extract_value("name='Portal'", "name").as_deref(), Some("Portal"));
/// assert_eq!(extract_value(acf, "installdir"), None);
/// ```
pub fn extract_value(text: &str, key: &str) -> Option<String> {
    let pattern = key_pattern(key)?;
    pattern.captures(text).and_then(|caps| captured_value(&caps))
}

/// Returns every value stored under `key`, in document order.
pub fn extract_all(text: &str, key: &str) -> Vec<String> {
    match key_pattern(key) {
        Some(pattern) => pattern
            .captures_iter(text)
            .filter_map(|caps| captured_value(&caps))
            .collect(),
        None => Vec::new(),
    }
}

/// Compiled patterns, one per lowercased key.
fn key_pattern(key: &str) -> Option<Regex> {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Option<Regex>>>> = OnceLock::new();

    let key = key.to_lowercase();
    let mut patterns = PATTERNS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    patterns
        .entry(key)
        .or_insert_with_key(|key| compile_key_pattern(key))
        .clone()
}

fn compile_key_pattern(key: &str) -> Option<Regex> {
    let key = regex::escape(key);
    let pattern = format!(
        r#""{key}"\s+"((?:[^"\\]|\\.)*)"|(?:^|[^\w"]){key}\s*=\s*"([^"]*)"|(?:^|[^\w"]){key}\s*=\s*'([^']*)'"#
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

fn captured_value(caps: &Captures<'_>) -> Option<String> {
    if let Some(block) = caps.get(1) {
        return Some(unescape(block.as_str()));
    }
    caps.get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_string())
}

/// Resolves the backslash escapes used inside quoted block-style values.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

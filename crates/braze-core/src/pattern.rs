//! Action patterns with named parameter extraction.
//!
//! A [`Pattern`] describes the shape of an action path, e.g. `"items/:id"`.
//! Matching is ASCII-case-insensitive and uses **prefix semantics**: the
//! matched path may carry more segments than the pattern, so `"a"` matches
//! `"a"`, `"a/b"` and `"a/5"` alike. Segments written as `:name` capture
//! the corresponding path segment under `name`.
//!
//! A failed match is the `None` sentinel, never confusable with a match
//! that simply captured no parameters (`Some(Params::new())`).
//!
//! # Example
//!
//! ```rust
//! use braze_core::Pattern;
//!
//! let pattern = Pattern::compile("items/:id");
//! let params = pattern.matches("Items/5/details").unwrap();
//! assert_eq!(params.get("id").map(String::as_str), Some("5"));
//! assert!(pattern.matches("users/5").is_none());
//! ```

use std::collections::HashMap;

/// Named parameters extracted from a matched path.
///
/// Captured values keep the original case of the path segment, even though
/// literal segments compare case-insensitively.
pub type Params = HashMap<String, String>;

/// One compiled segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// A literal segment, stored lowercased for case-insensitive comparison.
    Literal(String),
    /// A `:name` segment capturing the path segment under `name`.
    Param(String),
}

/// A compiled action pattern.
///
/// Compilation happens once at registration time; matching a path against
/// a compiled pattern is a plain segment walk with no allocation beyond
/// the captured parameters.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compiles a pattern string.
    ///
    /// Empty segments (leading, trailing or doubled slashes) are dropped,
    /// so `"a/b"`, `"/a/b"` and `"a/b/"` compile identically. A bare `:`
    /// with no name is treated as a literal.
    pub fn compile(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = split_segments(&raw)
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(seg.to_ascii_lowercase()),
            })
            .collect();

        Self { raw, segments }
    }

    /// Returns the pattern string as written at registration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches a path against this pattern.
    ///
    /// Returns the captured parameters on success, or `None` when any
    /// pattern segment has no matching path segment. The path may have
    /// trailing segments beyond the pattern (prefix semantics).
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut path_segments = split_segments(path);
        let mut params = Params::new();

        for segment in &self.segments {
            let candidate = path_segments.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if !candidate.eq_ignore_ascii_case(literal) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), candidate.to_string());
                }
            }
        }

        Some(params)
    }
}

impl From<&str> for Pattern {
    fn from(raw: &str) -> Self {
        Pattern::compile(raw)
    }
}

impl From<String> for Pattern {
    fn from(raw: String) -> Self {
        Pattern::compile(raw)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|seg| !seg.is_empty())
}

/// Matches `path` against `patterns` in listed order.
///
/// The first pattern yielding a match wins and its parameters are
/// returned; later patterns are not consulted.
pub fn match_first(patterns: &[Pattern], path: &str) -> Option<Params> {
    patterns.iter().find_map(|pattern| pattern.matches(path))
}

// ============================================================================
// IntoPatterns - registration-time pattern conversion
// ============================================================================

/// Conversion into a pattern list for the registration API.
///
/// Lets `render` and `middleware_on` accept a single pattern string, a
/// pre-compiled [`Pattern`], or any collection of either:
///
/// ```rust,ignore
/// app.render("items/:id", show_item);
/// app.render(["items", "items/:id"], show_item);
/// ```
pub trait IntoPatterns {
    /// Compiles this value into an ordered pattern list.
    fn into_patterns(self) -> Vec<Pattern>;
}

impl IntoPatterns for Pattern {
    fn into_patterns(self) -> Vec<Pattern> {
        vec![self]
    }
}

impl IntoPatterns for &str {
    fn into_patterns(self) -> Vec<Pattern> {
        vec![Pattern::compile(self)]
    }
}

impl IntoPatterns for String {
    fn into_patterns(self) -> Vec<Pattern> {
        vec![Pattern::compile(self)]
    }
}

impl<P: Into<Pattern>> IntoPatterns for Vec<P> {
    fn into_patterns(self) -> Vec<Pattern> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<P: Into<Pattern>, const N: usize> IntoPatterns for [P; N] {
    fn into_patterns(self) -> Vec<Pattern> {
        self.into_iter().map(Into::into).collect()
    }
}

impl IntoPatterns for &[&str] {
    fn into_patterns(self) -> Vec<Pattern> {
        self.iter().map(|raw| Pattern::compile(*raw)).collect()
    }
}

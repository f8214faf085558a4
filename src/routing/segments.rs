//! Path segment helpers shared by the index, the registry and the forwarder.
//!
//! # Design Decisions
//! - Segments are split on `/` with empty segments discarded, so `/a//b/` has two segments
//! - Comparison is ASCII case-insensitive; display strings keep their original case
//! - A segment containing `{` is a template placeholder and matches any literal segment

/// Key under which template segments are stored in the index.
pub const WILDCARD_KEY: &str = "*";

/// Split a path into its non-empty segments.
pub fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Returns true if the segment is a template placeholder such as `{id}`.
pub fn is_template(segment: &str) -> bool {
    segment.contains('{')
}

/// Index key for a segment: `*` for placeholders, lower-cased otherwise.
pub fn key(segment: &str) -> String {
    if is_template(segment) {
        WILDCARD_KEY.to_string()
    } else {
        segment.to_lowercase()
    }
}

/// Returns true if `path` begins with every segment of `prefix`.
///
/// Template segments in `prefix` accept any literal segment at that depth.
pub fn starts_with(path: &str, prefix: &str) -> bool {
    let mut path_segments = split(path);
    for expected in split(prefix) {
        match path_segments.next() {
            Some(actual) if is_template(expected) || actual.eq_ignore_ascii_case(expected) => {}
            _ => return false,
        }
    }
    true
}

/// Returns true for `.` and `..`, including their `%2e` encoded spellings.
pub fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Returns true if any segment of `path` is a dot segment.
pub fn has_dot_segment(path: &str) -> bool {
    split(path).any(is_dot_segment)
}

/// Number of segments in a path.
pub fn count(path: &str) -> usize {
    split(path).count()
}

/// Drop the first `n` segments of `path`, returning the raw remainder without
/// its leading slashes. A trailing slash in the remainder is preserved.
pub fn strip(path: &str, n: usize) -> &str {
    let mut rest = path;
    for _ in 0..n {
        rest = rest.trim_start_matches('/');
        match rest.find('/') {
            Some(end) => rest = &rest[end..],
            None => return "",
        }
    }
    rest.trim_start_matches('/')
}

/// Normalize a user-supplied path into the canonical `/a/b` form.
///
/// Returns `None` for paths that cannot be a proxy prefix: empty input,
/// query or fragment markers, whitespace, or dot segments.
pub fn normalize(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty()
        || trimmed.contains(['?', '#'])
        || trimmed.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return None;
    }

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    for segment in split(trimmed) {
        if is_dot_segment(segment) {
            return None;
        }
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    Some(normalized)
}

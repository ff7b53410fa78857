//! Lexical path normalization
//!
//! Purely string based, never touches the filesystem. Output is always a
//! relative, slash separated path with no `.` or `..` components.

const SEPARATOR: char = '/';

/// Normalize a location into a root-relative path.
///
/// Repeated separators collapse, `.` segments vanish and `..` removes the
/// previous segment. A `..` with nothing left to remove is dropped rather
/// than honored, so the result can never climb above the root. Leading and
/// trailing separators do not survive. Returns an empty string when nothing
/// remains.
pub fn normalize_relative(input: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in input.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    parts.join("/")
}

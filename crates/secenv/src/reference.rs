//! Indirection syntax: `VAULT:<path>` or `VAULT:<path>.<field>`

/// Literal prefix marking an environment value as a pointer into the secret store
pub const MARKER: &str = "VAULT:";

/// Field read from a secret when the reference names none
pub const DEFAULT_FIELD: &str = "value";

/// A secret reference split into the record path and the field inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName<'a> {
    pub path: &'a str,
    pub field: &'a str,
}

/// Return the reference part of `value` if it carries the marker.
pub fn strip_marker(value: &str) -> Option<&str> {
    value.strip_prefix(MARKER)
}

/// Check whether an environment value is an indirection
pub fn is_reference(value: &str) -> bool {
    value.starts_with(MARKER)
}

/// Split `path/to/secret.field` on the first `.` only.
///
/// Without a separator the field defaults to [`DEFAULT_FIELD`]. Everything
/// after the first `.`, further dots included, is the field.
pub fn split_name(raw: &str) -> ParsedName<'_> {
    match raw.split_once('.') {
        Some((path, field)) => ParsedName { path, field },
        None => ParsedName {
            path: raw,
            field: DEFAULT_FIELD,
        },
    }
}

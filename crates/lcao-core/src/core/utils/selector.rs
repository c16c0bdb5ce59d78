use thiserror::Error;

/// Error returned when a string does not name any known variant of a closed
/// selector enum (activation, weight initializer, basis family, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'. Expected one of: {expected}")]
pub struct SelectorError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl SelectorError {
    pub fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Normalizes a selector string so that `"Glorot-Orthogonal"`,
/// `"glorot_orthogonal"` and `"glorot orthogonal"` compare equal.
pub fn normalize_selector(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

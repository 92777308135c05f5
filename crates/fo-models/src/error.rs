use thiserror::Error;

/// A stored or submitted text value that names no known variant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{value}' is not a valid {type_name}")]
pub struct ParseEnumError {
    pub type_name: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(type_name: &'static str, value: impl Into<String>) -> Self {
        Self {
            type_name,
            value: value.into(),
        }
    }
}

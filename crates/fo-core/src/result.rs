//! Result type aliases

use crate::error::FoError;

/// Standard Result type for FieldOps operations
pub type FoResult<T> = Result<T, FoError>;

/// Extension for turning a missing record into a `NotFound` error
pub trait OptionExt<T> {
    fn or_not_found(self, entity: &'static str, id: impl std::fmt::Display) -> FoResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, entity: &'static str, id: impl std::fmt::Display) -> FoResult<T> {
        self.ok_or_else(|| FoError::not_found(entity, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_not_found() {
        let missing: Option<i32> = None;
        let err = missing.or_not_found("WorkOrder", 42).unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(err.to_string().contains("WorkOrder"));

        assert_eq!(Some(1).or_not_found("WorkOrder", 1).unwrap(), 1);
    }
}

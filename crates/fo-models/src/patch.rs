//! Nullable fields in `Update*` inputs
//!
//! A missing key leaves the column alone, `null` clears it and a value sets
//! it. Fields use `Option<Option<T>>` with:
//!
//! ```ignore
//! #[serde(default, deserialize_with = "crate::patch::nullable")]
//! ```

use serde::{Deserialize, Deserializer};

pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Writes a nullable patch field into the stored value
pub fn apply<T>(target: &mut Option<T>, change: Option<Option<T>>) {
    if let Some(value) = change {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn test_missing_null_and_value_differ() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        let cleared: Patch = serde_json::from_str(r#"{"phone":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"phone":"555-0100"}"#).unwrap();

        assert_eq!(missing.phone, None);
        assert_eq!(cleared.phone, Some(None));
        assert_eq!(set.phone, Some(Some("555-0100".to_string())));
    }

    #[test]
    fn test_apply() {
        let mut phone = Some("555-0100".to_string());
        apply(&mut phone, None);
        assert_eq!(phone.as_deref(), Some("555-0100"));
        apply(&mut phone, Some(None));
        assert_eq!(phone, None);
    }
}

//! Shared service plumbing
//!
//! Services take the acting user as a `CurrentUser`, run the contract for the
//! input, apply the store-level rules and record what happened. Notification
//! delivery never fails the write it belongs to.

use fo_auth::CurrentUser;
use fo_core::error::{FoError, ValidationErrors};
use fo_core::result::FoResult;
use fo_core::traits::Id;
use fo_db::UserStore;
use fo_models::NewNotification;
use fo_notifications::NotificationSink;
use tracing::warn;

/// Message for a unique field that is already used
pub const TAKEN: &str = "has already been taken";

/// The acting user as recorded in audit columns
pub fn actor(user: &CurrentUser) -> Option<Id> {
    Some(user.id)
}

/// A single-field "has already been taken" failure
pub fn taken(field: &str) -> FoError {
    FoError::invalid(field, TAKEN)
}

/// Fails with `field` "has already been taken" unless `unique`
pub fn ensure_unique(unique: bool, field: &str) -> FoResult<()> {
    if unique {
        Ok(())
    } else {
        Err(taken(field))
    }
}

/// A base (record level) validation failure
pub fn invalid_base(message: impl Into<String>) -> FoError {
    let mut errors = ValidationErrors::new();
    errors.add_base(message);
    FoError::Validation(errors)
}

/// Trimmed, `None` when blank
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Delivers a notification; a failure is logged and swallowed
pub async fn deliver(sink: &dyn NotificationSink, notification: NewNotification) {
    let recipient = notification.recipient_id;
    if let Err(e) = sink.notify(notification).await {
        warn!(recipient, error = %e, "Notification could not be delivered");
    }
}

/// Notifies the user account linked to an employee, unless that account is
/// the one acting
pub async fn deliver_to_employee(
    users: &dyn UserStore,
    sink: &dyn NotificationSink,
    employee_id: Id,
    acting: &CurrentUser,
    build: impl FnOnce(Id) -> NewNotification,
) {
    match users.find_by_employee(employee_id).await {
        Ok(Some(account)) if account.id != acting.id => deliver(sink, build(account.id)).await,
        Ok(_) => {}
        Err(e) => warn!(employee_id, error = %e, "Could not resolve the employee's account"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean(Some("  Plant 4 ".into())), Some("Plant 4".into()));
        assert_eq!(clean(Some("   ".into())), None);
        assert_eq!(clean(None), None);
    }

    #[test]
    fn test_unique_failure_is_a_field_error() {
        assert!(ensure_unique(true, "code").is_ok());
        match ensure_unique(false, "code").unwrap_err() {
            FoError::Validation(errors) => {
                assert_eq!(errors.get("code"), Some(&vec![TAKEN.to_string()]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

//! User model
//!
//! Table: users. Roles are joined through `user_roles`.

use chrono::{DateTime, Duration, Utc};
use fo_core::traits::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// User account
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    /// Employee record this account belongs to, if any
    pub employee_id: Option<Id>,
    pub failed_login_count: i32,
    pub last_failed_login_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Role names
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(User, "users", "User");

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Locked when `max_failures` failed logins happened and the latest one
    /// is still inside the lockout window
    pub fn is_locked_out(&self, now: DateTime<Utc>, max_failures: u32, window: Duration) -> bool {
        if self.failed_login_count < max_failures as i32 {
            return false;
        }
        match self.last_failed_login_at {
            Some(at) => now - at < window,
            None => false,
        }
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub password: String,
    pub employee_id: Option<Id>,
    /// Role names
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Input for updating a user
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub employee_id: Option<Option<Id>>,
}

/// Input for changing one's own password
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(failures: i32, last_failure: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            password_hash: "x".into(),
            is_active: true,
            employee_id: None,
            failed_login_count: failures,
            last_failed_login_at: last_failure,
            last_login_at: None,
            roles: vec![],
            created_at: now,
            updated_at: now,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_lockout_window() {
        let now = Utc::now();
        let window = Duration::minutes(30);

        assert!(!user(4, Some(now)).is_locked_out(now, 5, window));
        assert!(user(5, Some(now - Duration::minutes(10))).is_locked_out(now, 5, window));
        assert!(!user(5, Some(now - Duration::minutes(31))).is_locked_out(now, 5, window));
        assert!(!user(9, None).is_locked_out(now, 5, window));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user(0, None)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "jdoe");
        assert!(json.get("deletedAt").is_none());
    }
}

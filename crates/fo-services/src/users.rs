//! User accounts and sign-in

use std::sync::Arc;

use chrono::{Duration, Utc};
use fo_activity::ActivityLogger;
use fo_auth::{AuthError, CurrentUser, PasswordHasher};
use fo_contracts::base::{ensure_allowed, Contract, ADMIN_ROLE};
use fo_contracts::users::{permissions, ChangePasswordContract, CreateUserContract, UpdateUserContract};
use fo_core::config::AuthConfig;
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{CreateUserDto, EmployeeStore, RoleStore, Stores, UserStore};
use fo_models::{ChangePassword, NewUser, UpdateUser, User};
use tracing::{info, instrument, warn};

use crate::base::{actor, ensure_unique};

pub struct UserService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    employees: Arc<dyn EmployeeStore>,
    hasher: PasswordHasher,
    max_failed_logins: u32,
    lockout_window: Duration,
    activity: ActivityLogger,
}

impl UserService {
    pub fn new(stores: &Stores, auth: &AuthConfig, activity: ActivityLogger) -> Self {
        Self {
            users: stores.users.clone(),
            roles: stores.roles.clone(),
            employees: stores.employees.clone(),
            hasher: PasswordHasher::new(),
            max_failed_logins: auth.max_failed_logins,
            lockout_window: Duration::minutes(auth.lockout_minutes),
            activity,
        }
    }

    /// Verifies the credentials and resolves the user's permissions.
    ///
    /// An account with too many recent failures is locked until the window
    /// has passed, whatever password is given.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> FoResult<(User, CurrentUser)> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let now = Utc::now();
        if user.is_locked_out(now, self.max_failed_logins, self.lockout_window) {
            warn!(user_id = user.id, "Login refused, account locked");
            return Err(AuthError::Locked.into());
        }

        if !self.hasher.verify(password, &user.password_hash)? {
            let failed = self
                .users
                .record_login_failure(user.id, now - self.lockout_window)
                .await?;
            warn!(user_id = user.id, failures = failed.failed_login_count, "Login failed");
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.is_active {
            return Err(AuthError::Inactive.into());
        }

        self.users.record_login_success(user.id).await?;
        let permissions = self.roles.permissions_for_roles(&user.roles).await?;
        let current = CurrentUser::from_user(&user, permissions);
        info!(user_id = user.id, "User signed in");
        Ok((user, current))
    }

    /// The caller a token was issued to, as the account stands now.
    ///
    /// Deactivated or removed accounts are refused and roles are re-read, so
    /// neither depends on the token's age.
    pub async fn current(&self, claims: &CurrentUser) -> FoResult<CurrentUser> {
        let user = self
            .users
            .find_by_id(claims.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AuthError::Inactive.into());
        }
        let permissions = self.roles.permissions_for_roles(&user.roles).await?;
        Ok(CurrentUser::from_user(&user, permissions))
    }

    pub async fn list(&self, user: &CurrentUser, q: Option<&str>, pagination: Pagination) -> FoResult<PaginatedResult<User>> {
        ensure_allowed(user, permissions::MANAGE)?;
        Ok(self.users.search(q, pagination).await?)
    }

    /// Everybody may read their own account
    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<User> {
        if user.id != id {
            ensure_allowed(user, permissions::MANAGE)?;
        }
        self.find(id).await
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewUser) -> FoResult<User> {
        input.username = input.username.trim().to_string();
        input.email = input.email.trim().to_lowercase();
        input.first_name = input.first_name.trim().to_string();
        input.last_name = input.last_name.trim().to_string();

        CreateUserContract::new(user).check(&input)?;
        ensure_unique(self.users.is_username_unique(&input.username, None).await?, "username")?;
        ensure_unique(self.users.is_email_unique(&input.email, None).await?, "email")?;
        let roles = self.resolve_roles(&input.roles).await?;
        if let Some(employee_id) = input.employee_id {
            self.ensure_linkable(employee_id, None).await?;
        }

        let password_hash = self.hasher.hash(&input.password)?;
        let dto = CreateUserDto {
            username: input.username,
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            password_hash,
            is_active: true,
            employee_id: input.employee_id,
        };
        let mut created = self.users.create(dto, actor(user)).await?;
        if !roles.is_empty() {
            created = self.users.set_roles(created.id, &roles).await?;
        }

        info!(id = created.id, username = %created.username, "User created");
        self.activity
            .created(actor(user), &created, format!("User {} created", created.username))
            .await;
        Ok(created)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, id: Id, mut patch: UpdateUser) -> FoResult<User> {
        let current = self.find(id).await?;
        patch.email = patch.email.map(|e| e.trim().to_lowercase());

        UpdateUserContract::new(user, &current).check(&patch)?;
        if let Some(email) = &patch.email {
            ensure_unique(self.users.is_email_unique(email, Some(id)).await?, "email")?;
        }
        if let Some(employee_id) = patch.employee_id.flatten().filter(|e| current.employee_id != Some(*e)) {
            self.ensure_linkable(employee_id, Some(id)).await?;
        }

        let updated = self.users.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    /// Replaces the role list. Administrators cannot drop their own
    /// administrator role.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn set_roles(&self, user: &CurrentUser, id: Id, roles: Vec<String>) -> FoResult<User> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        let roles = self.resolve_roles(&roles).await?;

        let keeps_admin = roles.iter().any(|r| r.eq_ignore_ascii_case(ADMIN_ROLE));
        if id == user.id && user.is_admin() && !keeps_admin {
            return Err(FoError::invalid("roles", "you cannot remove your own administrator role"));
        }

        let updated = self.users.set_roles(id, &roles).await?;
        info!(id, roles = ?updated.roles, "User roles changed");
        self.activity
            .changed(actor(user), "roles_changed", &current, &updated)
            .await;
        Ok(updated)
    }

    /// Accounts are never removed, only deactivated
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn deactivate(&self, user: &CurrentUser, id: Id) -> FoResult<User> {
        let current = self.find(id).await?;
        let patch = UpdateUser {
            is_active: Some(false),
            ..Default::default()
        };
        UpdateUserContract::new(user, &current).check(&patch)?;

        let updated = self.users.update(id, patch, actor(user)).await?;
        info!(id, username = %updated.username, "User deactivated");
        self.activity
            .changed(actor(user), "deactivated", &current, &updated)
            .await;
        Ok(updated)
    }

    /// Changes the acting user's own password
    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn change_password(&self, user: &CurrentUser, input: ChangePassword) -> FoResult<()> {
        ChangePasswordContract::new(user).check(&input)?;
        let current = self.find(user.id).await?;
        if !self.hasher.verify(&input.current_password, &current.password_hash)? {
            return Err(FoError::invalid("currentPassword", "is incorrect"));
        }

        let password_hash = self.hasher.hash(&input.new_password)?;
        self.users
            .update_password_hash(user.id, &password_hash, actor(user))
            .await?;
        info!(user_id = user.id, "Password changed");
        self.activity
            .action(
                actor(user),
                "password_changed",
                "User",
                Some(user.id),
                format!("User {} changed their password", current.username),
                None,
            )
            .await;
        Ok(())
    }

    async fn find(&self, id: Id) -> FoResult<User> {
        self.users.find_by_id(id).await?.or_not_found("User", id)
    }

    /// Stored role names for `names`; unknown names fail on `roles`
    async fn resolve_roles(&self, names: &[String]) -> FoResult<Vec<String>> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            match self.roles.find_by_name(name.trim()).await? {
                Some(role) if !resolved.contains(&role.name) => resolved.push(role.name),
                Some(_) => {}
                None => return Err(FoError::invalid("roles", format!("unknown role {}", name))),
            }
        }
        Ok(resolved)
    }

    /// The employee exists and has no other account
    async fn ensure_linkable(&self, employee_id: Id, user_id: Option<Id>) -> FoResult<()> {
        if !self.employees.exists(employee_id).await? {
            return Err(FoError::invalid("employeeId", "does not exist"));
        }
        match self.users.find_by_employee(employee_id).await? {
            Some(linked) if Some(linked.id) != user_id => Err(FoError::invalid(
                "employeeId",
                format!("is already linked to user {}", linked.username),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, create_employee, seeded_stores, user_with};
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;
    use fo_contracts::work_orders::permissions as work_orders;

    const PASSWORD: &str = "correct-horse-42";

    fn service(stores: &Stores) -> UserService {
        UserService::new(stores, &AuthConfig::default(), ActivityLogger::new(stores.activity.clone()))
    }

    fn new_user(username: &str, roles: &[&str]) -> NewUser {
        NewUser {
            username: username.into(),
            email: SafeEmail().fake(),
            first_name: "Jo".into(),
            last_name: "Technician".into(),
            password: PASSWORD.into(),
            employee_id: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_and_sign_in() {
        let stores = seeded_stores().await;
        let service = service(&stores);

        let created = service
            .create(&admin(), new_user("jtech", &["technician"]))
            .await
            .unwrap();
        assert_eq!(created.roles, vec!["Technician".to_string()]);
        assert_ne!(created.password_hash, PASSWORD);

        let (user, current) = service.authenticate("jtech", PASSWORD).await.unwrap();
        assert_eq!(user.id, created.id);
        assert!(current.allowed(work_orders::VIEW));
        assert!(!current.is_admin());

        let err = service.create(&admin(), new_user("jtech", &[])).await.unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("username")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_role_is_rejected() {
        let stores = seeded_stores().await;
        let err = service(&stores)
            .create(&admin(), new_user("jtech", &["Wizard"]))
            .await
            .unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("roles")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        service.create(&admin(), new_user("jtech", &[])).await.unwrap();

        for _ in 0..5 {
            let err = service.authenticate("jtech", "wrong-password").await.unwrap_err();
            assert_eq!(err.status_code(), 401);
        }
        let err = service.authenticate("jtech", PASSWORD).await.unwrap_err();
        assert_eq!(err.to_string(), FoError::from(AuthError::Locked).to_string());
    }

    #[tokio::test]
    async fn test_inactive_user_is_rejected() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service.create(&admin(), new_user("jtech", &[])).await.unwrap();
        service.deactivate(&admin(), created.id).await.unwrap();

        let err = service.authenticate("jtech", PASSWORD).await.unwrap_err();
        assert_eq!(err.to_string(), FoError::from(AuthError::Inactive).to_string());
    }

    #[tokio::test]
    async fn test_current_follows_account_changes() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service
            .create(&admin(), new_user("jtech", &["technician"]))
            .await
            .unwrap();
        let (_, claims) = service.authenticate("jtech", PASSWORD).await.unwrap();

        service
            .set_roles(&admin(), created.id, vec!["Manager".into()])
            .await
            .unwrap();
        let current = service.current(&claims).await.unwrap();
        assert_eq!(current.roles, vec!["Manager".to_string()]);

        service.deactivate(&admin(), created.id).await.unwrap();
        let err = service.current(&claims).await.unwrap_err();
        assert_eq!(err.status_code(), 401);

        let stranger = user_with(4242, &[work_orders::VIEW]);
        let err = service.current(&stranger).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_admin_keeps_own_admin_role() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service
            .create(&admin(), new_user("boss", &[ADMIN_ROLE]))
            .await
            .unwrap();
        let me = CurrentUser::new(created.id, "boss").with_roles([ADMIN_ROLE]);

        let err = service
            .set_roles(&me, created.id, vec!["Manager".into()])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);

        let err = service.deactivate(&me, created.id).await.unwrap_err();
        assert_eq!(err.status_code(), 422);

        let updated = service
            .set_roles(&admin(), created.id, vec!["Manager".into()])
            .await
            .unwrap();
        assert_eq!(updated.roles, vec!["Manager".to_string()]);
    }

    #[tokio::test]
    async fn test_employee_links_once() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let employee = create_employee(&stores, "EMP-001").await;

        let mut first = new_user("first", &[]);
        first.employee_id = Some(employee.id);
        service.create(&admin(), first).await.unwrap();

        let mut second = new_user("second", &[]);
        second.employee_id = Some(employee.id);
        let err = service.create(&admin(), second).await.unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("employeeId")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_change_password() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service.create(&admin(), new_user("jtech", &[])).await.unwrap();
        let me = user_with(created.id, &[]);

        let wrong = ChangePassword {
            current_password: "not-my-password".into(),
            new_password: "battery-staple-7".into(),
        };
        match service.change_password(&me, wrong).await.unwrap_err() {
            FoError::Validation(errors) => assert!(errors.has_error("currentPassword")),
            other => panic!("unexpected {:?}", other),
        }

        let right = ChangePassword {
            current_password: PASSWORD.into(),
            new_password: "battery-staple-7".into(),
        };
        service.change_password(&me, right).await.unwrap();
        assert!(service.authenticate("jtech", "battery-staple-7").await.is_ok());
        assert!(service.authenticate("jtech", PASSWORD).await.is_err());
    }

    #[tokio::test]
    async fn test_users_read_only_themselves() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let first = service.create(&admin(), new_user("first", &[])).await.unwrap();
        let second = service.create(&admin(), new_user("second", &[])).await.unwrap();

        let me = user_with(first.id, &[]);
        assert!(service.get(&me, first.id).await.is_ok());
        assert_eq!(service.get(&me, second.id).await.unwrap_err().status_code(), 403);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::patch::apply;
use fo_models::{Role, UpdateUser, User};
use parking_lot::RwLock;

use super::table::{contains_ci, search_term, slice, MemoryTable};
use crate::repository::{Repository, RepositoryResult};
use crate::users::{CreateUserDto, UserStore};

/// Users with role memberships kept by role id, so renamed or deleted
/// roles show up the same way the joined SQL query reports them
pub struct MemoryUserStore {
    users: MemoryTable<User>,
    memberships: RwLock<HashMap<Id, Vec<Id>>>,
    roles: Arc<MemoryTable<Role>>,
}

impl MemoryUserStore {
    pub fn new(roles: Arc<MemoryTable<Role>>) -> Self {
        Self {
            users: MemoryTable::new(),
            memberships: RwLock::new(HashMap::new()),
            roles,
        }
    }

    fn hydrate(&self, mut user: User) -> User {
        let role_ids = self
            .memberships
            .read()
            .get(&user.id)
            .cloned()
            .unwrap_or_default();
        let mut names: Vec<String> = role_ids
            .into_iter()
            .filter_map(|id| self.roles.get(id))
            .map(|role| role.name)
            .collect();
        names.sort();
        user.roles = names;
        user
    }

    fn hydrate_all(&self, users: Vec<User>) -> Vec<User> {
        users.into_iter().map(|u| self.hydrate(u)).collect()
    }

    fn fetch(&self, id: Id) -> RepositoryResult<User> {
        self.users.require(id).map(|u| self.hydrate(u))
    }
}

#[async_trait]
impl Repository<User, CreateUserDto, UpdateUser> for MemoryUserStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        Ok(self.users.get(id).map(|u| self.hydrate(u)))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<User>> {
        let mut users = self.users.all();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(self.hydrate_all(slice(users, limit, offset)))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.users.count())
    }

    async fn create(&self, dto: CreateUserDto, actor: Option<Id>) -> RepositoryResult<User> {
        let now = Utc::now();
        let user = self.users.insert(User {
            id: self.users.next_id(),
            username: dto.username,
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            password_hash: dto.password_hash,
            is_active: dto.is_active,
            employee_id: dto.employee_id,
            failed_login_count: 0,
            last_failed_login_at: None,
            last_login_at: None,
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
            created_by_id: actor,
            updated_by_id: actor,
            deleted_at: None,
        });
        Ok(user)
    }

    async fn update(&self, id: Id, dto: UpdateUser, actor: Option<Id>) -> RepositoryResult<User> {
        self.users
            .update(id, actor, |user| {
                if let Some(email) = dto.email {
                    user.email = email;
                }
                if let Some(first_name) = dto.first_name {
                    user.first_name = first_name;
                }
                if let Some(last_name) = dto.last_name {
                    user.last_name = last_name;
                }
                if let Some(is_active) = dto.is_active {
                    user.is_active = is_active;
                }
                apply(&mut user.employee_id, dto.employee_id);
            })
            .map(|u| self.hydrate(u))
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.users.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<User> {
        self.users.restore(id, actor).map(|u| self.hydrate(u))
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.users.get(id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .map(|u| self.hydrate(u)))
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| self.hydrate(u)))
    }

    async fn find_by_employee(&self, employee_id: Id) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .find(|u| u.employee_id == Some(employee_id))
            .map(|u| self.hydrate(u)))
    }

    async fn is_username_unique(&self, username: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self
            .users
            .any(|u| u.username.eq_ignore_ascii_case(username) && Some(u.id) != exclude_id))
    }

    async fn is_email_unique(&self, email: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self
            .users
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != exclude_id))
    }

    async fn set_roles(&self, user_id: Id, roles: &[String]) -> RepositoryResult<User> {
        self.users.require(user_id)?;
        let role_ids: Vec<Id> = self
            .roles
            .filter(|r| roles.iter().any(|name| name == &r.name))
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.memberships.write().insert(user_id, role_ids);
        self.fetch(user_id)
    }

    async fn record_login_success(&self, id: Id) -> RepositoryResult<()> {
        let now = Utc::now();
        self.users.update(id, None, |user| {
            user.failed_login_count = 0;
            user.last_failed_login_at = None;
            user.last_login_at = Some(now);
        })?;
        Ok(())
    }

    async fn record_login_failure(&self, id: Id, window_start: DateTime<Utc>) -> RepositoryResult<User> {
        let now = Utc::now();
        self.users
            .update(id, None, |user| {
                user.failed_login_count = match user.last_failed_login_at {
                    Some(at) if at >= window_start => user.failed_login_count + 1,
                    _ => 1,
                };
                user.last_failed_login_at = Some(now);
            })
            .map(|u| self.hydrate(u))
    }

    async fn update_password_hash(&self, id: Id, password_hash: &str, actor: Option<Id>) -> RepositoryResult<()> {
        self.users
            .update(id, actor, |user| user.password_hash = password_hash.to_string())?;
        Ok(())
    }

    async fn search(&self, q: Option<&str>, pagination: Pagination) -> RepositoryResult<PaginatedResult<User>> {
        let term = search_term(q);
        let mut users = self.users.filter(|u| {
            term.map_or(true, |t| {
                contains_ci(&u.username, t)
                    || contains_ci(&u.email, t)
                    || contains_ci(&u.first_name, t)
                    || contains_ci(&u.last_name, t)
            })
        });
        users.sort_by(|a, b| a.username.cmp(&b.username));
        let total = users.len() as i64;
        let items = self.hydrate_all(pagination.apply(users));
        Ok(PaginatedResult::new(items, total, pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fo_models::NewRole;

    use crate::memory::roles::MemoryRoleStore;
    use crate::roles::RoleStore;

    fn dto(username: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.to_string(),
            email: format!("{}@fieldops.test", username),
            first_name: "Ana".into(),
            last_name: "Ruiz".into(),
            password_hash: "hash".into(),
            is_active: true,
            employee_id: None,
        }
    }

    fn stores() -> (MemoryUserStore, MemoryRoleStore) {
        let roles = Arc::new(MemoryTable::new());
        (MemoryUserStore::new(roles.clone()), MemoryRoleStore::new(roles))
    }

    #[tokio::test]
    async fn test_roles_follow_role_table() {
        let (users, roles) = stores();
        let tech = roles
            .create(
                NewRole {
                    name: "Technician".into(),
                    description: None,
                    permissions: vec![],
                    is_system: false,
                },
                None,
            )
            .await
            .unwrap();
        let user = users.create(dto("ana"), None).await.unwrap();

        let user = users
            .set_roles(user.id, &["Technician".into(), "Ghost".into()])
            .await
            .unwrap();
        assert_eq!(user.roles, vec!["Technician"]);

        roles.delete(tech.id, None).await.unwrap();
        let user = users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(user.roles.is_empty());
    }

    #[tokio::test]
    async fn test_login_failures_restart_outside_window() {
        let (users, _) = stores();
        let user = users.create(dto("ana"), None).await.unwrap();

        let window_start = Utc::now() - Duration::minutes(30);
        users.record_login_failure(user.id, window_start).await.unwrap();
        let user = users.record_login_failure(user.id, window_start).await.unwrap();
        assert_eq!(user.failed_login_count, 2);

        // A window starting in the future makes the last failure stale
        let user = users
            .record_login_failure(user.id, Utc::now() + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(user.failed_login_count, 1);

        users.record_login_success(user.id).await.unwrap();
        let user = users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.failed_login_count, 0);
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let (users, _) = stores();
        let user = users.create(dto("ana.ruiz"), None).await.unwrap();

        assert!(users.find_by_username("ANA.RUIZ").await.unwrap().is_some());
        assert!(users.find_by_email("Ana.Ruiz@FieldOps.test").await.unwrap().is_some());
        assert!(!users.is_username_unique("Ana.Ruiz", None).await.unwrap());
        assert!(users.is_username_unique("Ana.Ruiz", Some(user.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_matches_names() {
        let (users, _) = stores();
        users.create(dto("ana"), None).await.unwrap();
        let mut other = dto("bob");
        other.last_name = "Stone".into();
        users.create(other, None).await.unwrap();

        let result = users.search(Some("stone"), Pagination::default()).await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].username, "bob");
    }
}

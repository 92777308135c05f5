use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fo_core::traits::Id;
use fo_models::patch::apply;
use fo_models::{NewPermission, NewRole, Permission, Role, UpdateRole};
use parking_lot::RwLock;

use super::table::{slice, MemoryTable};
use crate::repository::{Repository, RepositoryError, RepositoryResult};
use crate::roles::RoleStore;

pub struct MemoryRoleStore {
    roles: Arc<MemoryTable<Role>>,
    permissions: RwLock<Vec<Permission>>,
    next_permission_id: AtomicI64,
}

impl MemoryRoleStore {
    /// The role table is shared with the user store, which resolves role
    /// names through it
    pub fn new(roles: Arc<MemoryTable<Role>>) -> Self {
        Self {
            roles,
            permissions: RwLock::new(Vec::new()),
            next_permission_id: AtomicI64::new(1),
        }
    }

    fn known_codes(&self, codes: &[String]) -> RepositoryResult<Vec<String>> {
        let permissions = self.permissions.read();
        if let Some(unknown) = codes
            .iter()
            .find(|code| !permissions.iter().any(|p| &p.code == *code))
        {
            return Err(RepositoryError::invalid(
                "permissions",
                &format!("unknown permission {}", unknown),
            ));
        }
        let mut codes = codes.to_vec();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}

#[async_trait]
impl Repository<Role, NewRole, UpdateRole> for MemoryRoleStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Role>> {
        Ok(self.roles.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Role>> {
        let mut roles = self.roles.all();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(slice(roles, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.roles.count())
    }

    async fn create(&self, dto: NewRole, actor: Option<Id>) -> RepositoryResult<Role> {
        let permissions = self.known_codes(&dto.permissions)?;
        let name = dto.name.clone();
        let now = Utc::now();
        self.roles
            .insert_unless(
                |r| r.name.eq_ignore_ascii_case(&name),
                |id| Role {
                    id,
                    name: dto.name,
                    description: dto.description,
                    is_system: dto.is_system,
                    permissions,
                    created_at: now,
                    updated_at: now,
                    created_by_id: actor,
                    updated_by_id: actor,
                    deleted_at: None,
                },
            )
            .ok_or_else(|| RepositoryError::Conflict(format!("Role {} already exists", name)))
    }

    async fn update(&self, id: Id, dto: UpdateRole, actor: Option<Id>) -> RepositoryResult<Role> {
        let permissions = dto
            .permissions
            .as_deref()
            .map(|codes| self.known_codes(codes))
            .transpose()?;
        self.roles.update(id, actor, |role| {
            if let Some(name) = dto.name {
                role.name = name;
            }
            apply(&mut role.description, dto.description);
            if let Some(permissions) = permissions {
                role.permissions = permissions;
            }
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.roles.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Role> {
        self.roles.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.roles.get(id).is_some())
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Role>> {
        Ok(self.roles.find(|r| r.name.eq_ignore_ascii_case(name)))
    }

    async fn is_name_unique(&self, name: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self
            .roles
            .any(|r| r.name.eq_ignore_ascii_case(name.trim()) && Some(r.id) != exclude_id))
    }

    async fn set_permissions(&self, role_id: Id, permissions: &[String]) -> RepositoryResult<Role> {
        let permissions = self.known_codes(permissions)?;
        self.roles.update(role_id, None, |role| role.permissions = permissions)
    }

    async fn list_permissions(&self) -> RepositoryResult<Vec<Permission>> {
        let mut permissions = self.permissions.read().clone();
        permissions.sort_by(|a, b| (&a.category, &a.code).cmp(&(&b.category, &b.code)));
        Ok(permissions)
    }

    async fn upsert_permission(&self, permission: NewPermission) -> RepositoryResult<Permission> {
        let mut permissions = self.permissions.write();
        if let Some(existing) = permissions.iter_mut().find(|p| p.code == permission.code) {
            existing.name = permission.name;
            existing.category = permission.category;
            return Ok(existing.clone());
        }
        let created = Permission {
            id: self.next_permission_id.fetch_add(1, Ordering::SeqCst),
            code: permission.code,
            name: permission.name,
            category: permission.category,
        };
        permissions.push(created.clone());
        Ok(created)
    }

    async fn permissions_for_roles(&self, roles: &[String]) -> RepositoryResult<Vec<String>> {
        let mut codes: Vec<String> = self
            .roles
            .filter(|r| roles.iter().any(|name| name == &r.name))
            .into_iter()
            .flat_map(|r| r.permissions)
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(code: &str) -> NewPermission {
        NewPermission {
            code: code.to_string(),
            name: code.to_string(),
            category: code.split('.').next().unwrap_or_default().to_string(),
        }
    }

    fn new_role(name: &str, permissions: &[&str]) -> NewRole {
        NewRole {
            name: name.to_string(),
            description: None,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            is_system: false,
        }
    }

    async fn store() -> MemoryRoleStore {
        let store = MemoryRoleStore::new(Arc::new(MemoryTable::new()));
        for code in ["work_orders.view", "work_orders.edit", "clients.view"] {
            store.upsert_permission(permission(code)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_permission() {
        let store = store().await;
        let err = store
            .create(new_role("Dispatcher", &["work_orders.view", "payroll.run"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(e) if e.has_error("permissions")));
    }

    #[tokio::test]
    async fn test_permissions_for_roles_merges_codes() {
        let store = store().await;
        store
            .create(new_role("Dispatcher", &["work_orders.view", "work_orders.edit"]), None)
            .await
            .unwrap();
        store
            .create(new_role("Sales", &["clients.view", "work_orders.view"]), None)
            .await
            .unwrap();

        let codes = store
            .permissions_for_roles(&["Dispatcher".into(), "Sales".into()])
            .await
            .unwrap();
        assert_eq!(codes, vec!["clients.view", "work_orders.edit", "work_orders.view"]);
    }

    #[tokio::test]
    async fn test_upsert_permission_is_idempotent() {
        let store = store().await;
        let again = store.upsert_permission(permission("clients.view")).await.unwrap();
        assert_eq!(store.list_permissions().await.unwrap().len(), 3);
        assert_eq!(again.category, "clients");
    }

    #[tokio::test]
    async fn test_name_uniqueness_ignores_case() {
        let store = store().await;
        let role = store.create(new_role("Dispatcher", &[]), None).await.unwrap();
        assert!(!store.is_name_unique("dispatcher", None).await.unwrap());
        assert!(store.is_name_unique("dispatcher", Some(role.id)).await.unwrap());
    }
}

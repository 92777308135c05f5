//! Roles and the permission catalog

use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::roles::{permissions, CreateRoleContract, DeleteRoleContract, UpdateRoleContract};
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{RoleStore, Stores};
use fo_models::{NewRole, Permission, Role, UpdateRole};
use tracing::{info, instrument};

use crate::base::{actor, clean, ensure_unique};

pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    activity: ActivityLogger,
}

impl RoleService {
    pub fn new(stores: &Stores, activity: ActivityLogger) -> Self {
        Self {
            roles: stores.roles.clone(),
            activity,
        }
    }

    pub async fn list(&self, user: &CurrentUser, pagination: Pagination) -> FoResult<PaginatedResult<Role>> {
        ensure_allowed(user, permissions::MANAGE)?;
        let items = self.roles.find_all(pagination.limit, pagination.offset).await?;
        let total = self.roles.count().await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<Role> {
        ensure_allowed(user, permissions::MANAGE)?;
        self.find(id).await
    }

    /// The permission catalog, grouped by category
    pub async fn permissions(&self, user: &CurrentUser) -> FoResult<Vec<Permission>> {
        ensure_allowed(user, permissions::MANAGE)?;
        let mut catalog = self.roles.list_permissions().await?;
        catalog.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.code.cmp(&b.code)));
        Ok(catalog)
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewRole) -> FoResult<Role> {
        input.name = input.name.trim().to_string();
        input.description = clean(input.description);
        input.is_system = false;
        input.permissions.sort();
        input.permissions.dedup();

        let known = self.known_codes().await?;
        CreateRoleContract::new(user, &known).check(&input)?;
        ensure_unique(self.roles.is_name_unique(&input.name, None).await?, "name")?;

        let role = self.roles.create(input, actor(user)).await?;
        info!(id = role.id, name = %role.name, "Role created");
        self.activity
            .created(actor(user), &role, format!("Role {} created", role.name))
            .await;
        Ok(role)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, id: Id, mut patch: UpdateRole) -> FoResult<Role> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        patch.name = patch.name.map(|n| n.trim().to_string());
        if let Some(codes) = patch.permissions.as_mut() {
            codes.sort();
            codes.dedup();
        }

        let known = self.known_codes().await?;
        UpdateRoleContract::new(user, &current, &known).check(&patch)?;
        if let Some(name) = &patch.name {
            ensure_unique(self.roles.is_name_unique(name, Some(id)).await?, "name")?;
        }

        let updated = self.roles.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    /// Built-in roles cannot be deleted
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        DeleteRoleContract::new(user).check(&current)?;

        self.roles.delete(id, actor(user)).await?;
        info!(id, name = %current.name, "Role deleted");
        self.activity
            .deleted(actor(user), &current, format!("Role {} deleted", current.name))
            .await;
        Ok(())
    }

    async fn find(&self, id: Id) -> FoResult<Role> {
        self.roles.find_by_id(id).await?.or_not_found("Role", id)
    }

    async fn known_codes(&self) -> FoResult<Vec<String>> {
        Ok(self
            .roles
            .list_permissions()
            .await?
            .into_iter()
            .map(|p| p.code)
            .collect())
    }
}

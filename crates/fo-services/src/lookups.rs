//! Reference data: leave types and statuses, departments, resource categories

use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::lookups::{permissions, LookupContract};
use fo_core::error::FoError;
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{EmployeeStore, LeaveStore, LookupStore, ResourceStore, Stores};
use fo_models::{leave_status, normalize_code, Lookup, LookupKind, NewLookup, UpdateLookup};
use tracing::{info, instrument};

use crate::base::{actor, ensure_unique, invalid_base};

/// Leave status codes the leave workflow resolves by code
const WORKFLOW_STATUSES: [&str; 4] = [
    leave_status::PENDING,
    leave_status::APPROVED,
    leave_status::REJECTED,
    leave_status::CANCELLED,
];

pub struct LookupService {
    lookups: Arc<dyn LookupStore>,
    leave: Arc<dyn LeaveStore>,
    employees: Arc<dyn EmployeeStore>,
    resources: Arc<dyn ResourceStore>,
    activity: ActivityLogger,
}

impl LookupService {
    pub fn new(stores: &Stores, activity: ActivityLogger) -> Self {
        Self {
            lookups: stores.lookups.clone(),
            leave: stores.leave.clone(),
            employees: stores.employees.clone(),
            resources: stores.resources.clone(),
            activity,
        }
    }

    /// Any signed-in user may read reference data; inactive entries are only
    /// listed for those who manage them
    pub async fn list(&self, user: &CurrentUser, kind: LookupKind, include_inactive: bool) -> FoResult<Vec<Lookup>> {
        let include_inactive = include_inactive && user.allowed(permissions::MANAGE);
        Ok(self.lookups.list(kind, include_inactive).await?)
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewLookup) -> FoResult<Lookup> {
        input.code = normalize_code(&input.code);
        input.name = input.name.trim().to_string();

        LookupContract::new(user).check(&input)?;
        ensure_unique(
            self.lookups.is_code_unique(input.kind, &input.code, None).await?,
            "code",
        )?;

        let lookup = self.lookups.create(input, actor(user)).await?;
        info!(id = lookup.id, kind = %lookup.kind, code = %lookup.code, "Lookup created");
        self.activity
            .created(actor(user), &lookup, format!("{} {} created", lookup.kind, lookup.code))
            .await;
        Ok(lookup)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, kind: LookupKind, id: Id, mut patch: UpdateLookup) -> FoResult<Lookup> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(kind, id).await?;
        patch.name = patch.name.map(|n| n.trim().to_string());

        LookupContract::new(user).check(&patch)?;
        let updated = self.lookups.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    /// A lookup still in use can only be deactivated
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, kind: LookupKind, id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(kind, id).await?;

        if kind == LookupKind::LeaveStatus && WORKFLOW_STATUSES.contains(&current.code.as_str()) {
            return Err(invalid_base(format!(
                "Leave status {} is required by the leave workflow",
                current.code
            )));
        }
        let references = self.references(&current).await?;
        if references > 0 {
            return Err(FoError::conflict(format!(
                "{} {} is used by {} record(s); deactivate it instead",
                current.kind, current.code, references
            )));
        }

        self.lookups.delete(id, actor(user)).await?;
        info!(id, kind = %kind, code = %current.code, "Lookup deleted");
        self.activity
            .deleted(actor(user), &current, format!("{} {} deleted", current.kind, current.code))
            .await;
        Ok(())
    }

    /// A lookup is addressed through its kind; a mismatch is a missing record
    async fn find(&self, kind: LookupKind, id: Id) -> FoResult<Lookup> {
        self.lookups
            .find_by_id(id)
            .await?
            .filter(|l| l.kind == kind)
            .or_not_found("Lookup", id)
    }

    async fn references(&self, lookup: &Lookup) -> FoResult<i64> {
        let count = match lookup.kind {
            LookupKind::LeaveType | LookupKind::LeaveStatus => self.leave.count_by_lookup(lookup.id).await?,
            LookupKind::Department => self.employees.count_in_department(lookup.id).await?,
            LookupKind::ResourceCategory => self.resources.count_in_category(lookup.id).await?,
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, new_employee, seeded_stores, user_with};

    fn service(stores: &Stores) -> LookupService {
        LookupService::new(stores, ActivityLogger::new(stores.activity.clone()))
    }

    fn department(code: &str) -> NewLookup {
        NewLookup {
            kind: LookupKind::Department,
            code: code.into(),
            name: "Field Engineering".into(),
            sort_order: 50,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_codes_are_unique_per_kind() {
        let stores = seeded_stores().await;
        let service = service(&stores);

        let created = service.create(&admin(), department(" eng ")).await.unwrap();
        assert_eq!(created.code, "ENG");
        assert!(service.create(&admin(), department("ENG")).await.is_err());

        let mut category = department("ENG");
        category.kind = LookupKind::ResourceCategory;
        service.create(&admin(), category).await.unwrap();
    }

    #[tokio::test]
    async fn test_inactive_entries_are_hidden_from_readers() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service.create(&admin(), department("ENG")).await.unwrap();
        let patch = UpdateLookup {
            is_active: Some(false),
            ..Default::default()
        };
        service
            .update(&admin(), LookupKind::Department, created.id, patch)
            .await
            .unwrap();

        let reader = user_with(3, &[]);
        let visible = service.list(&reader, LookupKind::Department, true).await.unwrap();
        assert!(visible.iter().all(|l| l.id != created.id));

        let all = service.list(&admin(), LookupKind::Department, true).await.unwrap();
        assert!(all.iter().any(|l| l.id == created.id));
    }

    #[tokio::test]
    async fn test_wrong_kind_is_not_found() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service.create(&admin(), department("ENG")).await.unwrap();

        let err = service
            .update(&admin(), LookupKind::LeaveType, created.id, UpdateLookup::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_readers_cannot_tell_which_ids_exist() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service.create(&admin(), department("ENG")).await.unwrap();
        let reader = user_with(3, &[]);

        for id in [created.id, 9_999] {
            let err = service
                .update(&reader, LookupKind::Department, id, UpdateLookup::default())
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 403);

            let err = service
                .delete(&reader, LookupKind::Department, id)
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 403);
        }
        assert!(stores.lookups.find_by_id(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_referenced_lookup_cannot_be_deleted() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let created = service.create(&admin(), department("ENG")).await.unwrap();

        let mut employee = new_employee("EMP-001");
        employee.department_id = Some(created.id);
        let employee = stores.employees.create(employee, None).await.unwrap();

        let err = service
            .delete(&admin(), LookupKind::Department, created.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);

        stores.employees.delete(employee.id, None).await.unwrap();
        service
            .delete(&admin(), LookupKind::Department, created.id)
            .await
            .unwrap();
        assert!(stores
            .lookups
            .find_by_code(LookupKind::Department, "ENG")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_workflow_statuses_are_kept() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let pending = stores
            .lookups
            .find_by_code(LookupKind::LeaveStatus, leave_status::PENDING)
            .await
            .unwrap()
            .unwrap();

        let err = service
            .delete(&admin(), LookupKind::LeaveStatus, pending.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }
}

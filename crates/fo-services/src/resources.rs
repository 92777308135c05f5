//! Resources and their bookings on work orders

use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::resources::{
    permissions, AssignResourceContract, CreateResourceContract, ResourceStatusContract, UpdateResourceContract,
};
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{LookupStore, ResourceStore, Stores, WorkOrderStore};
use fo_models::{
    normalize_code, LookupKind, NewResource, NewResourceAssignment, Resource, ResourceAssignment, ResourceFilter,
    ResourceStatus, UpdateResource, WorkOrder,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::base::{actor, clean, ensure_unique};

const ASSIGNMENT: &str = "ResourceAssignment";

pub struct ResourceService {
    resources: Arc<dyn ResourceStore>,
    work_orders: Arc<dyn WorkOrderStore>,
    lookups: Arc<dyn LookupStore>,
    activity: ActivityLogger,
}

impl ResourceService {
    pub fn new(stores: &Stores, activity: ActivityLogger) -> Self {
        Self {
            resources: stores.resources.clone(),
            work_orders: stores.work_orders.clone(),
            lookups: stores.lookups.clone(),
            activity,
        }
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        filter: &ResourceFilter,
        pagination: Pagination,
    ) -> FoResult<PaginatedResult<Resource>> {
        ensure_allowed(user, permissions::VIEW)?;
        Ok(self.resources.search(filter, pagination).await?)
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<Resource> {
        ensure_allowed(user, permissions::VIEW)?;
        self.find(id).await
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewResource) -> FoResult<Resource> {
        input.code = normalize_code(&input.code);
        input.name = input.name.trim().to_string();
        input.serial_number = clean(input.serial_number);
        input.location = clean(input.location);

        CreateResourceContract::new(user).check(&input)?;
        ensure_unique(self.resources.is_code_unique(&input.code, None).await?, "code")?;
        self.ensure_category(input.category_id).await?;

        let resource = self.resources.create(input, actor(user)).await?;
        info!(id = resource.id, code = %resource.code, "Resource created");
        self.activity
            .created(actor(user), &resource, format!("Resource {} created", resource.code))
            .await;
        Ok(resource)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, id: Id, mut patch: UpdateResource) -> FoResult<Resource> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        patch.code = patch.code.as_deref().map(normalize_code);
        patch.name = patch.name.map(|n| n.trim().to_string());

        UpdateResourceContract::new(user).check(&patch)?;
        if let Some(code) = &patch.code {
            ensure_unique(self.resources.is_code_unique(code, Some(id)).await?, "code")?;
        }
        self.ensure_category(patch.category_id.flatten()).await?;

        let updated = self.resources.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    /// Refused while the resource is booked on a work order
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        if let Some(assignment) = self.resources.active_assignment(id).await? {
            return Err(FoError::conflict(format!(
                "Resource {} is assigned to work order {}",
                current.code, assignment.work_order_id
            )));
        }

        self.resources.delete(id, actor(user)).await?;
        self.activity
            .deleted(actor(user), &current, format!("Resource {} deleted", current.code))
            .await;
        Ok(())
    }

    /// Manual status changes (maintenance, retirement, back to available)
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn set_status(&self, user: &CurrentUser, id: Id, status: ResourceStatus) -> FoResult<Resource> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        let assigned = self.resources.active_assignment(id).await?.is_some();
        ResourceStatusContract::new(user, &current, assigned).check(&status)?;

        let updated = self.resources.set_status(id, status, actor(user)).await?;
        info!(id, from = %current.status, to = %status, "Resource status changed");
        self.activity
            .changed(actor(user), "status_changed", &current, &updated)
            .await;
        Ok(updated)
    }

    pub async fn assignments_for_work_order(
        &self,
        user: &CurrentUser,
        work_order_id: Id,
    ) -> FoResult<Vec<ResourceAssignment>> {
        ensure_allowed(user, permissions::VIEW)?;
        self.find_work_order(work_order_id).await?;
        Ok(self.resources.assignments_for_work_order(work_order_id).await?)
    }

    /// Books an available resource; it becomes `in_use`
    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn assign_to_work_order(
        &self,
        user: &CurrentUser,
        work_order_id: Id,
        mut input: NewResourceAssignment,
    ) -> FoResult<ResourceAssignment> {
        input.work_order_id = work_order_id;
        input.notes = clean(input.notes);
        let work_order = self.find_work_order(work_order_id).await?;
        let resource = self
            .resources
            .find_by_id(input.resource_id)
            .await?
            .ok_or_else(|| FoError::invalid("resourceId", "does not exist"))?;
        AssignResourceContract::new(user, &resource, &work_order).check(&input)?;

        let assignment = self.resources.create_assignment(input, actor(user)).await?;
        info!(
            assignment_id = assignment.id,
            resource = %resource.code,
            work_order = %work_order.number,
            "Resource assigned"
        );
        self.activity
            .action(
                actor(user),
                "assigned",
                ASSIGNMENT,
                Some(assignment.id),
                format!("Resource {} assigned to {}", resource.code, work_order.number),
                Some(json!({ "resourceId": resource.id, "workOrderId": work_order.id })),
            )
            .await;
        Ok(assignment)
    }

    /// Ends an active booking; the resource becomes available again
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn release(&self, user: &CurrentUser, work_order_id: Id, assignment_id: Id) -> FoResult<ResourceAssignment> {
        ensure_allowed(user, permissions::MANAGE)?;
        let assignment = self
            .resources
            .find_assignment(assignment_id)
            .await?
            .filter(|a| a.work_order_id == work_order_id)
            .or_not_found(ASSIGNMENT, assignment_id)?;
        if !assignment.is_active() {
            return Err(FoError::conflict(format!(
                "Assignment {} was already released",
                assignment_id
            )));
        }

        let released = self.resources.release_assignment(assignment_id, actor(user)).await?;
        info!(assignment_id, resource_id = released.resource_id, "Resource released");
        self.activity
            .action(
                actor(user),
                "released",
                ASSIGNMENT,
                Some(released.id),
                format!("Resource {} released", released.resource_id),
                Some(json!({ "resourceId": released.resource_id, "workOrderId": work_order_id })),
            )
            .await;
        Ok(released)
    }

    async fn find(&self, id: Id) -> FoResult<Resource> {
        self.resources.find_by_id(id).await?.or_not_found("Resource", id)
    }

    async fn find_work_order(&self, id: Id) -> FoResult<WorkOrder> {
        self.work_orders.find_by_id(id).await?.or_not_found("WorkOrder", id)
    }

    async fn ensure_category(&self, category_id: Option<Id>) -> FoResult<()> {
        if let Some(category_id) = category_id {
            let category = self.lookups.find_by_id(category_id).await?;
            if !category.map_or(false, |c| c.kind == LookupKind::ResourceCategory) {
                return Err(FoError::invalid("categoryId", "is not a known resource category"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, create_client, seeded_stores, user_with};
    use fo_models::{NewWorkOrder, WorkOrderStatus};

    fn service(stores: &Stores) -> ResourceService {
        ResourceService::new(stores, ActivityLogger::new(stores.activity.clone()))
    }

    fn generator(code: &str) -> NewResource {
        NewResource {
            code: code.into(),
            name: " Generator 5kW ".into(),
            category_id: None,
            serial_number: Some("SN-0042".into()),
            location: Some("Depot North".into()),
            purchase_date: None,
            notes: None,
        }
    }

    async fn order(stores: &Stores, status: WorkOrderStatus) -> WorkOrder {
        let client = match stores.clients.search(None, None, Pagination::new(1, 0)).await.unwrap().items.pop() {
            Some(client) => client,
            None => create_client(stores, "ACME").await,
        };
        stores
            .work_orders
            .create(
                NewWorkOrder {
                    title: "Substation inspection".into(),
                    client_id: client.id,
                    status: Some(status),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap()
    }

    fn booking(resource_id: Id) -> NewResourceAssignment {
        NewResourceAssignment {
            resource_id,
            work_order_id: 0,
            notes: Some("Bring fuel".into()),
        }
    }

    #[tokio::test]
    async fn test_create_with_category() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let tools = stores
            .lookups
            .find_by_code(LookupKind::ResourceCategory, "EQUIPMENT")
            .await
            .unwrap()
            .unwrap();

        let mut input = generator("gen-01");
        input.category_id = Some(tools.id);
        let resource = service.create(&admin(), input).await.unwrap();
        assert_eq!(resource.code, "GEN-01");
        assert_eq!(resource.name, "Generator 5kW");
        assert_eq!(resource.status, ResourceStatus::Available);

        let err = service.create(&admin(), generator("GEN-01")).await.unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("code")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_assign_and_release() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let resource = service.create(&admin(), generator("GEN-01")).await.unwrap();
        let work_order = order(&stores, WorkOrderStatus::Open).await;

        let assignment = service
            .assign_to_work_order(&admin(), work_order.id, booking(resource.id))
            .await
            .unwrap();
        assert_eq!(assignment.work_order_id, work_order.id);
        assert_eq!(service.get(&admin(), resource.id).await.unwrap().status, ResourceStatus::InUse);

        // a resource in use cannot be booked twice
        let other = order(&stores, WorkOrderStatus::InProgress).await;
        let err = service
            .assign_to_work_order(&admin(), other.id, booking(resource.id))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);

        // nor deleted
        assert_eq!(service.delete(&admin(), resource.id).await.unwrap_err().status_code(), 409);

        let released = service.release(&admin(), work_order.id, assignment.id).await.unwrap();
        assert!(released.released_at.is_some());
        assert_eq!(
            service.get(&admin(), resource.id).await.unwrap().status,
            ResourceStatus::Available
        );
        assert_eq!(
            service.release(&admin(), work_order.id, assignment.id).await.unwrap_err().status_code(),
            409
        );

        let history = service
            .assignments_for_work_order(&admin(), work_order.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_work_order_takes_no_resources() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let resource = service.create(&admin(), generator("GEN-01")).await.unwrap();
        let draft = order(&stores, WorkOrderStatus::Draft).await;

        let err = service
            .assign_to_work_order(&admin(), draft.id, booking(resource.id))
            .await
            .unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("workOrderId")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_release_checks_the_work_order() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let resource = service.create(&admin(), generator("GEN-01")).await.unwrap();
        let work_order = order(&stores, WorkOrderStatus::Open).await;
        let assignment = service
            .assign_to_work_order(&admin(), work_order.id, booking(resource.id))
            .await
            .unwrap();

        let err = service
            .release(&admin(), work_order.id + 1, assignment.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_status_changes() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let resource = service.create(&admin(), generator("GEN-01")).await.unwrap();

        let maintenance = service
            .set_status(&admin(), resource.id, ResourceStatus::Maintenance)
            .await
            .unwrap();
        assert_eq!(maintenance.status, ResourceStatus::Maintenance);

        assert!(service
            .set_status(&admin(), resource.id, ResourceStatus::InUse)
            .await
            .is_err());

        service
            .set_status(&admin(), resource.id, ResourceStatus::Retired)
            .await
            .unwrap();
        assert!(service
            .set_status(&admin(), resource.id, ResourceStatus::Available)
            .await
            .is_err());

        let viewer = user_with(3, &[permissions::VIEW]);
        let err = service
            .set_status(&viewer, resource.id, ResourceStatus::Available)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}

//! Work order services
//!
//! Creating, editing and deleting orders lives here; status, progress and
//! assignment changes are in [`status`].

mod status;

use std::sync::Arc;

use chrono::Utc;
use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::work_orders::{
    permissions, CreateWorkOrderContract, DeleteWorkOrderContract, UpdateWorkOrderContract,
};
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination, SortParam};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{ClientStore, EmployeeStore, ResourceStore, Stores, UserStore, WorkOrderStore};
use fo_models::{NewNotification, NewWorkOrder, NotificationKind, UpdateWorkOrder, WorkOrder, WorkOrderFilter};
use fo_notifications::NotificationSink;
use tracing::{info, instrument};

use crate::base::{actor, clean, deliver_to_employee};

pub struct WorkOrderService {
    work_orders: Arc<dyn WorkOrderStore>,
    clients: Arc<dyn ClientStore>,
    employees: Arc<dyn EmployeeStore>,
    users: Arc<dyn UserStore>,
    resources: Arc<dyn ResourceStore>,
    activity: ActivityLogger,
    notifier: Arc<dyn NotificationSink>,
}

impl WorkOrderService {
    pub fn new(stores: &Stores, activity: ActivityLogger, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            work_orders: stores.work_orders.clone(),
            clients: stores.clients.clone(),
            employees: stores.employees.clone(),
            users: stores.users.clone(),
            resources: stores.resources.clone(),
            activity,
            notifier,
        }
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<WorkOrder> {
        ensure_allowed(user, permissions::VIEW)?;
        self.find(id).await
    }

    pub async fn search(
        &self,
        user: &CurrentUser,
        filter: &WorkOrderFilter,
        sorts: &[SortParam],
        pagination: Pagination,
    ) -> FoResult<PaginatedResult<WorkOrder>> {
        ensure_allowed(user, permissions::VIEW)?;
        let today = Utc::now().date_naive();
        Ok(self.work_orders.search(filter, sorts, today, pagination).await?)
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewWorkOrder) -> FoResult<WorkOrder> {
        input.title = input.title.trim().to_string();
        input.description = clean(input.description);
        input.location = clean(input.location);

        CreateWorkOrderContract::new(user).check(&input)?;
        self.ensure_client(input.client_id).await?;
        if let Some(employee_id) = input.assigned_employee_id {
            self.ensure_assignable(employee_id).await?;
        }

        let work_order = self.work_orders.create(input, actor(user)).await?;
        info!(id = work_order.id, number = %work_order.number, "Work order created");
        self.activity
            .created(actor(user), &work_order, format!("Work order {} created", work_order.number))
            .await;

        if let Some(employee_id) = work_order.assigned_employee_id {
            self.notify_assignee(user, &work_order, employee_id).await;
        }
        Ok(work_order)
    }

    /// Applies the patch when `lock_version` matches the stored order
    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, id: Id, mut patch: UpdateWorkOrder) -> FoResult<WorkOrder> {
        let current = self.find(id).await?;
        patch.title = patch.title.map(|t| t.trim().to_string());

        UpdateWorkOrderContract::new(user, &current).check(&patch)?;
        if let Some(client_id) = patch.client_id.filter(|c| *c != current.client_id) {
            self.ensure_client(client_id).await?;
        }

        let updated = self.work_orders.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    /// Soft delete; active resource bookings are released first
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        let current = self.find(id).await?;
        DeleteWorkOrderContract::new(user).check(&current)?;

        self.resources.release_for_work_order(id, actor(user)).await?;
        self.work_orders.delete(id, actor(user)).await?;
        info!(id, number = %current.number, "Work order deleted");
        self.activity
            .deleted(actor(user), &current, format!("Work order {} deleted", current.number))
            .await;
        Ok(())
    }

    async fn find(&self, id: Id) -> FoResult<WorkOrder> {
        self.work_orders.find_by_id(id).await?.or_not_found("WorkOrder", id)
    }

    async fn ensure_client(&self, client_id: Id) -> FoResult<()> {
        if self.clients.exists(client_id).await? {
            Ok(())
        } else {
            Err(FoError::invalid("clientId", "does not exist"))
        }
    }

    /// The employee exists and is not terminated
    async fn ensure_assignable(&self, employee_id: Id) -> FoResult<()> {
        match self.employees.find_by_id(employee_id).await? {
            None => Err(FoError::invalid("assignedEmployeeId", "does not exist")),
            Some(employee) if employee.is_terminated() => Err(FoError::invalid(
                "assignedEmployeeId",
                format!("{} is no longer employed", employee.full_name()),
            )),
            Some(_) => Ok(()),
        }
    }

    async fn notify_assignee(&self, user: &CurrentUser, work_order: &WorkOrder, employee_id: Id) {
        deliver_to_employee(self.users.as_ref(), self.notifier.as_ref(), employee_id, user, |recipient_id| {
            NewNotification {
                recipient_id,
                kind: NotificationKind::WorkOrderAssigned,
                title: format!("Work order {} assigned to you", work_order.number),
                message: work_order.title.clone(),
                link: Some(format!("/work-orders/{}", work_order.id)),
            }
        })
        .await;
    }
}

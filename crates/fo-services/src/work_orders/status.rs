//! Status transitions, progress reports and assignment

use chrono::Utc;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::work_orders::{permissions, ChangeStatusContract, ProgressContract};
use fo_core::result::FoResult;
use fo_core::traits::Id;
use fo_db::StatusChange;
use fo_models::{NewNotification, NotificationKind, WorkOrder, WorkOrderStatus};
use tracing::{info, instrument};

use super::WorkOrderService;
use crate::base::{actor, deliver_to_employee, invalid_base};

impl WorkOrderService {
    /// Moves the order along the transition table. Completing sets the
    /// progress to 100 and stamps `completed_at`; completing or cancelling
    /// releases every booked resource; reopening clears `completed_at`.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn change_status(&self, user: &CurrentUser, id: Id, target: WorkOrderStatus) -> FoResult<WorkOrder> {
        let current = self.find(id).await?;
        ChangeStatusContract::new(user, &current).check(&target)?;

        let change = match target {
            WorkOrderStatus::Completed => StatusChange {
                status: target,
                completed_at: Some(Utc::now()),
                completion_percentage: Some(100),
            },
            _ => StatusChange {
                status: target,
                completed_at: None,
                completion_percentage: None,
            },
        };

        let updated = self.work_orders.set_status(id, change, actor(user)).await?;
        if target.is_closed() {
            let released = self.resources.release_for_work_order(id, actor(user)).await?;
            if !released.is_empty() {
                info!(id, count = released.len(), "Resources released");
            }
        }

        info!(id, from = %current.status, to = %target, "Work order status changed");
        self.activity.changed(actor(user), "status_changed", &current, &updated).await;

        if let Some(employee_id) = updated.assigned_employee_id {
            deliver_to_employee(self.users.as_ref(), self.notifier.as_ref(), employee_id, user, |recipient_id| {
                NewNotification {
                    recipient_id,
                    kind: NotificationKind::WorkOrderStatusChanged,
                    title: format!("Work order {} is now {}", updated.number, updated.status),
                    message: updated.title.clone(),
                    link: Some(format!("/work-orders/{}", updated.id)),
                }
            })
            .await;
        }
        Ok(updated)
    }

    /// Reaching 100% does not complete the order
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn update_progress(&self, user: &CurrentUser, id: Id, percentage: i32) -> FoResult<WorkOrder> {
        let current = self.find(id).await?;
        ProgressContract::new(user, &current).check(&percentage)?;

        let updated = self.work_orders.set_progress(id, percentage, actor(user)).await?;
        self.activity
            .changed(actor(user), "progress_updated", &current, &updated)
            .await;
        Ok(updated)
    }

    /// `None` unassigns. The new assignee is told through their account.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn assign(&self, user: &CurrentUser, id: Id, employee_id: Option<Id>) -> FoResult<WorkOrder> {
        ensure_allowed(user, permissions::EDIT)?;
        let current = self.find(id).await?;
        if current.status.is_closed() {
            return Err(invalid_base(format!(
                "A {} work order cannot be reassigned",
                current.status
            )));
        }
        if let Some(employee_id) = employee_id {
            self.ensure_assignable(employee_id).await?;
        }

        let updated = self.work_orders.set_assignee(id, employee_id, actor(user)).await?;
        self.activity.changed(actor(user), "assigned", &current, &updated).await;

        if let Some(employee_id) = employee_id.filter(|e| current.assigned_employee_id != Some(*e)) {
            self.notify_assignee(user, &updated, employee_id).await;
        }
        Ok(updated)
    }
}

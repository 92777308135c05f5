//! Dashboard summary

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use fo_auth::CurrentUser;
use fo_core::error::FoError;
use fo_core::result::FoResult;
use fo_db::{EmployeeStore, ResourceStore, Stores, WorkOrderStore};
use fo_models::{EmploymentStatus, ResourceStatus, WorkOrderStatus};
use fo_notifications::NotificationStore;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Every status is present, zero included
    pub work_orders_by_status: BTreeMap<String, i64>,
    pub overdue_work_orders: i64,
    /// Mean completion percentage of open, in progress and on hold orders
    pub average_completion: Option<f64>,
    pub employees_on_leave: i64,
    pub resources_by_status: BTreeMap<String, i64>,
    pub unread_notifications: i64,
}

pub struct DashboardService {
    work_orders: Arc<dyn WorkOrderStore>,
    employees: Arc<dyn EmployeeStore>,
    resources: Arc<dyn ResourceStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl DashboardService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            work_orders: stores.work_orders.clone(),
            employees: stores.employees.clone(),
            resources: stores.resources.clone(),
            notifications: stores.notifications.clone(),
        }
    }

    pub async fn summary(&self, user: &CurrentUser) -> FoResult<DashboardSummary> {
        let today = Utc::now().date_naive();
        let (work_orders, overdue, average, on_leave, resources, unread) = tokio::try_join!(
            async { Ok::<_, FoError>(self.work_orders.status_counts().await?) },
            async { Ok::<_, FoError>(self.work_orders.count_overdue(today).await?) },
            async { Ok::<_, FoError>(self.work_orders.average_active_completion().await?) },
            async { Ok::<_, FoError>(self.employees.count_by_status(EmploymentStatus::OnLeave).await?) },
            async { Ok::<_, FoError>(self.resources.status_counts().await?) },
            async { Ok::<_, FoError>(self.notifications.unread_count(user.id).await?) },
        )?;

        let mut work_orders_by_status: BTreeMap<String, i64> =
            WorkOrderStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
        for (status, count) in work_orders {
            work_orders_by_status.insert(status.to_string(), count);
        }
        let mut resources_by_status: BTreeMap<String, i64> =
            ResourceStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
        for (status, count) in resources {
            resources_by_status.insert(status.to_string(), count);
        }

        Ok(DashboardSummary {
            work_orders_by_status,
            overdue_work_orders: overdue,
            average_completion: average.map(|a| (a * 10.0).round() / 10.0),
            employees_on_leave: on_leave,
            resources_by_status,
            unread_notifications: unread,
        })
    }
}

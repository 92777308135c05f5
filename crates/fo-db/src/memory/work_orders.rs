use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use fo_core::pagination::{PaginatedResult, Pagination, SortDirection, SortParam};
use fo_core::traits::Id;
use fo_models::patch::apply;
use fo_models::{NewWorkOrder, UpdateWorkOrder, WorkOrder, WorkOrderFilter, WorkOrderStatus};
use parking_lot::Mutex;

use super::table::{contains_ci, search_term, slice, MemoryTable};
use crate::repository::{Repository, RepositoryError, RepositoryResult};
use crate::work_orders::{StatusChange, WorkOrderStore, ACTIVE_STATUSES, SORT_COLUMNS};

#[derive(Default)]
pub struct MemoryWorkOrderStore {
    orders: MemoryTable<WorkOrder>,
    sequences: Mutex<HashMap<i32, i64>>,
}

impl MemoryWorkOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_number(&self, year: i32) -> String {
        let mut sequences = self.sequences.lock();
        let value = sequences.entry(year).or_insert(0);
        *value += 1;
        WorkOrder::format_number(year, *value)
    }

    fn matches(filter: &WorkOrderFilter, today: NaiveDate, order: &WorkOrder) -> bool {
        filter.status.map_or(true, |s| order.status == s)
            && filter.client_id.map_or(true, |id| order.client_id == id)
            && filter
                .assigned_employee_id
                .map_or(true, |id| order.assigned_employee_id == Some(id))
            && filter.priority.map_or(true, |p| order.priority == p)
            && (filter.overdue != Some(true) || order.is_overdue(today))
            && search_term(filter.q.as_deref()).map_or(true, |t| {
                contains_ci(&order.number, t)
                    || contains_ci(&order.title, t)
                    || order.location.as_deref().map_or(false, |l| contains_ci(l, t))
            })
    }

    /// Same ordering the SQL column sort gives; NULLs sort last ascending
    fn compare_field(field: &str, a: &WorkOrder, b: &WorkOrder) -> Ordering {
        fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
            match (a, b) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        match field {
            "number" => a.number.cmp(&b.number),
            "title" => a.title.cmp(&b.title),
            "status" => a.status.as_str().cmp(b.status.as_str()),
            "priority" => a.priority.as_str().cmp(b.priority.as_str()),
            "dueDate" => nulls_last(&a.due_date, &b.due_date),
            "startDate" => nulls_last(&a.start_date, &b.start_date),
            "completionPercentage" => a.completion_percentage.cmp(&b.completion_percentage),
            "createdAt" => a.created_at.cmp(&b.created_at),
            "updatedAt" => a.updated_at.cmp(&b.updated_at),
            _ => Ordering::Equal,
        }
    }

    fn sort(orders: &mut [WorkOrder], sorts: &[SortParam]) {
        let sorts: Vec<&SortParam> = sorts
            .iter()
            .filter(|s| SORT_COLUMNS.iter().any(|(field, _)| *field == s.field))
            .collect();
        orders.sort_by(|a, b| {
            sorts
                .iter()
                .map(|s| {
                    let ordering = Self::compare_field(&s.field, a, b);
                    match s.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| b.id.cmp(&a.id))
        });
    }
}

#[async_trait]
impl Repository<WorkOrder, NewWorkOrder, UpdateWorkOrder> for MemoryWorkOrderStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<WorkOrder>> {
        Ok(self.orders.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<WorkOrder>> {
        let mut orders = self.orders.all();
        orders.reverse();
        Ok(slice(orders, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.orders.count())
    }

    async fn create(&self, dto: NewWorkOrder, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let now = Utc::now();
        let work_order = self.orders.insert(WorkOrder {
            id: self.orders.next_id(),
            number: self.next_number(now.year()),
            title: dto.title,
            description: dto.description,
            client_id: dto.client_id,
            location: dto.location,
            status: dto.status.unwrap_or_default(),
            priority: dto.priority.unwrap_or_default(),
            completion_percentage: 0,
            start_date: dto.start_date,
            due_date: dto.due_date,
            completed_at: None,
            assigned_employee_id: dto.assigned_employee_id,
            lock_version: 0,
            created_at: now,
            updated_at: now,
            created_by_id: actor,
            updated_by_id: actor,
            deleted_at: None,
        });
        Ok(work_order)
    }

    async fn update(&self, id: Id, dto: UpdateWorkOrder, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        let expected = dto.lock_version;
        let stale = |current: &WorkOrder| {
            if current.lock_version == expected {
                Ok(())
            } else {
                Err(RepositoryError::Conflict(format!(
                    "Work order {} was changed by someone else",
                    id
                )))
            }
        };
        self.orders.update_checked(id, actor, stale, |order| {
            if let Some(title) = dto.title {
                order.title = title;
            }
            apply(&mut order.description, dto.description);
            if let Some(client_id) = dto.client_id {
                order.client_id = client_id;
            }
            apply(&mut order.location, dto.location);
            if let Some(priority) = dto.priority {
                order.priority = priority;
            }
            apply(&mut order.start_date, dto.start_date);
            apply(&mut order.due_date, dto.due_date);
            order.lock_version += 1;
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.orders.update(id, actor, |order| order.lock_version += 1)?;
        self.orders.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        self.orders.restore(id, actor)?;
        self.orders.update(id, actor, |order| order.lock_version += 1)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.orders.get(id).is_some())
    }
}

#[async_trait]
impl WorkOrderStore for MemoryWorkOrderStore {
    async fn search(
        &self,
        filter: &WorkOrderFilter,
        sorts: &[SortParam],
        today: NaiveDate,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<WorkOrder>> {
        let mut orders = self.orders.filter(|o| Self::matches(filter, today, o));
        Self::sort(&mut orders, sorts);
        let total = orders.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(orders), total, pagination))
    }

    async fn set_status(&self, id: Id, change: StatusChange, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        self.orders.update(id, actor, |order| {
            order.status = change.status;
            order.completed_at = change.completed_at;
            if let Some(percentage) = change.completion_percentage {
                order.completion_percentage = percentage;
            }
            order.lock_version += 1;
        })
    }

    async fn set_progress(&self, id: Id, percentage: i32, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        self.orders.update(id, actor, |order| {
            order.completion_percentage = percentage;
            order.lock_version += 1;
        })
    }

    async fn set_assignee(&self, id: Id, employee_id: Option<Id>, actor: Option<Id>) -> RepositoryResult<WorkOrder> {
        self.orders.update(id, actor, |order| {
            order.assigned_employee_id = employee_id;
            order.lock_version += 1;
        })
    }

    async fn status_counts(&self) -> RepositoryResult<Vec<(WorkOrderStatus, i64)>> {
        Ok(WorkOrderStatus::ALL
            .iter()
            .map(|status| (*status, self.orders.count_where(|o| o.status == *status)))
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn count_overdue(&self, today: NaiveDate) -> RepositoryResult<i64> {
        Ok(self.orders.count_where(|o| o.is_overdue(today)))
    }

    async fn average_active_completion(&self) -> RepositoryResult<Option<f64>> {
        let values: Vec<i32> = self
            .orders
            .filter(|o| o.status.is_active())
            .into_iter()
            .map(|o| o.completion_percentage)
            .collect();
        if values.is_empty() {
            return Ok(None);
        }
        let sum: i64 = values.iter().map(|v| i64::from(*v)).sum();
        Ok(Some(sum as f64 / values.len() as f64))
    }

    async fn count_active_for_client(&self, client_id: Id) -> RepositoryResult<i64> {
        Ok(self
            .orders
            .count_where(|o| o.client_id == client_id && ACTIVE_STATUSES.contains(&o.status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fo_models::WorkOrderPriority;

    fn new_order(title: &str) -> NewWorkOrder {
        NewWorkOrder {
            title: title.to_string(),
            client_id: 1,
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn test_numbers_are_sequential_per_year() {
        let store = MemoryWorkOrderStore::new();
        let first = store.create(new_order("Pump"), None).await.unwrap();
        let second = store.create(new_order("Valve"), None).await.unwrap();

        let year = Utc::now().year();
        assert_eq!(first.number, format!("WO-{}-00001", year));
        assert_eq!(second.number, format!("WO-{}-00002", year));
        assert_eq!(first.status, WorkOrderStatus::Draft);
        assert_eq!(first.priority, WorkOrderPriority::Normal);
    }

    #[tokio::test]
    async fn test_stale_lock_version_conflicts() {
        let store = MemoryWorkOrderStore::new();
        let order = store.create(new_order("Pump"), None).await.unwrap();

        let update = UpdateWorkOrder {
            title: Some("Pump repair".into()),
            lock_version: order.lock_version,
            ..Default::default()
        };
        let updated = store.update(order.id, update.clone(), Some(2)).await.unwrap();
        assert_eq!(updated.lock_version, order.lock_version + 1);

        let err = store.update(order.id, update, Some(2)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(matches!(
            store.update(404, UpdateWorkOrder::default(), None).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_filters_and_sorts() {
        let store = MemoryWorkOrderStore::new();
        let late = store
            .create(
                NewWorkOrder {
                    due_date: NaiveDate::from_ymd_opt(2024, 6, 1),
                    status: Some(WorkOrderStatus::Open),
                    ..new_order("Late boiler")
                },
                None,
            )
            .await
            .unwrap();
        store
            .create(
                NewWorkOrder {
                    due_date: NaiveDate::from_ymd_opt(2024, 7, 1),
                    ..new_order("Future boiler")
                },
                None,
            )
            .await
            .unwrap();
        store.create(new_order("Roof"), None).await.unwrap();

        let overdue = WorkOrderFilter {
            overdue: Some(true),
            ..Default::default()
        };
        let result = store
            .search(&overdue, &[], today(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].id, late.id);

        let boilers = WorkOrderFilter {
            q: Some("BOILER".into()),
            ..Default::default()
        };
        let sorts = SortParam::parse("dueDate:desc");
        let result = store
            .search(&boilers, &sorts, today(), Pagination::default())
            .await
            .unwrap();
        let titles: Vec<_> = result.items.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["Future boiler", "Late boiler"]);
    }

    #[tokio::test]
    async fn test_dashboard_aggregates() {
        let store = MemoryWorkOrderStore::new();
        let a = store.create(new_order("A"), None).await.unwrap();
        let b = store.create(new_order("B"), None).await.unwrap();
        store.create(new_order("C"), None).await.unwrap();

        for (id, pct) in [(a.id, 40), (b.id, 80)] {
            store
                .set_status(
                    id,
                    StatusChange {
                        status: WorkOrderStatus::InProgress,
                        completed_at: None,
                        completion_percentage: Some(pct),
                    },
                    None,
                )
                .await
                .unwrap();
        }

        assert_eq!(store.average_active_completion().await.unwrap(), Some(60.0));
        let counts = store.status_counts().await.unwrap();
        assert!(counts.contains(&(WorkOrderStatus::InProgress, 2)));
        assert!(counts.contains(&(WorkOrderStatus::Draft, 1)));
        assert_eq!(store.count_active_for_client(1).await.unwrap(), 3);
    }
}

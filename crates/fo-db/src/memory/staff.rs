use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_core::types::DateRange;
use fo_models::patch::apply;
use fo_models::{
    Employee, EmployeeFilter, EmploymentStatus, LeaveFilter, LeaveRequest, NewEmployee, UpdateEmployee,
};

use super::table::{contains_ci, search_term, slice, MemoryTable};
use crate::employees::EmployeeStore;
use crate::leave::{LeaveStatusChange, LeaveStore, NewLeaveRecord};
use crate::repository::{Repository, RepositoryError, RepositoryResult};

fn by_name(a: &Employee, b: &Employee) -> std::cmp::Ordering {
    (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
}

#[derive(Default)]
pub struct MemoryEmployeeStore {
    employees: MemoryTable<Employee>,
}

impl MemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<Employee, NewEmployee, UpdateEmployee> for MemoryEmployeeStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Employee>> {
        Ok(self.employees.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Employee>> {
        let mut employees = self.employees.all();
        employees.sort_by(by_name);
        Ok(slice(employees, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.employees.count())
    }

    async fn create(&self, dto: NewEmployee, actor: Option<Id>) -> RepositoryResult<Employee> {
        let number = dto.employee_number.clone();
        let now = Utc::now();
        self.employees
            .insert_unless(
                |e| e.employee_number == number,
                |id| Employee {
                    id,
                    employee_number: dto.employee_number,
                    first_name: dto.first_name,
                    last_name: dto.last_name,
                    email: dto.email,
                    phone: dto.phone,
                    job_title: dto.job_title,
                    department_id: dto.department_id,
                    manager_id: dto.manager_id,
                    hire_date: dto.hire_date,
                    termination_date: None,
                    status: EmploymentStatus::Active,
                    created_at: now,
                    updated_at: now,
                    created_by_id: actor,
                    updated_by_id: actor,
                    deleted_at: None,
                },
            )
            .ok_or_else(|| RepositoryError::Conflict(format!("Employee number {} is taken", number)))
    }

    async fn update(&self, id: Id, dto: UpdateEmployee, actor: Option<Id>) -> RepositoryResult<Employee> {
        self.employees.update(id, actor, |employee| {
            if let Some(first_name) = dto.first_name {
                employee.first_name = first_name;
            }
            if let Some(last_name) = dto.last_name {
                employee.last_name = last_name;
            }
            if let Some(email) = dto.email {
                employee.email = email;
            }
            apply(&mut employee.phone, dto.phone);
            apply(&mut employee.job_title, dto.job_title);
            apply(&mut employee.department_id, dto.department_id);
            apply(&mut employee.manager_id, dto.manager_id);
            if let Some(hire_date) = dto.hire_date {
                employee.hire_date = hire_date;
            }
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.employees.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Employee> {
        self.employees.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.employees.get(id).is_some())
    }
}

#[async_trait]
impl EmployeeStore for MemoryEmployeeStore {
    async fn is_number_unique(&self, number: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self
            .employees
            .any(|e| e.employee_number == number && Some(e.id) != exclude_id))
    }

    async fn is_email_unique(&self, email: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self
            .employees
            .any(|e| e.email.eq_ignore_ascii_case(email) && Some(e.id) != exclude_id))
    }

    async fn search(&self, filter: &EmployeeFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<Employee>> {
        let term = search_term(filter.q.as_deref());
        let mut employees = self.employees.filter(|e| {
            filter.status.map_or(true, |s| e.status == s)
                && filter.department_id.map_or(true, |d| e.department_id == Some(d))
                && term.map_or(true, |t| {
                    contains_ci(&e.employee_number, t)
                        || contains_ci(&e.first_name, t)
                        || contains_ci(&e.last_name, t)
                        || contains_ci(&e.email, t)
                })
        });
        employees.sort_by(by_name);
        let total = employees.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(employees), total, pagination))
    }

    async fn terminate(&self, id: Id, termination_date: NaiveDate, actor: Option<Id>) -> RepositoryResult<Employee> {
        self.employees.update(id, actor, |employee| {
            employee.status = EmploymentStatus::Terminated;
            employee.termination_date = Some(termination_date);
        })
    }

    async fn set_status(&self, id: Id, status: EmploymentStatus, actor: Option<Id>) -> RepositoryResult<Employee> {
        self.employees.update(id, actor, |employee| employee.status = status)
    }

    async fn count_by_status(&self, status: EmploymentStatus) -> RepositoryResult<i64> {
        Ok(self.employees.count_where(|e| e.status == status))
    }

    async fn count_in_department(&self, department_id: Id) -> RepositoryResult<i64> {
        Ok(self.employees.count_where(|e| e.department_id == Some(department_id)))
    }
}

fn newest_first(a: &LeaveRequest, b: &LeaveRequest) -> std::cmp::Ordering {
    (b.start_date, b.id).cmp(&(a.start_date, a.id))
}

#[derive(Default)]
pub struct MemoryLeaveStore {
    requests: MemoryTable<LeaveRequest>,
}

impl MemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<LeaveRequest, NewLeaveRecord, LeaveStatusChange> for MemoryLeaveStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<LeaveRequest>> {
        Ok(self.requests.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<LeaveRequest>> {
        let mut requests = self.requests.all();
        requests.sort_by(newest_first);
        Ok(slice(requests, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.requests.count())
    }

    async fn create(&self, dto: NewLeaveRecord, actor: Option<Id>) -> RepositoryResult<LeaveRequest> {
        if dto.end_date < dto.start_date {
            return Err(RepositoryError::invalid("endDate", "must not be before the start date"));
        }
        let now = Utc::now();
        Ok(self.requests.insert(LeaveRequest {
            id: self.requests.next_id(),
            employee_id: dto.employee_id,
            leave_type_id: dto.leave_type_id,
            status_id: dto.status_id,
            start_date: dto.start_date,
            end_date: dto.end_date,
            days: dto.days,
            reason: dto.reason,
            reviewed_by_id: None,
            reviewed_at: None,
            review_comment: None,
            created_at: now,
            updated_at: now,
            created_by_id: actor,
            updated_by_id: actor,
            deleted_at: None,
        }))
    }

    async fn update(&self, id: Id, dto: LeaveStatusChange, actor: Option<Id>) -> RepositoryResult<LeaveRequest> {
        let now = Utc::now();
        let expected = dto.from_status_id;
        let still_expected = |request: &LeaveRequest| match expected {
            Some(status_id) if request.status_id != status_id => Err(RepositoryError::Conflict(format!(
                "Leave request {} is no longer pending",
                id
            ))),
            _ => Ok(()),
        };
        self.requests.update_checked(id, actor, still_expected, |request| {
            request.status_id = dto.status_id;
            if let Some(reviewer) = dto.reviewed_by_id {
                request.reviewed_by_id = Some(reviewer);
                request.reviewed_at = Some(now);
            }
            if let Some(comment) = dto.review_comment {
                request.review_comment = Some(comment);
            }
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.requests.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<LeaveRequest> {
        self.requests.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.requests.get(id).is_some())
    }
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn search(&self, filter: &LeaveFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<LeaveRequest>> {
        let mut requests = self.requests.filter(|r| {
            filter.employee_id.map_or(true, |id| r.employee_id == id)
                && filter.status_id.map_or(true, |id| r.status_id == id)
        });
        requests.sort_by(newest_first);
        let total = requests.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(requests), total, pagination))
    }

    async fn find_by_employee(&self, employee_id: Id) -> RepositoryResult<Vec<LeaveRequest>> {
        let mut requests = self.requests.filter(|r| r.employee_id == employee_id);
        requests.sort_by(newest_first);
        Ok(requests)
    }

    async fn has_overlap(
        &self,
        employee_id: Id,
        range: &DateRange,
        status_ids: &[Id],
        exclude_id: Option<Id>,
    ) -> RepositoryResult<bool> {
        Ok(self.requests.any(|r| {
            r.employee_id == employee_id
                && status_ids.contains(&r.status_id)
                && Some(r.id) != exclude_id
                && r.range().overlaps(range)
        }))
    }

    async fn count_by_lookup(&self, lookup_id: Id) -> RepositoryResult<i64> {
        Ok(self
            .requests
            .count_where(|r| r.leave_type_id == lookup_id || r.status_id == lookup_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PENDING: Id = 10;
    const APPROVED: Id = 11;
    const REJECTED: Id = 12;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn record(start: NaiveDate, end: NaiveDate, status_id: Id) -> NewLeaveRecord {
        NewLeaveRecord {
            employee_id: 1,
            leave_type_id: 5,
            status_id,
            start_date: start,
            end_date: end,
            days: 1,
            reason: None,
        }
    }

    fn employee(number: &str, last_name: &str) -> NewEmployee {
        NewEmployee {
            employee_number: number.to_string(),
            first_name: "Sam".into(),
            last_name: last_name.to_string(),
            email: format!("{}@fieldops.test", number.to_lowercase()),
            phone: None,
            job_title: None,
            department_id: Some(3),
            manager_id: None,
            hire_date: date(1, 8),
        }
    }

    #[tokio::test]
    async fn test_overlap_respects_status_and_exclusion() {
        let store = MemoryLeaveStore::new();
        let approved = store.create(record(date(3, 4), date(3, 8), APPROVED), None).await.unwrap();
        store.create(record(date(3, 11), date(3, 15), REJECTED), None).await.unwrap();

        let active = [PENDING, APPROVED];
        let window = DateRange::new(date(3, 8), date(3, 12)).unwrap();
        assert!(store.has_overlap(1, &window, &active, None).await.unwrap());
        assert!(!store.has_overlap(1, &window, &active, Some(approved.id)).await.unwrap());
        assert!(!store.has_overlap(2, &window, &active, None).await.unwrap());

        let after = DateRange::new(date(3, 9), date(3, 15)).unwrap();
        assert!(!store.has_overlap(1, &after, &active, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_review_stamps_reviewer() {
        let store = MemoryLeaveStore::new();
        let request = store.create(record(date(3, 4), date(3, 8), PENDING), Some(4)).await.unwrap();

        let reviewed = store
            .review(request.id, PENDING, APPROVED, 9, Some("Enjoy".into()))
            .await
            .unwrap();
        assert_eq!(reviewed.status_id, APPROVED);
        assert_eq!(reviewed.reviewed_by_id, Some(9));
        assert!(reviewed.reviewed_at.is_some());
        assert_eq!(store.count_by_lookup(APPROVED).await.unwrap(), 1);
        assert_eq!(store.count_by_lookup(5).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_review_conflicts() {
        let store = MemoryLeaveStore::new();
        let request = store.create(record(date(3, 4), date(3, 8), PENDING), Some(4)).await.unwrap();

        store.review(request.id, PENDING, APPROVED, 9, None).await.unwrap();
        let err = store
            .review(request.id, PENDING, REJECTED, 10, Some("Too late".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let current = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(current.status_id, APPROVED);
        assert_eq!(current.reviewed_by_id, Some(9));
        assert!(current.review_comment.is_none());

        assert!(matches!(
            store.review(404, PENDING, APPROVED, 9, None).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_employee_search_and_terminate() {
        let store = MemoryEmployeeStore::new();
        let zed = store.create(employee("E-002", "Zed"), None).await.unwrap();
        store.create(employee("E-001", "Adams"), None).await.unwrap();

        let all = store.search(&EmployeeFilter::default(), Pagination::default()).await.unwrap();
        let names: Vec<_> = all.items.iter().map(|e| e.last_name.as_str()).collect();
        assert_eq!(names, vec!["Adams", "Zed"]);

        let terminated = store.terminate(zed.id, date(6, 30), None).await.unwrap();
        assert_eq!(terminated.status, EmploymentStatus::Terminated);
        assert_eq!(store.count_by_status(EmploymentStatus::Active).await.unwrap(), 1);
        assert_eq!(store.count_in_department(3).await.unwrap(), 2);
        assert!(!store.is_email_unique("E-001@FIELDOPS.TEST", None).await.unwrap());
    }
}

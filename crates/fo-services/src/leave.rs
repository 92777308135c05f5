//! Leave requests
//!
//! Statuses live in the `leave_status` lookup and are resolved by code.
//! Overlap checks only consider pending and approved requests.

use std::sync::Arc;

use chrono::Utc;
use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::leave::{permissions, ReviewLeaveContract, SubmitLeaveContract};
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_core::types::DateRange;
use fo_db::{EmployeeStore, LeaveStatusChange, LeaveStore, LookupStore, NewLeaveRecord, Stores, UserStore};
use fo_models::{
    leave_status, EmploymentStatus, LeaveFilter, LeaveRequest, LeaveReview, LookupKind, NewLeaveRequest,
    NewNotification, NotificationKind,
};
use fo_notifications::NotificationSink;
use tracing::{info, instrument};

use crate::base::{actor, clean, deliver_to_employee, invalid_base};

pub struct LeaveService {
    leave: Arc<dyn LeaveStore>,
    employees: Arc<dyn EmployeeStore>,
    lookups: Arc<dyn LookupStore>,
    users: Arc<dyn UserStore>,
    activity: ActivityLogger,
    notifier: Arc<dyn NotificationSink>,
}

impl LeaveService {
    pub fn new(stores: &Stores, activity: ActivityLogger, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            leave: stores.leave.clone(),
            employees: stores.employees.clone(),
            lookups: stores.lookups.clone(),
            users: stores.users.clone(),
            activity,
            notifier,
        }
    }

    /// Reviewers see every request; everybody else only their own
    pub async fn list(
        &self,
        user: &CurrentUser,
        mut filter: LeaveFilter,
        pagination: Pagination,
    ) -> FoResult<PaginatedResult<LeaveRequest>> {
        if !user.allowed(permissions::REVIEW) {
            ensure_allowed(user, permissions::REQUEST)?;
            let own = user
                .employee_id
                .ok_or_else(|| FoError::forbidden("Your account is not linked to an employee"))?;
            filter.employee_id = Some(own);
        }
        Ok(self.leave.search(&filter, pagination).await?)
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<LeaveRequest> {
        let request = self.find(id).await?;
        if user.employee_id != Some(request.employee_id) {
            ensure_allowed(user, permissions::REVIEW)?;
        }
        Ok(request)
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn submit(&self, user: &CurrentUser, mut input: NewLeaveRequest) -> FoResult<LeaveRequest> {
        input.reason = clean(input.reason);
        SubmitLeaveContract::new(user).check(&input)?;

        match self.employees.find_by_id(input.employee_id).await? {
            None => return Err(FoError::invalid("employeeId", "does not exist")),
            Some(employee) if employee.is_terminated() => {
                return Err(FoError::invalid("employeeId", "is no longer employed"))
            }
            Some(_) => {}
        }
        let leave_type = self.lookups.find_by_id(input.leave_type_id).await?;
        if !leave_type.map_or(false, |t| t.kind == LookupKind::LeaveType && t.is_active) {
            return Err(FoError::invalid("leaveTypeId", "is not an active leave type"));
        }

        let range = DateRange::new(input.start_date, input.end_date)?;
        let blocking = self.blocking_statuses().await?;
        if self
            .leave
            .has_overlap(input.employee_id, &range, &blocking, None)
            .await?
        {
            return Err(FoError::invalid("startDate", "overlaps another leave request"));
        }

        let pending = self.status_id(leave_status::PENDING).await?;
        let record = NewLeaveRecord {
            employee_id: input.employee_id,
            leave_type_id: input.leave_type_id,
            status_id: pending,
            start_date: range.start,
            end_date: range.end,
            days: range.business_days() as i32,
            reason: input.reason,
        };
        let request = self.leave.create(record, actor(user)).await?;
        info!(id = request.id, employee_id = request.employee_id, days = request.days, "Leave requested");
        self.activity
            .created(
                actor(user),
                &request,
                format!("Leave requested for {} business day(s)", request.days),
            )
            .await;
        Ok(request)
    }

    /// Approval puts the employee on leave when the request covers today
    #[instrument(skip(self, user, review), fields(user_id = user.id))]
    pub async fn approve(&self, user: &CurrentUser, id: Id, review: LeaveReview) -> FoResult<LeaveRequest> {
        let approved = self.review(user, id, review, leave_status::APPROVED).await?;

        let today = Utc::now().date_naive();
        if approved.range().contains(today) {
            if let Some(employee) = self.employees.find_by_id(approved.employee_id).await? {
                if employee.status == EmploymentStatus::Active {
                    self.employees
                        .set_status(employee.id, EmploymentStatus::OnLeave, actor(user))
                        .await?;
                    info!(employee_id = employee.id, "Employee is on leave");
                }
            }
        }
        Ok(approved)
    }

    #[instrument(skip(self, user, review), fields(user_id = user.id))]
    pub async fn reject(&self, user: &CurrentUser, id: Id, review: LeaveReview) -> FoResult<LeaveRequest> {
        self.review(user, id, review, leave_status::REJECTED).await
    }

    /// Withdrawn by the requester (or an administrator) while still pending
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn cancel(&self, user: &CurrentUser, id: Id) -> FoResult<LeaveRequest> {
        let current = self.find(id).await?;
        let own = user.employee_id == Some(current.employee_id);
        if !own && !user.is_admin() {
            return Err(FoError::forbidden("Only the requester can cancel a leave request"));
        }
        let pending_id = self.status_id(leave_status::PENDING).await?;
        if current.status_id != pending_id {
            return Err(invalid_base("Only pending leave requests can be cancelled"));
        }

        let change = LeaveStatusChange {
            from_status_id: Some(pending_id),
            status_id: self.status_id(leave_status::CANCELLED).await?,
            reviewed_by_id: None,
            review_comment: None,
        };
        let cancelled = self.leave.update(id, change, actor(user)).await?;
        self.activity.changed(actor(user), "cancelled", &current, &cancelled).await;
        Ok(cancelled)
    }

    async fn review(&self, user: &CurrentUser, id: Id, review: LeaveReview, outcome: &str) -> FoResult<LeaveRequest> {
        let current = self.find(id).await?;
        let pending_id = self.status_id(leave_status::PENDING).await?;
        ReviewLeaveContract::new(user, &current, current.status_id == pending_id).check(&review)?;

        let status_id = self.status_id(outcome).await?;
        let reviewed = self
            .leave
            .review(id, pending_id, status_id, user.id, clean(review.comment))
            .await?;
        info!(id, outcome, "Leave request reviewed");

        let action = outcome.to_lowercase();
        self.activity.changed(actor(user), &action, &current, &reviewed).await;

        deliver_to_employee(
            self.users.as_ref(),
            self.notifier.as_ref(),
            reviewed.employee_id,
            user,
            |recipient_id| NewNotification {
                recipient_id,
                kind: NotificationKind::LeaveReviewed,
                title: format!("Your leave request was {}", action),
                message: format!("{} to {}", reviewed.start_date, reviewed.end_date),
                link: Some(format!("/leave-requests/{}", reviewed.id)),
            },
        )
        .await;
        Ok(reviewed)
    }

    async fn find(&self, id: Id) -> FoResult<LeaveRequest> {
        self.leave.find_by_id(id).await?.or_not_found("LeaveRequest", id)
    }

    async fn status_id(&self, code: &str) -> FoResult<Id> {
        self.lookups
            .find_by_code(LookupKind::LeaveStatus, code)
            .await?
            .map(|l| l.id)
            .ok_or_else(|| {
                FoError::Internal(format!(
                    "Leave status {} is missing; run `fieldops-admin seed`",
                    code
                ))
            })
    }

    async fn blocking_statuses(&self) -> FoResult<Vec<Id>> {
        Ok(vec![
            self.status_id(leave_status::PENDING).await?,
            self.status_id(leave_status::APPROVED).await?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        admin, create_account, create_employee, delivered, seeded_stores, silent_sink, user_with, MockSink,
    };
    use chrono::{Duration, NaiveDate};

    fn service(stores: &Stores, notifier: Arc<dyn NotificationSink>) -> LeaveService {
        LeaveService::new(stores, ActivityLogger::new(stores.activity.clone()), notifier)
    }

    async fn lookup_id(stores: &Stores, kind: LookupKind, code: &str) -> Id {
        stores.lookups.find_by_code(kind, code).await.unwrap().unwrap().id
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, m, d).unwrap()
    }

    fn requester(id: Id, employee_id: Id) -> CurrentUser {
        user_with(id, &[permissions::REQUEST]).with_employee(employee_id)
    }

    fn reviewer() -> CurrentUser {
        user_with(50, &[permissions::REQUEST, permissions::REVIEW])
    }

    async fn annual(stores: &Stores, employee_id: Id, start: NaiveDate, end: NaiveDate) -> NewLeaveRequest {
        NewLeaveRequest {
            employee_id,
            leave_type_id: lookup_id(stores, LookupKind::LeaveType, "ANNUAL").await,
            start_date: start,
            end_date: end,
            reason: Some(" Family visit ".into()),
        }
    }

    #[tokio::test]
    async fn test_submit_counts_business_days() {
        let stores = seeded_stores().await;
        let service = service(&stores, silent_sink());
        let employee = create_employee(&stores, "EMP-001").await;

        // Mon 2030-06-03 .. Sun 2030-06-09
        let input = annual(&stores, employee.id, date(6, 3), date(6, 9)).await;
        let request = service.submit(&requester(1, employee.id), input).await.unwrap();
        assert_eq!(request.days, 5);
        assert_eq!(request.reason.as_deref(), Some("Family visit"));
        assert_eq!(
            request.status_id,
            lookup_id(&stores, LookupKind::LeaveStatus, leave_status::PENDING).await
        );
    }

    #[tokio::test]
    async fn test_overlap_is_rejected_until_cancelled() {
        let stores = seeded_stores().await;
        let service = service(&stores, silent_sink());
        let employee = create_employee(&stores, "EMP-001").await;
        let me = requester(1, employee.id);

        let first = service
            .submit(&me, annual(&stores, employee.id, date(6, 3), date(6, 7)).await)
            .await
            .unwrap();
        let err = service
            .submit(&me, annual(&stores, employee.id, date(6, 6), date(6, 12)).await)
            .await
            .unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("startDate")),
            other => panic!("unexpected {:?}", other),
        }

        service.cancel(&me, first.id).await.unwrap();
        service
            .submit(&me, annual(&stores, employee.id, date(6, 6), date(6, 12)).await)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_terminated_employee_cannot_request() {
        let stores = seeded_stores().await;
        let service = service(&stores, silent_sink());
        let employee = create_employee(&stores, "EMP-001").await;
        stores
            .employees
            .terminate(employee.id, date(1, 31), None)
            .await
            .unwrap();

        let input = annual(&stores, employee.id, date(6, 3), date(6, 4)).await;
        let err = service.submit(&reviewer(), input).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_approve_notifies_and_sets_on_leave() {
        let stores = seeded_stores().await;
        let employee = create_employee(&stores, "EMP-001").await;
        let account = create_account(&stores, "jdoe", Some(employee.id)).await;

        let mut sink = MockSink::new();
        let recipient = account.id;
        sink.expect_notify()
            .withf(move |n| n.recipient_id == recipient && n.kind == NotificationKind::LeaveReviewed)
            .times(1)
            .returning(|n| Ok(delivered(n)));
        let service = service(&stores, Arc::new(sink));

        let today = Utc::now().date_naive();
        let input = annual(&stores, employee.id, today, today + Duration::days(6)).await;
        let request = service.submit(&requester(account.id, employee.id), input).await.unwrap();

        let approved = service
            .approve(&reviewer(), request.id, LeaveReview { comment: Some("Enjoy".into()) })
            .await
            .unwrap();
        assert_eq!(approved.reviewed_by_id, Some(50));
        assert_eq!(approved.review_comment.as_deref(), Some("Enjoy"));

        let employee = stores.employees.find_by_id(employee.id).await.unwrap().unwrap();
        assert_eq!(employee.status, EmploymentStatus::OnLeave);

        let again = service.reject(&reviewer(), request.id, LeaveReview::default()).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_own_request_cannot_be_reviewed() {
        let stores = seeded_stores().await;
        let service = service(&stores, silent_sink());
        let employee = create_employee(&stores, "EMP-001").await;
        let manager = reviewer().with_employee(employee.id);

        let request = service
            .submit(&manager, annual(&stores, employee.id, date(6, 3), date(6, 4)).await)
            .await
            .unwrap();
        let err = service
            .approve(&manager, request.id, LeaveReview::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_own_requests() {
        let stores = seeded_stores().await;
        let service = service(&stores, silent_sink());
        let first = create_employee(&stores, "EMP-001").await;
        let second = create_employee(&stores, "EMP-002").await;

        service
            .submit(&reviewer(), annual(&stores, first.id, date(6, 3), date(6, 4)).await)
            .await
            .unwrap();
        let other = service
            .submit(&reviewer(), annual(&stores, second.id, date(6, 3), date(6, 4)).await)
            .await
            .unwrap();

        let mine = service
            .list(&requester(1, first.id), LeaveFilter::default(), Pagination::new(20, 0))
            .await
            .unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].employee_id, first.id);

        let all = service
            .list(&reviewer(), LeaveFilter::default(), Pagination::new(20, 0))
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let unlinked = user_with(2, &[permissions::REQUEST]);
        let err = service
            .list(&unlinked, LeaveFilter::default(), Pagination::new(20, 0))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let err = service.get(&requester(1, first.id), other.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_only_requester_cancels() {
        let stores = seeded_stores().await;
        let service = service(&stores, silent_sink());
        let employee = create_employee(&stores, "EMP-001").await;
        let request = service
            .submit(&reviewer(), annual(&stores, employee.id, date(6, 3), date(6, 4)).await)
            .await
            .unwrap();

        let err = service.cancel(&reviewer(), request.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);

        let cancelled = service.cancel(&admin(), request.id).await.unwrap();
        assert_eq!(
            cancelled.status_id,
            lookup_id(&stores, LookupKind::LeaveStatus, leave_status::CANCELLED).await
        );
        assert!(service.cancel(&admin(), request.id).await.is_err());
    }
}

//! Employee records

use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::employees::{
    permissions, CreateEmployeeContract, TerminateEmployeeContract, UpdateEmployeeContract,
};
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{EmployeeStore, LookupStore, Stores};
use fo_models::{
    normalize_code, Employee, EmployeeFilter, LookupKind, NewEmployee, TerminateEmployee, UpdateEmployee,
};
use tracing::{info, instrument};

use crate::base::{actor, clean, ensure_unique};

pub struct EmployeeService {
    employees: Arc<dyn EmployeeStore>,
    lookups: Arc<dyn LookupStore>,
    activity: ActivityLogger,
}

impl EmployeeService {
    pub fn new(stores: &Stores, activity: ActivityLogger) -> Self {
        Self {
            employees: stores.employees.clone(),
            lookups: stores.lookups.clone(),
            activity,
        }
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        filter: &EmployeeFilter,
        pagination: Pagination,
    ) -> FoResult<PaginatedResult<Employee>> {
        ensure_allowed(user, permissions::VIEW)?;
        Ok(self.employees.search(filter, pagination).await?)
    }

    /// Employees may always read their own record
    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<Employee> {
        if user.employee_id != Some(id) {
            ensure_allowed(user, permissions::VIEW)?;
        }
        self.find(id).await
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewEmployee) -> FoResult<Employee> {
        input.employee_number = normalize_code(&input.employee_number);
        input.first_name = input.first_name.trim().to_string();
        input.last_name = input.last_name.trim().to_string();
        input.email = input.email.trim().to_lowercase();
        input.phone = clean(input.phone);
        input.job_title = clean(input.job_title);

        CreateEmployeeContract::new(user).check(&input)?;
        ensure_unique(
            self.employees.is_number_unique(&input.employee_number, None).await?,
            "employeeNumber",
        )?;
        ensure_unique(self.employees.is_email_unique(&input.email, None).await?, "email")?;
        self.ensure_references(input.department_id, input.manager_id).await?;

        let employee = self.employees.create(input, actor(user)).await?;
        info!(id = employee.id, number = %employee.employee_number, "Employee created");
        self.activity
            .created(
                actor(user),
                &employee,
                format!("Employee {} ({}) created", employee.employee_number, employee.full_name()),
            )
            .await;
        Ok(employee)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, id: Id, mut patch: UpdateEmployee) -> FoResult<Employee> {
        let current = self.find(id).await?;
        patch.first_name = patch.first_name.map(|n| n.trim().to_string());
        patch.last_name = patch.last_name.map(|n| n.trim().to_string());
        patch.email = patch.email.map(|e| e.trim().to_lowercase());

        UpdateEmployeeContract::new(user, &current).check(&patch)?;
        if let Some(email) = &patch.email {
            ensure_unique(self.employees.is_email_unique(email, Some(id)).await?, "email")?;
        }
        self.ensure_references(patch.department_id.flatten(), patch.manager_id.flatten())
            .await?;

        let updated = self.employees.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    /// Sets the status to terminated and records the date
    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn terminate(&self, user: &CurrentUser, id: Id, input: TerminateEmployee) -> FoResult<Employee> {
        let current = self.find(id).await?;
        TerminateEmployeeContract::new(user, &current).check(&input)?;

        let terminated = self
            .employees
            .terminate(id, input.termination_date, actor(user))
            .await?;
        info!(id, date = %input.termination_date, "Employee terminated");
        self.activity
            .changed(actor(user), "terminated", &current, &terminated)
            .await;
        Ok(terminated)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        self.employees.delete(id, actor(user)).await?;
        self.activity
            .deleted(actor(user), &current, format!("Employee {} deleted", current.employee_number))
            .await;
        Ok(())
    }

    async fn find(&self, id: Id) -> FoResult<Employee> {
        self.employees.find_by_id(id).await?.or_not_found("Employee", id)
    }

    async fn ensure_references(&self, department_id: Option<Id>, manager_id: Option<Id>) -> FoResult<()> {
        if let Some(department_id) = department_id {
            let department = self.lookups.find_by_id(department_id).await?;
            if !department.map_or(false, |d| d.kind == LookupKind::Department) {
                return Err(FoError::invalid("departmentId", "is not a known department"));
            }
        }
        if let Some(manager_id) = manager_id {
            if !self.employees.exists(manager_id).await? {
                return Err(FoError::invalid("managerId", "does not exist"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, new_employee, seeded_stores, user_with};
    use chrono::NaiveDate;
    use fo_models::EmploymentStatus;

    fn service(stores: &Stores) -> EmployeeService {
        EmployeeService::new(stores, ActivityLogger::new(stores.activity.clone()))
    }

    #[tokio::test]
    async fn test_number_and_email_are_unique() {
        let stores = seeded_stores().await;
        let service = service(&stores);

        let created = service.create(&admin(), new_employee("emp-100")).await.unwrap();
        assert_eq!(created.employee_number, "EMP-100");
        assert_eq!(created.status, EmploymentStatus::Active);

        let err = service.create(&admin(), new_employee("EMP-100")).await.unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("employeeNumber")),
            other => panic!("unexpected {:?}", other),
        }

        let mut same_email = new_employee("EMP-101");
        same_email.email = created.email.to_uppercase();
        let err = service.create(&admin(), same_email).await.unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("email")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_department_must_be_a_department() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let sick = stores
            .lookups
            .find_by_code(LookupKind::LeaveType, "SICK")
            .await
            .unwrap()
            .unwrap();
        let ops = stores
            .lookups
            .find_by_code(LookupKind::Department, "OPS")
            .await
            .unwrap()
            .unwrap();

        let mut input = new_employee("EMP-200");
        input.department_id = Some(sick.id);
        assert!(service.create(&admin(), input.clone()).await.is_err());

        input.department_id = Some(ops.id);
        let employee = service.create(&admin(), input).await.unwrap();
        assert_eq!(employee.department_id, Some(ops.id));
    }

    #[tokio::test]
    async fn test_terminate() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let employee = service.create(&admin(), new_employee("EMP-300")).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        let terminated = service
            .terminate(&admin(), employee.id, TerminateEmployee { termination_date: date })
            .await
            .unwrap();
        assert_eq!(terminated.status, EmploymentStatus::Terminated);
        assert_eq!(terminated.termination_date, Some(date));

        let again = service
            .terminate(&admin(), employee.id, TerminateEmployee { termination_date: date })
            .await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_own_record_is_readable() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let employee = service.create(&admin(), new_employee("EMP-400")).await.unwrap();

        let me = user_with(8, &[]).with_employee(employee.id);
        assert_eq!(service.get(&me, employee.id).await.unwrap().id, employee.id);

        let stranger = user_with(9, &[]);
        assert_eq!(service.get(&stranger, employee.id).await.unwrap_err().status_code(), 403);
    }
}

//! # fo-contracts
//!
//! Contract validation for FieldOps.
//!
//! A contract is built for the acting user and validates one input before a
//! service writes it. `check` enforces the contract's permission first
//! (`FoError::Forbidden`) and then the field and state rules
//! (`FoError::Validation`).

pub mod base;
pub mod clients;
pub mod employees;
pub mod leave;
pub mod lookups;
pub mod materials;
pub mod resources;
pub mod roles;
pub mod templates;
pub mod users;
pub mod work_orders;

pub use base::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;

    use fo_core::traits::Id;

    use crate::base::UserContext;

    pub struct MockUser {
        pub id: Id,
        pub admin: bool,
        pub permissions: HashSet<String>,
        pub employee_id: Option<Id>,
    }

    impl MockUser {
        pub fn admin() -> Self {
            Self {
                id: 1,
                admin: true,
                permissions: HashSet::new(),
                employee_id: None,
            }
        }

        pub fn with(permissions: &[&str]) -> Self {
            Self {
                id: 2,
                admin: false,
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
                employee_id: None,
            }
        }

        pub fn nobody() -> Self {
            Self::with(&[])
        }
    }

    impl UserContext for MockUser {
        fn id(&self) -> Id {
            self.id
        }
        fn is_admin(&self) -> bool {
            self.admin
        }
        fn has_role(&self, role: &str) -> bool {
            self.admin && role == crate::base::ADMIN_ROLE
        }
        fn allowed(&self, permission: &str) -> bool {
            self.permissions.contains(permission)
        }
        fn employee_id(&self) -> Option<Id> {
            self.employee_id
        }
    }

    pub fn sample_work_order() -> fo_models::WorkOrder {
        let now = chrono::Utc::now();
        fo_models::WorkOrder {
            id: 10,
            number: "WO-2024-00010".into(),
            title: "Inspect pump station".into(),
            description: None,
            client_id: 3,
            location: None,
            status: fo_models::WorkOrderStatus::Open,
            priority: fo_models::WorkOrderPriority::Normal,
            completion_percentage: 0,
            start_date: None,
            due_date: None,
            completed_at: None,
            assigned_employee_id: None,
            lock_version: 0,
            created_at: now,
            updated_at: now,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
        }
    }
}

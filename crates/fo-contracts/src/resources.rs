//! Resource contracts

use fo_core::error::ValidationErrors;
use fo_models::{
    NewResource, NewResourceAssignment, Resource, ResourceStatus, UpdateResource, WorkOrder,
};

use crate::base::{
    validate_code, validate_fields, validate_presence, Contract, UserContext, ValidationResult,
};

pub mod permissions {
    pub const VIEW: &str = "resources.view";
    pub const MANAGE: &str = "resources.manage";
}

pub struct CreateResourceContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> CreateResourceContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<NewResource> for CreateResourceContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewResource) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_code("code", &input.code, &mut errors);
        validate_presence("name", &input.name, &mut errors);
        if errors.is_empty() {
            validate_fields(input, &mut errors);
        }
        errors.into_result()
    }
}

pub struct UpdateResourceContract<'a> {
    user: &'a dyn UserContext,
}

impl<'a> UpdateResourceContract<'a> {
    pub fn new(user: &'a dyn UserContext) -> Self {
        Self { user }
    }
}

impl<'a> Contract<UpdateResource> for UpdateResourceContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, patch: &UpdateResource) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(code) = &patch.code {
            validate_code("code", code, &mut errors);
        }
        if let Some(name) = &patch.name {
            validate_presence("name", name, &mut errors);
        }
        if errors.is_empty() {
            validate_fields(patch, &mut errors);
        }
        errors.into_result()
    }
}

/// Booking a resource on a work order
pub struct AssignResourceContract<'a> {
    user: &'a dyn UserContext,
    resource: &'a Resource,
    work_order: &'a WorkOrder,
}

impl<'a> AssignResourceContract<'a> {
    pub fn new(user: &'a dyn UserContext, resource: &'a Resource, work_order: &'a WorkOrder) -> Self {
        Self {
            user,
            resource,
            work_order,
        }
    }
}

impl<'a> Contract<NewResourceAssignment> for AssignResourceContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, input: &NewResourceAssignment) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        match self.resource.status {
            ResourceStatus::Available => {}
            ResourceStatus::Retired => {
                errors.add("resourceId", "is retired and cannot be assigned");
            }
            other => {
                errors.add("resourceId", format!("is not available ({})", other));
            }
        }
        if !self.work_order.status.is_active() {
            errors.add(
                "workOrderId",
                format!("is {} and cannot take resources", self.work_order.status),
            );
        }
        validate_fields(input, &mut errors);
        errors.into_result()
    }
}

/// Manual status changes; `in_use` follows assignments only
pub struct ResourceStatusContract<'a> {
    user: &'a dyn UserContext,
    resource: &'a Resource,
    has_active_assignment: bool,
}

impl<'a> ResourceStatusContract<'a> {
    pub fn new(user: &'a dyn UserContext, resource: &'a Resource, has_active_assignment: bool) -> Self {
        Self {
            user,
            resource,
            has_active_assignment,
        }
    }
}

impl<'a> Contract<ResourceStatus> for ResourceStatusContract<'a> {
    fn user(&self) -> &dyn UserContext {
        self.user
    }

    fn permission(&self) -> Option<&'static str> {
        Some(permissions::MANAGE)
    }

    fn validate(&self, target: &ResourceStatus) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if self.resource.status == ResourceStatus::Retired && *target != ResourceStatus::Retired {
            errors.add("status", "a retired resource cannot be brought back");
        }
        match target {
            ResourceStatus::InUse => {
                errors.add("status", "is set by assigning the resource to a work order");
            }
            ResourceStatus::Maintenance | ResourceStatus::Retired if self.has_active_assignment => {
                errors.add(
                    "status",
                    "cannot change while the resource is assigned to a work order",
                );
            }
            ResourceStatus::Available if self.has_active_assignment => {
                errors.add("status", "release the active assignment instead");
            }
            _ => {}
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_work_order, MockUser};
    use chrono::Utc;
    use fo_models::WorkOrderStatus;

    fn resource(status: ResourceStatus) -> Resource {
        let now = Utc::now();
        Resource {
            id: 3,
            code: "GEN-01".into(),
            name: "Generator 5kW".into(),
            category_id: None,
            serial_number: None,
            location: None,
            purchase_date: None,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
        }
    }

    fn assignment() -> NewResourceAssignment {
        NewResourceAssignment {
            resource_id: 3,
            work_order_id: 10,
            notes: None,
        }
    }

    #[test]
    fn test_assign_available_to_open_order() {
        let user = MockUser::with(&[permissions::MANAGE]);
        let res = resource(ResourceStatus::Available);
        let wo = sample_work_order();
        assert!(AssignResourceContract::new(&user, &res, &wo)
            .check(&assignment())
            .is_ok());
    }

    #[test]
    fn test_retired_resource_cannot_be_assigned() {
        let user = MockUser::admin();
        let res = resource(ResourceStatus::Retired);
        let wo = sample_work_order();
        let errors = AssignResourceContract::new(&user, &res, &wo)
            .validate(&assignment())
            .unwrap_err();
        assert_eq!(
            errors.get("resourceId").unwrap()[0],
            "is retired and cannot be assigned"
        );
    }

    #[test]
    fn test_closed_order_cannot_take_resources() {
        let user = MockUser::admin();
        let res = resource(ResourceStatus::Available);
        let mut wo = sample_work_order();
        wo.status = WorkOrderStatus::Completed;
        let errors = AssignResourceContract::new(&user, &res, &wo)
            .validate(&assignment())
            .unwrap_err();
        assert!(errors.has_error("workOrderId"));
    }

    #[test]
    fn test_status_changes() {
        let user = MockUser::admin();
        let available = resource(ResourceStatus::Available);
        let in_use = resource(ResourceStatus::InUse);
        let retired = resource(ResourceStatus::Retired);

        let free = ResourceStatusContract::new(&user, &available, false);
        assert!(free.validate(&ResourceStatus::Maintenance).is_ok());
        assert!(free.validate(&ResourceStatus::InUse).is_err());

        let busy = ResourceStatusContract::new(&user, &in_use, true);
        assert!(busy.validate(&ResourceStatus::Retired).is_err());

        let gone = ResourceStatusContract::new(&user, &retired, false);
        assert!(gone.validate(&ResourceStatus::Available).is_err());
    }
}

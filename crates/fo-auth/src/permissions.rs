//! Permission catalog, built-in roles and the current user
//!
//! Authorization is role based: a role grants a set of permission codes and
//! a user holds roles. Holders of the Administrator role pass every check.

use std::collections::HashSet;

use fo_contracts::base::{UserContext, ADMIN_ROLE};
use fo_contracts::{
    clients, employees, leave, lookups, materials, resources, roles, templates, users, work_orders,
};
use fo_core::traits::Id;
use fo_models::User;

pub const ATTACHMENTS_UPLOAD: &str = "attachments.upload";
pub const ATTACHMENTS_DELETE: &str = "attachments.delete";
pub const ACTIVITY_VIEW: &str = "activity.view";

/// One entry of the permission catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDef {
    pub code: &'static str,
    pub name: &'static str,
    pub category: &'static str,
}

const fn permission(code: &'static str, name: &'static str, category: &'static str) -> PermissionDef {
    PermissionDef { code, name, category }
}

static CATALOG: &[PermissionDef] = &[
    permission(work_orders::permissions::VIEW, "View work orders", "Work orders"),
    permission(work_orders::permissions::CREATE, "Create work orders", "Work orders"),
    permission(work_orders::permissions::EDIT, "Edit work orders", "Work orders"),
    permission(work_orders::permissions::DELETE, "Delete work orders", "Work orders"),
    permission(work_orders::permissions::MANAGE_STATUS, "Change work order status", "Work orders"),
    permission(clients::permissions::VIEW, "View clients", "Clients"),
    permission(clients::permissions::MANAGE, "Manage clients and contacts", "Clients"),
    permission(materials::permissions::VIEW, "View client materials", "Clients"),
    permission(materials::permissions::MANAGE, "Manage client materials", "Clients"),
    permission(employees::permissions::VIEW, "View employees", "Human resources"),
    permission(employees::permissions::MANAGE, "Manage employees", "Human resources"),
    permission(leave::permissions::REQUEST, "Request leave", "Human resources"),
    permission(leave::permissions::REVIEW, "Approve or reject leave", "Human resources"),
    permission(resources::permissions::VIEW, "View resources", "Resources"),
    permission(resources::permissions::MANAGE, "Manage and assign resources", "Resources"),
    permission(ATTACHMENTS_UPLOAD, "Upload attachments", "Attachments"),
    permission(ATTACHMENTS_DELETE, "Delete attachments", "Attachments"),
    permission(templates::permissions::VIEW, "View document templates", "Documents"),
    permission(templates::permissions::MANAGE, "Manage document templates", "Documents"),
    permission(lookups::permissions::MANAGE, "Manage lookup values", "Administration"),
    permission(users::permissions::MANAGE, "Manage users", "Administration"),
    permission(roles::permissions::MANAGE, "Manage roles", "Administration"),
    permission(ACTIVITY_VIEW, "View the activity log", "Administration"),
];

/// Every permission the system knows
pub fn catalog() -> &'static [PermissionDef] {
    CATALOG
}

pub fn is_known_permission(code: &str) -> bool {
    CATALOG.iter().any(|p| p.code == code)
}

/// A role created by the seeder
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<String>,
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

/// Administrator, Manager, Technician, HR and Viewer
pub fn builtin_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition {
            name: ADMIN_ROLE,
            description: "Full access to every module",
            permissions: CATALOG.iter().map(|p| p.code.to_string()).collect(),
        },
        RoleDefinition {
            name: "Manager",
            description: "Plans work, manages clients and resources, reviews leave",
            permissions: codes(&[
                work_orders::permissions::VIEW,
                work_orders::permissions::CREATE,
                work_orders::permissions::EDIT,
                work_orders::permissions::DELETE,
                work_orders::permissions::MANAGE_STATUS,
                clients::permissions::VIEW,
                clients::permissions::MANAGE,
                materials::permissions::VIEW,
                materials::permissions::MANAGE,
                employees::permissions::VIEW,
                leave::permissions::REQUEST,
                leave::permissions::REVIEW,
                resources::permissions::VIEW,
                resources::permissions::MANAGE,
                ATTACHMENTS_UPLOAD,
                ATTACHMENTS_DELETE,
                templates::permissions::VIEW,
                templates::permissions::MANAGE,
                ACTIVITY_VIEW,
            ]),
        },
        RoleDefinition {
            name: "Technician",
            description: "Carries out assigned work orders",
            permissions: codes(&[
                work_orders::permissions::VIEW,
                work_orders::permissions::EDIT,
                work_orders::permissions::MANAGE_STATUS,
                clients::permissions::VIEW,
                materials::permissions::VIEW,
                resources::permissions::VIEW,
                leave::permissions::REQUEST,
                ATTACHMENTS_UPLOAD,
                templates::permissions::VIEW,
            ]),
        },
        RoleDefinition {
            name: "HR",
            description: "Maintains employee records and leave",
            permissions: codes(&[
                employees::permissions::VIEW,
                employees::permissions::MANAGE,
                leave::permissions::REQUEST,
                leave::permissions::REVIEW,
                lookups::permissions::MANAGE,
                ATTACHMENTS_UPLOAD,
                templates::permissions::VIEW,
            ]),
        },
        RoleDefinition {
            name: "Viewer",
            description: "Read-only access",
            permissions: codes(&[
                work_orders::permissions::VIEW,
                clients::permissions::VIEW,
                materials::permissions::VIEW,
                employees::permissions::VIEW,
                resources::permissions::VIEW,
                templates::permissions::VIEW,
            ]),
        },
    ]
}

/// The authenticated user of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Id,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: HashSet<String>,
    pub employee_id: Option<Id>,
}

impl CurrentUser {
    pub fn new(id: Id, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            roles: Vec::new(),
            permissions: HashSet::new(),
            employee_id: None,
        }
    }

    /// Build from a stored account and the codes its roles grant
    pub fn from_user(user: &User, permissions: impl IntoIterator<Item = String>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
            permissions: permissions.into_iter().collect(),
            employee_id: user.employee_id,
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_employee(mut self, employee_id: Id) -> Self {
        self.employee_id = Some(employee_id);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn allowed(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.contains(permission)
    }

    /// Permission codes, sorted
    pub fn permission_list(&self) -> Vec<String> {
        let mut list: Vec<String> = self.permissions.iter().cloned().collect();
        list.sort();
        list
    }
}

impl UserContext for CurrentUser {
    fn id(&self) -> Id {
        self.id
    }

    fn is_admin(&self) -> bool {
        CurrentUser::is_admin(self)
    }

    fn has_role(&self, role: &str) -> bool {
        CurrentUser::has_role(self, role)
    }

    fn allowed(&self, permission: &str) -> bool {
        CurrentUser::allowed(self, permission)
    }

    fn employee_id(&self) -> Option<Id> {
        self.employee_id
    }
}

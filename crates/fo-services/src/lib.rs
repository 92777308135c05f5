//! # fo-services
//!
//! Business logic for FieldOps.
//!
//! Every write goes through the same steps: normalise the input, run the
//! contract, check store-level rules (uniqueness, references), persist,
//! record activity and notify. Handlers only translate HTTP to these calls.

pub mod attachments;
pub mod base;
pub mod clients;
pub mod dashboard;
pub mod employees;
pub mod leave;
pub mod lookups;
pub mod materials;
pub mod resources;
pub mod roles;
pub mod seed;
pub mod services;
pub mod templates;
pub mod users;
pub mod work_orders;

#[cfg(test)]
mod test_support;

pub use attachments::AttachmentAccess;
pub use clients::ClientService;
pub use dashboard::{DashboardService, DashboardSummary};
pub use employees::EmployeeService;
pub use leave::LeaveService;
pub use lookups::LookupService;
pub use materials::ClientMaterialService;
pub use resources::ResourceService;
pub use roles::RoleService;
pub use seed::{AdminAccount, SeedReport, Seeder, DEFAULT_ADMIN_USERNAME};
pub use services::Services;
pub use templates::{placeholders, render, DocumentTemplateService, RenderedDocument};
pub use users::UserService;
pub use work_orders::WorkOrderService;

//! Work order contracts

mod base;
mod create;
mod delete;
mod progress;
mod status;
mod update;

pub use base::WorkOrderBaseContract;
pub use create::CreateWorkOrderContract;
pub use delete::DeleteWorkOrderContract;
pub use progress::ProgressContract;
pub use status::ChangeStatusContract;
pub use update::UpdateWorkOrderContract;

/// Permissions required for work order operations
pub mod permissions {
    pub const VIEW: &str = "work_orders.view";
    pub const CREATE: &str = "work_orders.create";
    pub const EDIT: &str = "work_orders.edit";
    pub const DELETE: &str = "work_orders.delete";
    pub const MANAGE_STATUS: &str = "work_orders.manage_status";
}

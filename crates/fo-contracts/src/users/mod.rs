//! User contracts

mod base;
mod change_password;
mod create;
mod update;

pub use base::{validate_password, validate_username};
pub use change_password::ChangePasswordContract;
pub use create::CreateUserContract;
pub use update::UpdateUserContract;

pub mod permissions {
    pub const MANAGE: &str = "users.manage";
}

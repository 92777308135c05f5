//! In-memory backend
//!
//! Used when no database URL is configured and throughout the service
//! tests. Behaves like the PostgreSQL stores for everything callers can
//! observe: soft deletes, uniqueness, ordering and optimistic locking.

mod clients;
mod reference;
mod resources;
mod roles;
mod staff;
pub mod table;
mod users;
mod work_orders;

pub use clients::{MemoryClientMaterialStore, MemoryClientStore};
pub use reference::{MemoryDocumentTemplateStore, MemoryLookupStore};
pub use resources::MemoryResourceStore;
pub use roles::MemoryRoleStore;
pub use staff::{MemoryEmployeeStore, MemoryLeaveStore};
pub use table::{MemoryTable, Record};
pub use users::MemoryUserStore;
pub use work_orders::MemoryWorkOrderStore;

//! # fo-db
//!
//! Persistence layer for FieldOps.
//!
//! - Connection pool management and migrations
//! - The generic `Repository` trait and one store trait per aggregate
//! - PostgreSQL implementations built on SQLx
//! - An in-memory backend with the same observable behavior
//!
//! ## Example
//!
//! ```ignore
//! use fo_db::{Database, DatabaseConfig, Stores};
//!
//! let db = Database::connect(&DatabaseConfig::with_url(url)).await?;
//! db.migrate().await?;
//!
//! let stores = Stores::postgres(db.pool().clone());
//! let order = stores.work_orders.find_by_id(1).await?;
//! ```

pub mod activity;
pub mod attachments;
pub mod clients;
pub mod employees;
pub mod leave;
pub mod lookups;
pub mod materials;
pub mod memory;
pub mod notifications;
pub mod pool;
pub mod repository;
pub mod resources;
pub mod roles;
pub mod stores;
pub mod templates;
pub mod users;
pub mod work_orders;

/// Embedded migrations from `crates/fo-db/migrations`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use clients::ClientStore;
pub use employees::EmployeeStore;
pub use leave::{LeaveStatusChange, LeaveStore, NewLeaveRecord};
pub use lookups::LookupStore;
pub use materials::ClientMaterialStore;
pub use pool::{Database, DatabaseConfig, PoolStats};
pub use repository::{Repository, RepositoryError, RepositoryResult};
pub use resources::ResourceStore;
pub use roles::RoleStore;
pub use stores::{MemoryStores, PgStores, Stores};
pub use templates::DocumentTemplateStore;
pub use users::{CreateUserDto, UserStore};
pub use work_orders::{StatusChange, WorkOrderStore};

//! # fo-activity
//!
//! Activity log for FieldOps.
//!
//! Every write performed by the services is recorded with the acting user and,
//! for updates, a field-level diff of the record. Client-side error reports are
//! recorded through the same log.

pub mod changes;
pub mod logger;

pub use changes::{ChangeSet, FieldChange};
pub use logger::{
    ActivityError, ActivityLogger, ActivityResult, ActivityStore, ClientErrorReport,
    MemoryActivityStore, RequestMeta,
};

//! # fo-notifications
//!
//! In-app notifications for FieldOps.
//!
//! Notifications are persisted through a [`NotificationStore`] and published
//! on a [`NotificationHub`] so connected clients receive them live.

pub mod hub;
pub mod service;
pub mod store;

pub use hub::{NotificationHub, RecipientStream};
pub use service::{NotificationService, NotificationSink};
pub use store::{
    MemoryNotificationStore, NotificationError, NotificationResult, NotificationStore,
};

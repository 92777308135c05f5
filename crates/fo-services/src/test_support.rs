//! Fixtures shared by the service tests

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use fo_auth::CurrentUser;
use fo_contracts::base::ADMIN_ROLE;
use fo_core::traits::Id;
use fo_db::{CreateUserDto, Stores};
use fo_models::{Client, Employee, NewClient, NewEmployee, NewNotification, Notification, User};
use fo_notifications::{NotificationResult, NotificationSink};

use crate::seed::Seeder;

mockall::mock! {
    pub Sink {}

    #[async_trait]
    impl NotificationSink for Sink {
        async fn notify(&self, notification: NewNotification) -> NotificationResult<Notification>;
    }
}

/// What a store would hand back for `notification`
pub fn delivered(notification: NewNotification) -> Notification {
    Notification {
        id: 1,
        recipient_id: notification.recipient_id,
        kind: notification.kind,
        title: notification.title,
        message: notification.message,
        link: notification.link,
        read_at: None,
        created_at: Utc::now(),
    }
}

/// A sink that accepts anything
pub fn any_sink() -> Arc<dyn NotificationSink> {
    let mut sink = MockSink::new();
    sink.expect_notify().returning(|n| Ok(delivered(n)));
    Arc::new(sink)
}

/// A sink that fails the test when called
pub fn silent_sink() -> Arc<dyn NotificationSink> {
    let mut sink = MockSink::new();
    sink.expect_notify().never();
    Arc::new(sink)
}

/// In-memory stores with permissions, roles and lookups in place
pub async fn seeded_stores() -> Stores {
    let stores = Stores::memory();
    Seeder::new(stores.clone()).run().await.unwrap();
    stores
}

/// Ids of acting users are kept clear of the accounts the tests create
pub fn admin() -> CurrentUser {
    CurrentUser::new(900, "admin").with_roles([ADMIN_ROLE])
}

pub fn user_with(id: Id, permissions: &[&str]) -> CurrentUser {
    CurrentUser::new(id, format!("user{}", id)).with_permissions(permissions.iter().copied())
}

pub async fn create_client(stores: &Stores, code: &str) -> Client {
    stores
        .clients
        .create(
            NewClient {
                code: code.to_string(),
                name: format!("{} Industries", code),
                tax_number: None,
                email: None,
                phone: None,
                address: None,
                is_active: Some(true),
            },
            None,
        )
        .await
        .unwrap()
}

pub fn new_employee(number: &str) -> NewEmployee {
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    NewEmployee {
        employee_number: number.to_string(),
        email: format!("{}@fieldops.test", number.to_lowercase()),
        first_name: first,
        last_name: last,
        phone: None,
        job_title: Some("Technician".into()),
        department_id: None,
        manager_id: None,
        hire_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
    }
}

pub async fn create_employee(stores: &Stores, number: &str) -> Employee {
    stores.employees.create(new_employee(number), None).await.unwrap()
}

/// An account linked to `employee_id`; the password hash is not usable
pub async fn create_account(stores: &Stores, username: &str, employee_id: Option<Id>) -> User {
    stores
        .users
        .create(
            CreateUserDto {
                username: username.to_string(),
                email: format!("{}@fieldops.test", username),
                first_name: FirstName().fake(),
                last_name: LastName().fake(),
                password_hash: "unusable".to_string(),
                is_active: true,
                employee_id,
            },
            None,
        )
        .await
        .unwrap()
}

//! Store bundle handed to the service layer

use std::sync::Arc;

use fo_activity::{ActivityStore, MemoryActivityStore};
use fo_attachments::{AttachmentStore, MemoryAttachmentStore};
use fo_notifications::{MemoryNotificationStore, NotificationStore};
use sqlx::PgPool;

use crate::activity::PgActivityStore;
use crate::attachments::PgAttachmentStore;
use crate::clients::{ClientStore, PgClientStore};
use crate::employees::{EmployeeStore, PgEmployeeStore};
use crate::leave::{LeaveStore, PgLeaveStore};
use crate::lookups::{LookupStore, PgLookupStore};
use crate::materials::{ClientMaterialStore, PgClientMaterialStore};
use crate::memory::{
    MemoryClientMaterialStore, MemoryClientStore, MemoryDocumentTemplateStore, MemoryEmployeeStore,
    MemoryLeaveStore, MemoryLookupStore, MemoryResourceStore, MemoryRoleStore, MemoryTable, MemoryUserStore,
    MemoryWorkOrderStore,
};
use crate::notifications::PgNotificationStore;
use crate::resources::{PgResourceStore, ResourceStore};
use crate::roles::{PgRoleStore, RoleStore};
use crate::templates::{DocumentTemplateStore, PgDocumentTemplateStore};
use crate::users::{PgUserStore, UserStore};
use crate::work_orders::{PgWorkOrderStore, WorkOrderStore};

/// One handle per aggregate, shared by every service
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub clients: Arc<dyn ClientStore>,
    pub materials: Arc<dyn ClientMaterialStore>,
    pub work_orders: Arc<dyn WorkOrderStore>,
    pub employees: Arc<dyn EmployeeStore>,
    pub leave: Arc<dyn LeaveStore>,
    pub lookups: Arc<dyn LookupStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub templates: Arc<dyn DocumentTemplateStore>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub activity: Arc<dyn ActivityStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

pub struct PgStores;

impl PgStores {
    pub fn new(pool: PgPool) -> Stores {
        Stores {
            users: Arc::new(PgUserStore::new(pool.clone())),
            roles: Arc::new(PgRoleStore::new(pool.clone())),
            clients: Arc::new(PgClientStore::new(pool.clone())),
            materials: Arc::new(PgClientMaterialStore::new(pool.clone())),
            work_orders: Arc::new(PgWorkOrderStore::new(pool.clone())),
            employees: Arc::new(PgEmployeeStore::new(pool.clone())),
            leave: Arc::new(PgLeaveStore::new(pool.clone())),
            lookups: Arc::new(PgLookupStore::new(pool.clone())),
            resources: Arc::new(PgResourceStore::new(pool.clone())),
            templates: Arc::new(PgDocumentTemplateStore::new(pool.clone())),
            attachments: Arc::new(PgAttachmentStore::new(pool.clone())),
            activity: Arc::new(PgActivityStore::new(pool.clone())),
            notifications: Arc::new(PgNotificationStore::new(pool)),
        }
    }
}

pub struct MemoryStores;

impl MemoryStores {
    pub fn new() -> Stores {
        let roles = Arc::new(MemoryTable::new());
        Stores {
            users: Arc::new(MemoryUserStore::new(roles.clone())),
            roles: Arc::new(MemoryRoleStore::new(roles)),
            clients: Arc::new(MemoryClientStore::new()),
            materials: Arc::new(MemoryClientMaterialStore::new()),
            work_orders: Arc::new(MemoryWorkOrderStore::new()),
            employees: Arc::new(MemoryEmployeeStore::new()),
            leave: Arc::new(MemoryLeaveStore::new()),
            lookups: Arc::new(MemoryLookupStore::new()),
            resources: Arc::new(MemoryResourceStore::new()),
            templates: Arc::new(MemoryDocumentTemplateStore::new()),
            attachments: Arc::new(MemoryAttachmentStore::new()),
            activity: Arc::new(MemoryActivityStore::new()),
            notifications: Arc::new(MemoryNotificationStore::new()),
        }
    }
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        PgStores::new(pool)
    }

    pub fn memory() -> Self {
        MemoryStores::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fo_models::NewRole;

    #[tokio::test]
    async fn test_memory_users_see_memory_roles() {
        let stores = Stores::memory();
        stores
            .roles
            .create(
                NewRole {
                    name: "Viewer".into(),
                    description: None,
                    permissions: vec![],
                    is_system: true,
                },
                None,
            )
            .await
            .unwrap();
        let user = stores
            .users
            .create(
                crate::users::CreateUserDto {
                    username: "viewer".into(),
                    email: "viewer@fieldops.test".into(),
                    first_name: "Vi".into(),
                    last_name: "Ewer".into(),
                    password_hash: "hash".into(),
                    is_active: true,
                    employee_id: None,
                },
                None,
            )
            .await
            .unwrap();

        let user = stores.users.set_roles(user.id, &["Viewer".into()]).await.unwrap();
        assert_eq!(user.roles, vec!["Viewer"]);
    }
}

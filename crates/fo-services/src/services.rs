//! Every service, wired to one set of stores

use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_attachments::{AttachmentPolicy, Storage};
use fo_core::config::AppConfig;
use fo_db::Stores;
use fo_notifications::{NotificationHub, NotificationService, NotificationSink};

use crate::attachments::AttachmentAccess;
use crate::clients::ClientService;
use crate::dashboard::DashboardService;
use crate::employees::EmployeeService;
use crate::leave::LeaveService;
use crate::lookups::LookupService;
use crate::materials::ClientMaterialService;
use crate::resources::ResourceService;
use crate::roles::RoleService;
use crate::templates::DocumentTemplateService;
use crate::users::UserService;
use crate::work_orders::WorkOrderService;

pub struct Services {
    pub activity: ActivityLogger,
    pub notifications: NotificationService,
    pub work_orders: WorkOrderService,
    pub clients: ClientService,
    pub materials: ClientMaterialService,
    pub employees: EmployeeService,
    pub leave: LeaveService,
    pub resources: ResourceService,
    pub users: UserService,
    pub roles: RoleService,
    pub lookups: LookupService,
    pub templates: DocumentTemplateService,
    pub dashboard: DashboardService,
    pub attachments: AttachmentAccess,
}

impl Services {
    pub fn new(stores: &Stores, config: &AppConfig, storage: Arc<dyn Storage>, hub: NotificationHub) -> Self {
        let activity = ActivityLogger::new(stores.activity.clone());
        let notifications = NotificationService::new(stores.notifications.clone(), hub);
        let notifier: Arc<dyn NotificationSink> = Arc::new(notifications.clone());

        Self {
            work_orders: WorkOrderService::new(stores, activity.clone(), notifier.clone()),
            clients: ClientService::new(stores, activity.clone()),
            materials: ClientMaterialService::new(stores, activity.clone()),
            employees: EmployeeService::new(stores, activity.clone()),
            leave: LeaveService::new(stores, activity.clone(), notifier),
            resources: ResourceService::new(stores, activity.clone()),
            users: UserService::new(stores, &config.auth, activity.clone()),
            roles: RoleService::new(stores, activity.clone()),
            lookups: LookupService::new(stores, activity.clone()),
            templates: DocumentTemplateService::new(stores, activity.clone()),
            dashboard: DashboardService::new(stores),
            attachments: AttachmentAccess::new(
                stores,
                storage,
                AttachmentPolicy::from(&config.storage),
                activity.clone(),
            ),
            activity,
            notifications,
        }
    }
}

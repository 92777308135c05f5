//! Attachment access rules
//!
//! Files hang off a container record. Reading them follows the read rule of
//! the container; uploading also needs `attachments.upload`. Uploaders may
//! delete their own files, others need `attachments.delete`.

use std::sync::Arc;

use bytes::Bytes;
use fo_activity::ActivityLogger;
use fo_attachments::{AttachmentPolicy, AttachmentService, Storage, Upload};
use fo_auth::permissions::{ATTACHMENTS_DELETE, ATTACHMENTS_UPLOAD};
use fo_auth::CurrentUser;
use fo_contracts::base::ensure_allowed;
use fo_contracts::{clients, employees, leave, resources, work_orders};
use fo_core::error::FoError;
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{ClientStore, EmployeeStore, LeaveStore, ResourceStore, Stores, WorkOrderStore};
use fo_models::{Attachment, AttachmentContainer};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::base::actor;

pub struct AttachmentAccess {
    files: AttachmentService,
    work_orders: Arc<dyn WorkOrderStore>,
    employees: Arc<dyn EmployeeStore>,
    clients: Arc<dyn ClientStore>,
    resources: Arc<dyn ResourceStore>,
    leave: Arc<dyn LeaveStore>,
    activity: ActivityLogger,
}

impl AttachmentAccess {
    pub fn new(stores: &Stores, storage: Arc<dyn Storage>, policy: AttachmentPolicy, activity: ActivityLogger) -> Self {
        Self {
            files: AttachmentService::new(stores.attachments.clone(), storage, policy),
            work_orders: stores.work_orders.clone(),
            employees: stores.employees.clone(),
            clients: stores.clients.clone(),
            resources: stores.resources.clone(),
            leave: stores.leave.clone(),
            activity,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        self.files.storage()
    }

    pub async fn list(&self, user: &CurrentUser, container: AttachmentContainer, container_id: Id) -> FoResult<Vec<Attachment>> {
        self.ensure_readable(user, container, container_id).await?;
        Ok(self.files.list(container, container_id).await?)
    }

    #[instrument(skip(self, user, upload, cancel), fields(user_id = user.id))]
    pub async fn upload(
        &self,
        user: &CurrentUser,
        container: AttachmentContainer,
        container_id: Id,
        upload: Upload,
        cancel: &CancellationToken,
    ) -> FoResult<Attachment> {
        ensure_allowed(user, ATTACHMENTS_UPLOAD)?;
        self.ensure_readable(user, container, container_id).await?;

        let attachment = self
            .files
            .upload(container, container_id, upload, actor(user), cancel)
            .await?;
        self.activity
            .created(
                actor(user),
                &attachment,
                format!("{} attached to {} {}", attachment.file_name, container, container_id),
            )
            .await;
        Ok(attachment)
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<Attachment> {
        let attachment = self.files.get(id).await?;
        self.ensure_readable(user, attachment.container_type, attachment.container_id)
            .await?;
        Ok(attachment)
    }

    pub async fn download(&self, user: &CurrentUser, id: Id) -> FoResult<(Attachment, Bytes)> {
        self.get(user, id).await?;
        Ok(self.files.download(id).await?)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        let attachment = self.get(user, id).await?;
        if attachment.created_by_id != Some(user.id) {
            ensure_allowed(user, ATTACHMENTS_DELETE)?;
        }

        let removed = self.files.delete(id, actor(user)).await?;
        self.activity
            .deleted(actor(user), &removed, format!("{} removed", removed.file_name))
            .await;
        Ok(())
    }

    /// The container exists and the user may read it
    async fn ensure_readable(&self, user: &CurrentUser, container: AttachmentContainer, id: Id) -> FoResult<()> {
        match container {
            AttachmentContainer::WorkOrder => {
                ensure_allowed(user, work_orders::permissions::VIEW)?;
                self.work_orders.find_by_id(id).await?.or_not_found("WorkOrder", id)?;
            }
            AttachmentContainer::Client => {
                ensure_allowed(user, clients::permissions::VIEW)?;
                self.clients.find_by_id(id).await?.or_not_found("Client", id)?;
            }
            AttachmentContainer::Resource => {
                ensure_allowed(user, resources::permissions::VIEW)?;
                self.resources.find_by_id(id).await?.or_not_found("Resource", id)?;
            }
            AttachmentContainer::Employee => {
                if user.employee_id != Some(id) {
                    ensure_allowed(user, employees::permissions::VIEW)?;
                }
                self.employees.find_by_id(id).await?.or_not_found("Employee", id)?;
            }
            AttachmentContainer::LeaveRequest => {
                let request = self.leave.find_by_id(id).await?.or_not_found("LeaveRequest", id)?;
                if user.employee_id != Some(request.employee_id) && !user.allowed(leave::permissions::REVIEW) {
                    return Err(FoError::forbidden("You may not access this leave request"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, create_client, seeded_stores, user_with};
    use fo_attachments::MemoryStorage;

    fn access(stores: &Stores) -> AttachmentAccess {
        AttachmentAccess::new(
            stores,
            Arc::new(MemoryStorage::new()),
            AttachmentPolicy::default(),
            ActivityLogger::new(stores.activity.clone()),
        )
    }

    fn report() -> Upload {
        Upload {
            file_name: "site-report.pdf".into(),
            content_type: Some("application/pdf".into()),
            data: Bytes::from_static(b"%PDF-1.7 site report"),
        }
    }

    #[tokio::test]
    async fn test_upload_list_download() {
        let stores = seeded_stores().await;
        let access = access(&stores);
        let client = create_client(&stores, "ACME").await;
        let cancel = CancellationToken::new();

        let attachment = access
            .upload(&admin(), AttachmentContainer::Client, client.id, report(), &cancel)
            .await
            .unwrap();
        assert_eq!(attachment.created_by_id, Some(900));

        let listed = access
            .list(&admin(), AttachmentContainer::Client, client.id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let (meta, data) = access.download(&admin(), attachment.id).await.unwrap();
        assert_eq!(meta.file_name, "site-report.pdf");
        assert_eq!(&data[..], b"%PDF-1.7 site report");
    }

    #[tokio::test]
    async fn test_missing_container_is_not_found() {
        let stores = seeded_stores().await;
        let err = access(&stores)
            .upload(&admin(), AttachmentContainer::WorkOrder, 404, report(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_upload_and_delete_rules() {
        let stores = seeded_stores().await;
        let access = access(&stores);
        let client = create_client(&stores, "ACME").await;
        let cancel = CancellationToken::new();

        let reader = user_with(3, &[clients::permissions::VIEW]);
        let err = access
            .upload(&reader, AttachmentContainer::Client, client.id, report(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let uploader = user_with(4, &[clients::permissions::VIEW, ATTACHMENTS_UPLOAD]);
        let own = access
            .upload(&uploader, AttachmentContainer::Client, client.id, report(), &cancel)
            .await
            .unwrap();
        let other = access
            .upload(&admin(), AttachmentContainer::Client, client.id, report(), &cancel)
            .await
            .unwrap();

        assert_eq!(access.delete(&uploader, other.id).await.unwrap_err().status_code(), 403);
        access.delete(&uploader, own.id).await.unwrap();
        assert_eq!(access.get(&admin(), own.id).await.unwrap_err().status_code(), 404);
    }
}

//! Client and client contact services

use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::clients::{permissions, ClientContactContract, CreateClientContract, UpdateClientContract};
use fo_core::error::FoError;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{ClientStore, Stores, WorkOrderStore};
use fo_models::{
    normalize_code, Client, ClientContact, NewClient, NewClientContact, UpdateClient, UpdateClientContact,
};
use tracing::{info, instrument};

use crate::base::{actor, clean, ensure_unique};

pub struct ClientService {
    clients: Arc<dyn ClientStore>,
    work_orders: Arc<dyn WorkOrderStore>,
    activity: ActivityLogger,
}

impl ClientService {
    pub fn new(stores: &Stores, activity: ActivityLogger) -> Self {
        Self {
            clients: stores.clients.clone(),
            work_orders: stores.work_orders.clone(),
            activity,
        }
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        q: Option<&str>,
        active: Option<bool>,
        pagination: Pagination,
    ) -> FoResult<PaginatedResult<Client>> {
        ensure_allowed(user, permissions::VIEW)?;
        Ok(self.clients.search(q, active, pagination).await?)
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<Client> {
        ensure_allowed(user, permissions::VIEW)?;
        self.find(id).await
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(&self, user: &CurrentUser, mut input: NewClient) -> FoResult<Client> {
        input.code = normalize_code(&input.code);
        input.name = input.name.trim().to_string();
        input.email = clean(input.email);

        CreateClientContract::new(user).check(&input)?;
        ensure_unique(self.clients.is_code_unique(&input.code, None).await?, "code")?;

        let client = self.clients.create(input, actor(user)).await?;
        info!(id = client.id, code = %client.code, "Client created");
        self.activity
            .created(actor(user), &client, format!("Client {} created", client.code))
            .await;
        Ok(client)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, id: Id, mut patch: UpdateClient) -> FoResult<Client> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        patch.code = patch.code.as_deref().map(normalize_code);
        patch.name = patch.name.map(|n| n.trim().to_string());

        UpdateClientContract::new(user).check(&patch)?;
        if let Some(code) = &patch.code {
            ensure_unique(self.clients.is_code_unique(code, Some(id)).await?, "code")?;
        }

        let updated = self.clients.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    /// Refused while the client still has open work orders
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;

        let open = self.work_orders.count_active_for_client(id).await?;
        if open > 0 {
            return Err(FoError::conflict(format!(
                "Client {} still has {} open work order(s)",
                current.code, open
            )));
        }

        self.clients.delete(id, actor(user)).await?;
        info!(id, code = %current.code, "Client deleted");
        self.activity
            .deleted(actor(user), &current, format!("Client {} deleted", current.code))
            .await;
        Ok(())
    }

    pub async fn list_contacts(&self, user: &CurrentUser, client_id: Id) -> FoResult<Vec<ClientContact>> {
        ensure_allowed(user, permissions::VIEW)?;
        self.find(client_id).await?;
        Ok(self.clients.list_contacts(client_id).await?)
    }

    pub async fn create_contact(
        &self,
        user: &CurrentUser,
        client_id: Id,
        mut input: NewClientContact,
    ) -> FoResult<ClientContact> {
        ensure_allowed(user, permissions::MANAGE)?;
        self.find(client_id).await?;
        input.client_id = client_id;
        input.full_name = input.full_name.trim().to_string();
        input.email = clean(input.email);

        ClientContactContract::new(user).check(&input)?;
        let contact = self.clients.create_contact(input, actor(user)).await?;
        self.activity
            .created(actor(user), &contact, format!("Contact {} added", contact.full_name))
            .await;
        Ok(contact)
    }

    pub async fn update_contact(
        &self,
        user: &CurrentUser,
        client_id: Id,
        contact_id: Id,
        mut patch: UpdateClientContact,
    ) -> FoResult<ClientContact> {
        let current = self.find_contact(client_id, contact_id).await?;
        patch.full_name = patch.full_name.map(|n| n.trim().to_string());

        ClientContactContract::new(user).check(&patch)?;
        let updated = self.clients.update_contact(contact_id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    pub async fn delete_contact(&self, user: &CurrentUser, client_id: Id, contact_id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find_contact(client_id, contact_id).await?;
        self.clients.delete_contact(contact_id, actor(user)).await?;
        self.activity
            .deleted(actor(user), &current, format!("Contact {} removed", current.full_name))
            .await;
        Ok(())
    }

    async fn find(&self, id: Id) -> FoResult<Client> {
        self.clients.find_by_id(id).await?.or_not_found("Client", id)
    }

    /// The contact must belong to the client in the path
    async fn find_contact(&self, client_id: Id, contact_id: Id) -> FoResult<ClientContact> {
        self.clients
            .find_contact(contact_id)
            .await?
            .filter(|c| c.client_id == client_id)
            .or_not_found("ClientContact", contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, seeded_stores, user_with};
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use fo_models::{NewWorkOrder, WorkOrderStatus};

    fn service(stores: &Stores) -> ClientService {
        ClientService::new(stores, ActivityLogger::new(stores.activity.clone()))
    }

    fn new_client(code: &str) -> NewClient {
        NewClient {
            code: code.into(),
            name: " Northwind Utilities ".into(),
            tax_number: None,
            email: Some(SafeEmail().fake()),
            phone: None,
            address: None,
            is_active: None,
        }
    }

    fn new_contact(primary: bool) -> NewClientContact {
        NewClientContact {
            client_id: 0,
            full_name: Name().fake(),
            position: Some("Facility manager".into()),
            email: None,
            phone: None,
            is_primary: primary,
        }
    }

    #[tokio::test]
    async fn test_codes_are_normalized_and_unique() {
        let stores = seeded_stores().await;
        let service = service(&stores);

        let client = service.create(&admin(), new_client(" nw-01 ")).await.unwrap();
        assert_eq!(client.code, "NW-01");
        assert_eq!(client.name, "Northwind Utilities");

        let err = service.create(&admin(), new_client("NW-01")).await.unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("code")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_keeps_own_code() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let client = service.create(&admin(), new_client("NW-01")).await.unwrap();

        let patch = UpdateClient {
            code: Some("nw-01".into()),
            phone: Some(Some("+31 20 555 0100".into())),
            ..Default::default()
        };
        let updated = service.update(&admin(), client.id, patch).await.unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+31 20 555 0100"));
    }

    #[tokio::test]
    async fn test_client_with_open_work_cannot_be_deleted() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let client = service.create(&admin(), new_client("NW-01")).await.unwrap();
        let order = stores
            .work_orders
            .create(
                NewWorkOrder {
                    title: "Meter exchange".into(),
                    client_id: client.id,
                    status: Some(WorkOrderStatus::Open),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let err = service.delete(&admin(), client.id).await.unwrap_err();
        assert_eq!(err.status_code(), 409);

        stores.work_orders.delete(order.id, None).await.unwrap();
        service.delete(&admin(), client.id).await.unwrap();
        assert_eq!(service.get(&admin(), client.id).await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_contacts_are_scoped_to_their_client() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let first = service.create(&admin(), new_client("NW-01")).await.unwrap();
        let second = service.create(&admin(), new_client("NW-02")).await.unwrap();

        let contact = service
            .create_contact(&admin(), first.id, new_contact(true))
            .await
            .unwrap();
        assert_eq!(contact.client_id, first.id);

        let err = service
            .update_contact(&admin(), second.id, contact.id, UpdateClientContact::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let contacts = service.list_contacts(&admin(), first.id).await.unwrap();
        assert_eq!(contacts.len(), 1);

        service.delete_contact(&admin(), first.id, contact.id).await.unwrap();
        assert!(service.list_contacts(&admin(), first.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_viewers_cannot_write() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let viewer = user_with(4, &[permissions::VIEW]);

        assert_eq!(
            service.create(&viewer, new_client("NW-01")).await.unwrap_err().status_code(),
            403
        );
        let page = service.list(&viewer, None, None, Pagination::new(20, 0)).await.unwrap();
        assert_eq!(page.total, 0);
    }
}

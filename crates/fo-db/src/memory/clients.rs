use async_trait::async_trait;
use chrono::Utc;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::patch::apply;
use fo_models::{
    Client, ClientContact, ClientMaterial, NewClient, NewClientContact, NewClientMaterial, UpdateClient,
    UpdateClientContact, UpdateClientMaterial,
};

use super::table::{contains_ci, search_term, slice, MemoryTable};
use crate::clients::ClientStore;
use crate::materials::ClientMaterialStore;
use crate::repository::{Repository, RepositoryError, RepositoryResult};

#[derive(Default)]
pub struct MemoryClientStore {
    clients: MemoryTable<Client>,
    contacts: MemoryTable<ClientContact>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn demote_other_contacts(&self, client_id: Id, keep_id: Id, actor: Option<Id>) {
        self.contacts.update_where(
            actor,
            |c| c.client_id == client_id && c.id != keep_id && c.is_primary,
            |c| c.is_primary = false,
        );
    }
}

#[async_trait]
impl Repository<Client, NewClient, UpdateClient> for MemoryClientStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Client>> {
        Ok(self.clients.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Client>> {
        let mut clients = self.clients.all();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(slice(clients, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.clients.count())
    }

    async fn create(&self, dto: NewClient, actor: Option<Id>) -> RepositoryResult<Client> {
        let code = dto.code.clone();
        let now = Utc::now();
        self.clients
            .insert_unless(
                |c| c.code == code,
                |id| Client {
                    id,
                    code: dto.code,
                    name: dto.name,
                    tax_number: dto.tax_number,
                    email: dto.email,
                    phone: dto.phone,
                    address: dto.address,
                    is_active: dto.is_active.unwrap_or(true),
                    created_at: now,
                    updated_at: now,
                    created_by_id: actor,
                    updated_by_id: actor,
                    deleted_at: None,
                },
            )
            .ok_or_else(|| RepositoryError::Conflict(format!("Client code {} is taken", code)))
    }

    async fn update(&self, id: Id, dto: UpdateClient, actor: Option<Id>) -> RepositoryResult<Client> {
        self.clients.update(id, actor, |client| {
            if let Some(code) = dto.code {
                client.code = code;
            }
            if let Some(name) = dto.name {
                client.name = name;
            }
            apply(&mut client.tax_number, dto.tax_number);
            apply(&mut client.email, dto.email);
            apply(&mut client.phone, dto.phone);
            apply(&mut client.address, dto.address);
            if let Some(is_active) = dto.is_active {
                client.is_active = is_active;
            }
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.clients.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Client> {
        self.clients.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.clients.get(id).is_some())
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self.clients.any(|c| c.code == code && Some(c.id) != exclude_id))
    }

    async fn search(
        &self,
        q: Option<&str>,
        active: Option<bool>,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<Client>> {
        let term = search_term(q);
        let mut clients = self.clients.filter(|c| {
            active.map_or(true, |a| c.is_active == a)
                && term.map_or(true, |t| contains_ci(&c.code, t) || contains_ci(&c.name, t))
        });
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        let total = clients.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(clients), total, pagination))
    }

    async fn list_contacts(&self, client_id: Id) -> RepositoryResult<Vec<ClientContact>> {
        let mut contacts = self.contacts.filter(|c| c.client_id == client_id);
        contacts.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        Ok(contacts)
    }

    async fn find_contact(&self, id: Id) -> RepositoryResult<Option<ClientContact>> {
        Ok(self.contacts.get(id))
    }

    async fn create_contact(&self, dto: NewClientContact, actor: Option<Id>) -> RepositoryResult<ClientContact> {
        let now = Utc::now();
        let contact = self.contacts.insert(ClientContact {
            id: self.contacts.next_id(),
            client_id: dto.client_id,
            full_name: dto.full_name,
            position: dto.position,
            email: dto.email,
            phone: dto.phone,
            is_primary: dto.is_primary,
            created_at: now,
            updated_at: now,
            created_by_id: actor,
            updated_by_id: actor,
            deleted_at: None,
        });
        if contact.is_primary {
            self.demote_other_contacts(contact.client_id, contact.id, actor);
        }
        Ok(contact)
    }

    async fn update_contact(
        &self,
        id: Id,
        dto: UpdateClientContact,
        actor: Option<Id>,
    ) -> RepositoryResult<ClientContact> {
        let contact = self.contacts.update(id, actor, |contact| {
            if let Some(full_name) = dto.full_name {
                contact.full_name = full_name;
            }
            apply(&mut contact.position, dto.position);
            apply(&mut contact.email, dto.email);
            apply(&mut contact.phone, dto.phone);
            if let Some(is_primary) = dto.is_primary {
                contact.is_primary = is_primary;
            }
        })?;
        if contact.is_primary {
            self.demote_other_contacts(contact.client_id, contact.id, actor);
        }
        Ok(contact)
    }

    async fn delete_contact(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.contacts.update(id, actor, |contact| contact.is_primary = false)?;
        self.contacts.soft_delete(id, actor)
    }
}

#[derive(Default)]
pub struct MemoryClientMaterialStore {
    materials: MemoryTable<ClientMaterial>,
}

impl MemoryClientMaterialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<ClientMaterial, NewClientMaterial, UpdateClientMaterial> for MemoryClientMaterialStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ClientMaterial>> {
        Ok(self.materials.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<ClientMaterial>> {
        let mut materials = self.materials.all();
        materials.sort_by(|a, b| (a.client_id, &a.code).cmp(&(b.client_id, &b.code)));
        Ok(slice(materials, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.materials.count())
    }

    async fn create(&self, dto: NewClientMaterial, actor: Option<Id>) -> RepositoryResult<ClientMaterial> {
        let (client_id, code) = (dto.client_id, dto.code.clone());
        let now = Utc::now();
        self.materials
            .insert_unless(
                |m| m.client_id == client_id && m.code == code,
                |id| ClientMaterial {
                    id,
                    client_id,
                    code: dto.code,
                    name: dto.name,
                    description: dto.description,
                    unit: dto.unit,
                    unit_price: dto.unit_price,
                    is_active: dto.is_active.unwrap_or(true),
                    created_at: now,
                    updated_at: now,
                    created_by_id: actor,
                    updated_by_id: actor,
                    deleted_at: None,
                },
            )
            .ok_or_else(|| RepositoryError::Conflict(format!("Material code {} is taken", code)))
    }

    async fn update(&self, id: Id, dto: UpdateClientMaterial, actor: Option<Id>) -> RepositoryResult<ClientMaterial> {
        self.materials.update(id, actor, |material| {
            if let Some(code) = dto.code {
                material.code = code;
            }
            if let Some(name) = dto.name {
                material.name = name;
            }
            apply(&mut material.description, dto.description);
            if let Some(unit) = dto.unit {
                material.unit = unit;
            }
            apply(&mut material.unit_price, dto.unit_price);
            if let Some(is_active) = dto.is_active {
                material.is_active = is_active;
            }
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.materials.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<ClientMaterial> {
        self.materials.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.materials.get(id).is_some())
    }
}

#[async_trait]
impl ClientMaterialStore for MemoryClientMaterialStore {
    async fn find_by_client(
        &self,
        client_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ClientMaterial>> {
        let mut materials = self.materials.filter(|m| m.client_id == client_id);
        materials.sort_by(|a, b| a.code.cmp(&b.code));
        let total = materials.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(materials), total, pagination))
    }

    async fn is_code_unique(&self, client_id: Id, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self
            .materials
            .any(|m| m.client_id == client_id && m.code == code && Some(m.id) != exclude_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(client_id: Id, name: &str, is_primary: bool) -> NewClientContact {
        NewClientContact {
            client_id,
            full_name: name.to_string(),
            position: None,
            email: None,
            phone: None,
            is_primary,
        }
    }

    fn material(client_id: Id, code: &str) -> NewClientMaterial {
        NewClientMaterial {
            client_id,
            code: code.to_string(),
            name: "Cement".into(),
            description: None,
            unit: "kg".into(),
            unit_price: Some(4.5),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_single_primary_contact() {
        let store = MemoryClientStore::new();
        let first = store.create_contact(contact(1, "Zoe", true), None).await.unwrap();
        let second = store.create_contact(contact(1, "Adam", true), None).await.unwrap();
        store.create_contact(contact(2, "Other", true), None).await.unwrap();

        let contacts = store.list_contacts(1).await.unwrap();
        assert_eq!(contacts[0].id, second.id);
        assert!(!contacts.iter().find(|c| c.id == first.id).unwrap().is_primary);
        assert!(store.list_contacts(2).await.unwrap()[0].is_primary);

        store
            .update_contact(
                first.id,
                UpdateClientContact {
                    is_primary: Some(true),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        let contacts = store.list_contacts(1).await.unwrap();
        assert_eq!(contacts.iter().filter(|c| c.is_primary).count(), 1);
        assert_eq!(contacts[0].id, first.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_material_creates_admit_one() {
        let store = std::sync::Arc::new(MemoryClientMaterialStore::new());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(material(1, "CEM-42"), None).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, RepositoryError::Conflict(_))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.find_by_client(1, Pagination::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_material_price_can_be_cleared() {
        let store = MemoryClientMaterialStore::new();
        let cement = store.create(material(1, "CEM-42"), None).await.unwrap();

        let renamed = store
            .update(
                cement.id,
                UpdateClientMaterial {
                    name: Some("Portland cement".into()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(renamed.unit_price, Some(4.5));

        let cleared = store
            .update(
                cement.id,
                UpdateClientMaterial {
                    unit_price: Some(None),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(cleared.unit_price, None);
        assert_eq!(cleared.name, "Portland cement");
    }

    #[tokio::test]
    async fn test_material_codes_scoped_per_client() {
        let store = MemoryClientMaterialStore::new();
        let cement = store.create(material(1, "CEM-42"), None).await.unwrap();

        assert!(!store.is_code_unique(1, "CEM-42", None).await.unwrap());
        assert!(store.is_code_unique(1, "CEM-42", Some(cement.id)).await.unwrap());
        assert!(store.is_code_unique(2, "CEM-42", None).await.unwrap());
        store.create(material(2, "CEM-42"), None).await.unwrap();

        store.delete(cement.id, None).await.unwrap();
        assert!(store.is_code_unique(1, "CEM-42", None).await.unwrap());
        assert_eq!(store.find_by_client(1, Pagination::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_search_filters_active() {
        let store = MemoryClientStore::new();
        for (code, active) in [("ACME", true), ("GLOBEX", false)] {
            store
                .create(
                    NewClient {
                        code: code.into(),
                        name: code.to_lowercase(),
                        tax_number: None,
                        email: None,
                        phone: None,
                        address: None,
                        is_active: Some(active),
                    },
                    None,
                )
                .await
                .unwrap();
        }

        let result = store.search(None, Some(true), Pagination::default()).await.unwrap();
        assert_eq!(result.total, 1);
        let result = store.search(Some("glob"), None, Pagination::default()).await.unwrap();
        assert_eq!(result.items[0].code, "GLOBEX");
    }
}

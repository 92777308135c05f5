//! Client material catalog
//!
//! Material codes are unique per client. A second material with the same
//! code for the same client is a validation failure on `code`.

use std::sync::Arc;

use fo_activity::ActivityLogger;
use fo_auth::CurrentUser;
use fo_contracts::base::{ensure_allowed, Contract};
use fo_contracts::materials::{permissions, CreateMaterialContract, UpdateMaterialContract};
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::result::{FoResult, OptionExt};
use fo_core::traits::Id;
use fo_db::{ClientMaterialStore, ClientStore, Stores};
use fo_models::{normalize_code, ClientMaterial, NewClientMaterial, UpdateClientMaterial};
use tracing::{info, instrument};

use crate::base::{actor, clean, ensure_unique};

pub struct ClientMaterialService {
    materials: Arc<dyn ClientMaterialStore>,
    clients: Arc<dyn ClientStore>,
    activity: ActivityLogger,
}

impl ClientMaterialService {
    pub fn new(stores: &Stores, activity: ActivityLogger) -> Self {
        Self {
            materials: stores.materials.clone(),
            clients: stores.clients.clone(),
            activity,
        }
    }

    pub async fn list_for_client(
        &self,
        user: &CurrentUser,
        client_id: Id,
        pagination: Pagination,
    ) -> FoResult<PaginatedResult<ClientMaterial>> {
        ensure_allowed(user, permissions::VIEW)?;
        self.ensure_client(client_id).await?;
        Ok(self.materials.find_by_client(client_id, pagination).await?)
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> FoResult<ClientMaterial> {
        ensure_allowed(user, permissions::VIEW)?;
        self.find(id).await
    }

    #[instrument(skip(self, user, input), fields(user_id = user.id))]
    pub async fn create(
        &self,
        user: &CurrentUser,
        client_id: Id,
        mut input: NewClientMaterial,
    ) -> FoResult<ClientMaterial> {
        input.client_id = client_id;
        input.code = normalize_code(&input.code);
        input.name = input.name.trim().to_string();
        input.unit = input.unit.trim().to_string();
        input.description = clean(input.description);

        CreateMaterialContract::new(user).check(&input)?;
        self.ensure_client(client_id).await?;
        ensure_unique(
            self.materials.is_code_unique(client_id, &input.code, None).await?,
            "code",
        )?;

        let material = self.materials.create(input, actor(user)).await?;
        info!(id = material.id, client_id, code = %material.code, "Material created");
        self.activity
            .created(actor(user), &material, format!("Material {} created", material.code))
            .await;
        Ok(material)
    }

    #[instrument(skip(self, user, patch), fields(user_id = user.id))]
    pub async fn update(&self, user: &CurrentUser, id: Id, mut patch: UpdateClientMaterial) -> FoResult<ClientMaterial> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        patch.code = patch.code.as_deref().map(normalize_code);
        patch.name = patch.name.map(|n| n.trim().to_string());
        patch.unit = patch.unit.map(|u| u.trim().to_string());

        UpdateMaterialContract::new(user).check(&patch)?;
        if let Some(code) = &patch.code {
            ensure_unique(
                self.materials
                    .is_code_unique(current.client_id, code, Some(id))
                    .await?,
                "code",
            )?;
        }

        let updated = self.materials.update(id, patch, actor(user)).await?;
        self.activity.updated(actor(user), &current, &updated).await;
        Ok(updated)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> FoResult<()> {
        ensure_allowed(user, permissions::MANAGE)?;
        let current = self.find(id).await?;
        self.materials.delete(id, actor(user)).await?;
        self.activity
            .deleted(actor(user), &current, format!("Material {} deleted", current.code))
            .await;
        Ok(())
    }

    async fn find(&self, id: Id) -> FoResult<ClientMaterial> {
        self.materials
            .find_by_id(id)
            .await?
            .or_not_found("ClientMaterial", id)
    }

    /// Deleted clients are treated as missing
    async fn ensure_client(&self, client_id: Id) -> FoResult<()> {
        self.clients
            .find_by_id(client_id)
            .await?
            .map(|_| ())
            .or_not_found("Client", client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TAKEN;
    use crate::test_support::{admin, create_client, seeded_stores};
    use fo_core::error::FoError;

    fn service(stores: &Stores) -> ClientMaterialService {
        ClientMaterialService::new(stores, ActivityLogger::new(stores.activity.clone()))
    }

    fn cement(code: &str) -> NewClientMaterial {
        NewClientMaterial {
            client_id: 0,
            code: code.into(),
            name: "Portland cement".into(),
            description: None,
            unit: "bag".into(),
            unit_price: Some(7.5),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_for_same_client_is_rejected() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let client = create_client(&stores, "ACME").await;

        let material = service.create(&admin(), client.id, cement(" cem-42 ")).await.unwrap();
        assert_eq!(material.code, "CEM-42");

        let err = service.create(&admin(), client.id, cement("CEM-42")).await.unwrap_err();
        match err {
            FoError::Validation(errors) => {
                assert_eq!(errors.get("code"), Some(&vec![TAKEN.to_string()]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_code_for_another_client_is_fine() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let first = create_client(&stores, "ACME").await;
        let second = create_client(&stores, "GLOBEX").await;

        service.create(&admin(), first.id, cement("CEM-42")).await.unwrap();
        service.create(&admin(), second.id, cement("CEM-42")).await.unwrap();

        let page = service
            .list_for_client(&admin(), second.id, Pagination::new(20, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_deleted_client_is_missing() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let client = create_client(&stores, "ACME").await;
        stores.clients.delete(client.id, None).await.unwrap();

        let err = service.create(&admin(), client.id, cement("CEM-1")).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_deleted_material_is_excluded() {
        let stores = seeded_stores().await;
        let service = service(&stores);
        let client = create_client(&stores, "ACME").await;
        let material = service.create(&admin(), client.id, cement("CEM-1")).await.unwrap();

        service.delete(&admin(), material.id).await.unwrap();
        assert_eq!(service.get(&admin(), material.id).await.unwrap_err().status_code(), 404);
        let page = service
            .list_for_client(&admin(), client.id, Pagination::new(20, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        // the code is free again
        service.create(&admin(), client.id, cement("CEM-1")).await.unwrap();
    }
}

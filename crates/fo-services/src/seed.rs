//! Reference data seeding
//!
//! Idempotent: permissions are upserted, roles and lookups are only created
//! when missing. The Administrator role is re-synced to the full catalog on
//! every run so new permissions reach it.

use fo_auth::{builtin_roles, catalog, PasswordHasher};
use fo_contracts::base::ADMIN_ROLE;
use fo_contracts::users::{validate_password, validate_username};
use fo_core::error::{FoError, ValidationErrors};
use fo_core::result::FoResult;
use fo_db::{CreateUserDto, Stores};
use fo_models::{leave_status, LookupKind, NewLookup, NewPermission, NewRole, User};
use tracing::{info, instrument};

use crate::base::ensure_unique;

/// Lookups every installation starts with
const DEFAULT_LOOKUPS: &[(LookupKind, &str, &str)] = &[
    (LookupKind::LeaveType, "ANNUAL", "Annual leave"),
    (LookupKind::LeaveType, "SICK", "Sick leave"),
    (LookupKind::LeaveType, "UNPAID", "Unpaid leave"),
    (LookupKind::LeaveType, "PARENTAL", "Parental leave"),
    (LookupKind::LeaveStatus, leave_status::PENDING, "Pending"),
    (LookupKind::LeaveStatus, leave_status::APPROVED, "Approved"),
    (LookupKind::LeaveStatus, leave_status::REJECTED, "Rejected"),
    (LookupKind::LeaveStatus, leave_status::CANCELLED, "Cancelled"),
    (LookupKind::Department, "OPS", "Field operations"),
    (LookupKind::Department, "MAINT", "Maintenance"),
    (LookupKind::Department, "ADMIN", "Administration"),
    (LookupKind::Department, "HR", "Human resources"),
    (LookupKind::ResourceCategory, "VEHICLE", "Vehicles"),
    (LookupKind::ResourceCategory, "TOOL", "Tools"),
    (LookupKind::ResourceCategory, "EQUIPMENT", "Equipment"),
];

/// Username of the account created by `ensure_admin`
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions: usize,
    pub roles_created: usize,
    pub lookups_created: usize,
}

/// Credentials for a new administrator
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct Seeder {
    stores: Stores,
    hasher: PasswordHasher,
}

impl Seeder {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            hasher: PasswordHasher::new(),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> FoResult<SeedReport> {
        let report = SeedReport {
            permissions: self.seed_permissions().await?,
            roles_created: self.seed_roles().await?,
            lookups_created: self.seed_lookups().await?,
        };
        info!(
            permissions = report.permissions,
            roles = report.roles_created,
            lookups = report.lookups_created,
            "Reference data seeded"
        );
        Ok(report)
    }

    pub async fn seed_permissions(&self) -> FoResult<usize> {
        for def in catalog() {
            self.stores
                .roles
                .upsert_permission(NewPermission {
                    code: def.code.to_string(),
                    name: def.name.to_string(),
                    category: def.category.to_string(),
                })
                .await?;
        }
        Ok(catalog().len())
    }

    pub async fn seed_roles(&self) -> FoResult<usize> {
        let mut created = 0;
        for definition in builtin_roles() {
            match self.stores.roles.find_by_name(definition.name).await? {
                None => {
                    let role = NewRole {
                        name: definition.name.to_string(),
                        description: Some(definition.description.to_string()),
                        permissions: definition.permissions,
                        is_system: true,
                    };
                    self.stores.roles.create(role, None).await?;
                    created += 1;
                }
                Some(existing) if existing.name == ADMIN_ROLE => {
                    self.stores
                        .roles
                        .set_permissions(existing.id, &definition.permissions)
                        .await?;
                }
                Some(_) => {}
            }
        }
        Ok(created)
    }

    pub async fn seed_lookups(&self) -> FoResult<usize> {
        let mut created = 0;
        let mut previous_kind = None;
        let mut sort_order = 0;

        for (kind, code, name) in DEFAULT_LOOKUPS {
            if previous_kind != Some(*kind) {
                previous_kind = Some(*kind);
                sort_order = 0;
            }
            sort_order += 10;

            if self.stores.lookups.find_by_code(*kind, code).await?.is_some() {
                continue;
            }
            let lookup = NewLookup {
                kind: *kind,
                code: code.to_string(),
                name: name.to_string(),
                sort_order,
                is_active: true,
            };
            self.stores.lookups.create(lookup, None).await?;
            created += 1;
        }
        Ok(created)
    }

    /// Creates an active account holding the Administrator role
    #[instrument(skip(self, account), fields(username = %account.username))]
    pub async fn create_admin(&self, account: AdminAccount) -> FoResult<User> {
        let username = account.username.trim().to_string();
        let email = account.email.trim().to_lowercase();

        let mut errors = ValidationErrors::new();
        validate_username(&username, &mut errors);
        validate_password("password", &account.password, &mut errors);
        if !email.contains('@') {
            errors.add("email", "is not a valid email address");
        }
        errors.into_result().map_err(FoError::Validation)?;

        ensure_unique(self.stores.users.is_username_unique(&username, None).await?, "username")?;
        ensure_unique(self.stores.users.is_email_unique(&email, None).await?, "email")?;

        self.seed_permissions().await?;
        self.seed_roles().await?;

        let password_hash = self.hasher.hash(&account.password)?;
        let user = self
            .stores
            .users
            .create(
                CreateUserDto {
                    username,
                    email,
                    first_name: "System".to_string(),
                    last_name: "Administrator".to_string(),
                    password_hash,
                    is_active: true,
                    employee_id: None,
                },
                None,
            )
            .await?;
        let user = self
            .stores
            .users
            .set_roles(user.id, &[ADMIN_ROLE.to_string()])
            .await?;

        info!(id = user.id, "Administrator created");
        Ok(user)
    }

    /// Creates the default administrator when no account uses its name yet
    pub async fn ensure_admin(&self, password: &str) -> FoResult<Option<User>> {
        if self
            .stores
            .users
            .find_by_username(DEFAULT_ADMIN_USERNAME)
            .await?
            .is_some()
        {
            return Ok(None);
        }
        let account = AdminAccount {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            email: "admin@fieldops.local".to_string(),
            password: password.to_string(),
        };
        self.create_admin(account).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let stores = Stores::memory();
        let seeder = Seeder::new(stores.clone());

        let first = seeder.run().await.unwrap();
        assert_eq!(first.permissions, catalog().len());
        assert_eq!(first.roles_created, 5);
        assert_eq!(first.lookups_created, DEFAULT_LOOKUPS.len());

        let second = seeder.run().await.unwrap();
        assert_eq!(second.roles_created, 0);
        assert_eq!(second.lookups_created, 0);

        let pending = stores
            .lookups
            .find_by_code(LookupKind::LeaveStatus, leave_status::PENDING)
            .await
            .unwrap();
        assert!(pending.is_some());
    }

    #[tokio::test]
    async fn test_create_admin() {
        let stores = Stores::memory();
        let seeder = Seeder::new(stores.clone());

        let user = seeder
            .create_admin(AdminAccount {
                username: "root".into(),
                email: "Root@Example.com".into(),
                password: "sup3r-secret".into(),
            })
            .await
            .unwrap();
        assert_eq!(user.roles, vec![ADMIN_ROLE.to_string()]);
        assert_eq!(user.email, "root@example.com");

        let permissions = stores.roles.permissions_for_roles(&user.roles).await.unwrap();
        assert_eq!(permissions.len(), catalog().len());

        let duplicate = seeder
            .create_admin(AdminAccount {
                username: "root".into(),
                email: "other@example.com".into(),
                password: "sup3r-secret".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(duplicate.status_code(), 422);
    }

    #[tokio::test]
    async fn test_create_admin_rejects_weak_password() {
        let seeder = Seeder::new(Stores::memory());
        let err = seeder
            .create_admin(AdminAccount {
                username: "root".into(),
                email: "root@example.com".into(),
                password: "short".into(),
            })
            .await
            .unwrap_err();
        match err {
            FoError::Validation(errors) => assert!(errors.has_error("password")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ensure_admin_runs_once() {
        let seeder = Seeder::new(Stores::memory());
        assert!(seeder.ensure_admin("changeme123").await.unwrap().is_some());
        assert!(seeder.ensure_admin("changeme123").await.unwrap().is_none());
    }
}

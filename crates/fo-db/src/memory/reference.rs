use async_trait::async_trait;
use chrono::Utc;
use fo_core::traits::Id;
use fo_models::patch::apply;
use fo_models::{
    DocumentTemplate, Lookup, LookupKind, NewDocumentTemplate, NewLookup, UpdateDocumentTemplate, UpdateLookup,
};

use super::table::{slice, MemoryTable};
use crate::lookups::LookupStore;
use crate::repository::{Repository, RepositoryError, RepositoryResult};
use crate::templates::DocumentTemplateStore;

fn lookup_order(a: &Lookup, b: &Lookup) -> std::cmp::Ordering {
    (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name))
}

#[derive(Default)]
pub struct MemoryLookupStore {
    lookups: MemoryTable<Lookup>,
}

impl MemoryLookupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<Lookup, NewLookup, UpdateLookup> for MemoryLookupStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Lookup>> {
        Ok(self.lookups.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Lookup>> {
        let mut lookups = self.lookups.all();
        lookups.sort_by(|a, b| a.kind.as_str().cmp(b.kind.as_str()).then_with(|| lookup_order(a, b)));
        Ok(slice(lookups, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.lookups.count())
    }

    async fn create(&self, dto: NewLookup, actor: Option<Id>) -> RepositoryResult<Lookup> {
        let (kind, code) = (dto.kind, dto.code.clone());
        let now = Utc::now();
        self.lookups
            .insert_unless(
                |l| l.kind == kind && l.code == code,
                |id| Lookup {
                    id,
                    kind,
                    code: dto.code,
                    name: dto.name,
                    sort_order: dto.sort_order,
                    is_active: dto.is_active,
                    created_at: now,
                    updated_at: now,
                    created_by_id: actor,
                    updated_by_id: actor,
                    deleted_at: None,
                },
            )
            .ok_or_else(|| RepositoryError::Conflict(format!("Lookup {}/{} already exists", kind, code)))
    }

    async fn update(&self, id: Id, dto: UpdateLookup, actor: Option<Id>) -> RepositoryResult<Lookup> {
        self.lookups.update(id, actor, |lookup| {
            if let Some(name) = dto.name {
                lookup.name = name;
            }
            if let Some(sort_order) = dto.sort_order {
                lookup.sort_order = sort_order;
            }
            if let Some(is_active) = dto.is_active {
                lookup.is_active = is_active;
            }
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.lookups.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Lookup> {
        self.lookups.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.lookups.get(id).is_some())
    }
}

#[async_trait]
impl LookupStore for MemoryLookupStore {
    async fn list(&self, kind: LookupKind, include_inactive: bool) -> RepositoryResult<Vec<Lookup>> {
        let mut lookups = self
            .lookups
            .filter(|l| l.kind == kind && (include_inactive || l.is_active));
        lookups.sort_by(lookup_order);
        Ok(lookups)
    }

    async fn find_by_code(&self, kind: LookupKind, code: &str) -> RepositoryResult<Option<Lookup>> {
        Ok(self.lookups.find(|l| l.kind == kind && l.code == code))
    }

    async fn is_code_unique(&self, kind: LookupKind, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self
            .lookups
            .any(|l| l.kind == kind && l.code == code && Some(l.id) != exclude_id))
    }
}

#[derive(Default)]
pub struct MemoryDocumentTemplateStore {
    templates: MemoryTable<DocumentTemplate>,
}

impl MemoryDocumentTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<DocumentTemplate, NewDocumentTemplate, UpdateDocumentTemplate> for MemoryDocumentTemplateStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<DocumentTemplate>> {
        Ok(self.templates.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<DocumentTemplate>> {
        let mut templates = self.templates.all();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(slice(templates, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.templates.count())
    }

    async fn create(&self, dto: NewDocumentTemplate, actor: Option<Id>) -> RepositoryResult<DocumentTemplate> {
        let code = dto.code.clone();
        let now = Utc::now();
        self.templates
            .insert_unless(
                |t| t.code == code,
                |id| DocumentTemplate {
                    id,
                    code: dto.code,
                    name: dto.name,
                    category: dto.category,
                    content: dto.content,
                    is_active: dto.is_active.unwrap_or(true),
                    created_at: now,
                    updated_at: now,
                    created_by_id: actor,
                    updated_by_id: actor,
                    deleted_at: None,
                },
            )
            .ok_or_else(|| RepositoryError::Conflict(format!("Template code {} is taken", code)))
    }

    async fn update(
        &self,
        id: Id,
        dto: UpdateDocumentTemplate,
        actor: Option<Id>,
    ) -> RepositoryResult<DocumentTemplate> {
        self.templates.update(id, actor, |template| {
            if let Some(name) = dto.name {
                template.name = name;
            }
            apply(&mut template.category, dto.category);
            if let Some(content) = dto.content {
                template.content = content;
            }
            if let Some(is_active) = dto.is_active {
                template.is_active = is_active;
            }
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.templates.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<DocumentTemplate> {
        self.templates.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.templates.get(id).is_some())
    }
}

#[async_trait]
impl DocumentTemplateStore for MemoryDocumentTemplateStore {
    async fn find_by_code(&self, code: &str) -> RepositoryResult<Option<DocumentTemplate>> {
        Ok(self.templates.find(|t| t.code == code))
    }

    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self.templates.any(|t| t.code == code && Some(t.id) != exclude_id))
    }
}

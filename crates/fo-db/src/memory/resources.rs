use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use fo_core::pagination::{PaginatedResult, Pagination};
use fo_core::traits::Id;
use fo_models::patch::apply;
use fo_models::{
    NewResource, NewResourceAssignment, Resource, ResourceAssignment, ResourceFilter, ResourceStatus,
    UpdateResource,
};
use parking_lot::RwLock;

use super::table::{contains_ci, search_term, slice, MemoryTable};
use crate::repository::{Repository, RepositoryError, RepositoryResult};
use crate::resources::ResourceStore;

/// Resources plus their assignment history. Assignments are never
/// deleted, only released.
pub struct MemoryResourceStore {
    resources: MemoryTable<Resource>,
    assignments: RwLock<BTreeMap<Id, ResourceAssignment>>,
    next_assignment_id: AtomicI64,
}

impl Default for MemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self {
            resources: MemoryTable::new(),
            assignments: RwLock::new(BTreeMap::new()),
            next_assignment_id: AtomicI64::new(1),
        }
    }

    fn mark_resource(&self, resource_id: Id, status: ResourceStatus, actor: Option<Id>) {
        // Deleted resources keep their status
        let _ = self.resources.update(resource_id, actor, |r| r.status = status);
    }
}

#[async_trait]
impl Repository<Resource, NewResource, UpdateResource> for MemoryResourceStore {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Resource>> {
        Ok(self.resources.get(id))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Resource>> {
        let mut resources = self.resources.all();
        resources.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(slice(resources, limit, offset))
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.resources.count())
    }

    async fn create(&self, dto: NewResource, actor: Option<Id>) -> RepositoryResult<Resource> {
        let code = dto.code.clone();
        let now = Utc::now();
        self.resources
            .insert_unless(
                |r| r.code == code,
                |id| Resource {
                    id,
                    code: dto.code,
                    name: dto.name,
                    category_id: dto.category_id,
                    serial_number: dto.serial_number,
                    location: dto.location,
                    purchase_date: dto.purchase_date,
                    status: ResourceStatus::Available,
                    notes: dto.notes,
                    created_at: now,
                    updated_at: now,
                    created_by_id: actor,
                    updated_by_id: actor,
                    deleted_at: None,
                },
            )
            .ok_or_else(|| RepositoryError::Conflict(format!("Resource code {} is taken", code)))
    }

    async fn update(&self, id: Id, dto: UpdateResource, actor: Option<Id>) -> RepositoryResult<Resource> {
        self.resources.update(id, actor, |resource| {
            if let Some(code) = dto.code {
                resource.code = code;
            }
            if let Some(name) = dto.name {
                resource.name = name;
            }
            apply(&mut resource.category_id, dto.category_id);
            apply(&mut resource.serial_number, dto.serial_number);
            apply(&mut resource.location, dto.location);
            apply(&mut resource.purchase_date, dto.purchase_date);
            apply(&mut resource.notes, dto.notes);
        })
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.resources.soft_delete(id, actor)
    }

    async fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<Resource> {
        self.resources.restore(id, actor)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.resources.get(id).is_some())
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn is_code_unique(&self, code: &str, exclude_id: Option<Id>) -> RepositoryResult<bool> {
        Ok(!self.resources.any(|r| r.code == code && Some(r.id) != exclude_id))
    }

    async fn search(&self, filter: &ResourceFilter, pagination: Pagination) -> RepositoryResult<PaginatedResult<Resource>> {
        let term = search_term(filter.q.as_deref());
        let mut resources = self.resources.filter(|r| {
            filter.status.map_or(true, |s| r.status == s)
                && filter.category_id.map_or(true, |c| r.category_id == Some(c))
                && term.map_or(true, |t| {
                    contains_ci(&r.code, t)
                        || contains_ci(&r.name, t)
                        || r.serial_number.as_deref().map_or(false, |s| contains_ci(s, t))
                })
        });
        resources.sort_by(|a, b| a.code.cmp(&b.code));
        let total = resources.len() as i64;
        Ok(PaginatedResult::new(pagination.apply(resources), total, pagination))
    }

    async fn set_status(&self, id: Id, status: ResourceStatus, actor: Option<Id>) -> RepositoryResult<Resource> {
        self.resources.update(id, actor, |resource| resource.status = status)
    }

    async fn active_assignment(&self, resource_id: Id) -> RepositoryResult<Option<ResourceAssignment>> {
        Ok(self
            .assignments
            .read()
            .values()
            .find(|a| a.resource_id == resource_id && a.is_active())
            .cloned())
    }

    async fn find_assignment(&self, assignment_id: Id) -> RepositoryResult<Option<ResourceAssignment>> {
        Ok(self.assignments.read().get(&assignment_id).cloned())
    }

    async fn create_assignment(
        &self,
        dto: NewResourceAssignment,
        actor: Option<Id>,
    ) -> RepositoryResult<ResourceAssignment> {
        let assignment = {
            let mut assignments = self.assignments.write();
            if assignments
                .values()
                .any(|a| a.resource_id == dto.resource_id && a.is_active())
            {
                return Err(RepositoryError::Conflict(format!(
                    "Resource {} is already assigned",
                    dto.resource_id
                )));
            }
            let assignment = ResourceAssignment {
                id: self.next_assignment_id.fetch_add(1, Ordering::SeqCst),
                resource_id: dto.resource_id,
                work_order_id: dto.work_order_id,
                notes: dto.notes,
                assigned_at: Utc::now(),
                assigned_by_id: actor,
                released_at: None,
                released_by_id: None,
            };
            assignments.insert(assignment.id, assignment.clone());
            assignment
        };
        self.mark_resource(assignment.resource_id, ResourceStatus::InUse, actor);
        Ok(assignment)
    }

    async fn release_assignment(&self, assignment_id: Id, actor: Option<Id>) -> RepositoryResult<ResourceAssignment> {
        let released = {
            let mut assignments = self.assignments.write();
            let assignment = assignments
                .get_mut(&assignment_id)
                .filter(|a| a.is_active())
                .ok_or_else(|| RepositoryError::not_found("ResourceAssignment", assignment_id))?;
            assignment.released_at = Some(Utc::now());
            assignment.released_by_id = actor;
            assignment.clone()
        };
        self.mark_resource(released.resource_id, ResourceStatus::Available, actor);
        Ok(released)
    }

    async fn release_for_work_order(
        &self,
        work_order_id: Id,
        actor: Option<Id>,
    ) -> RepositoryResult<Vec<ResourceAssignment>> {
        let now = Utc::now();
        let released: Vec<ResourceAssignment> = {
            let mut assignments = self.assignments.write();
            assignments
                .values_mut()
                .filter(|a| a.work_order_id == work_order_id && a.is_active())
                .map(|a| {
                    a.released_at = Some(now);
                    a.released_by_id = actor;
                    a.clone()
                })
                .collect()
        };
        for assignment in &released {
            self.mark_resource(assignment.resource_id, ResourceStatus::Available, actor);
        }
        Ok(released)
    }

    async fn assignments_for_work_order(&self, work_order_id: Id) -> RepositoryResult<Vec<ResourceAssignment>> {
        let mut assignments: Vec<ResourceAssignment> = self
            .assignments
            .read()
            .values()
            .filter(|a| a.work_order_id == work_order_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| (b.assigned_at, b.id).cmp(&(a.assigned_at, a.id)));
        Ok(assignments)
    }

    async fn status_counts(&self) -> RepositoryResult<Vec<(ResourceStatus, i64)>> {
        Ok(ResourceStatus::ALL
            .iter()
            .map(|status| (*status, self.resources.count_where(|r| r.status == *status)))
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn count_in_category(&self, category_id: Id) -> RepositoryResult<i64> {
        Ok(self.resources.count_where(|r| r.category_id == Some(category_id)))
    }
}

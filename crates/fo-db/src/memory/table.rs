//! Generic in-memory table
//!
//! Rows live in a `BTreeMap` keyed by id, so iteration order is insertion
//! order. Soft-deleted rows stay in the map and are skipped by reads.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use fo_core::traits::Id;
use parking_lot::RwLock;

use crate::repository::{RepositoryError, RepositoryResult};

/// A row carrying the shared bookkeeping columns
pub trait Record: Clone + Send + Sync {
    const ENTITY: &'static str;

    fn id(&self) -> Id;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>);

    fn touch(&mut self, at: DateTime<Utc>, actor: Option<Id>);
}

macro_rules! impl_record {
    ($($ty:ty => $entity:literal),+ $(,)?) => {
        $(
            impl Record for $ty {
                const ENTITY: &'static str = $entity;

                fn id(&self) -> Id {
                    self.id
                }

                fn deleted_at(&self) -> Option<DateTime<Utc>> {
                    self.deleted_at
                }

                fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
                    self.deleted_at = at;
                }

                fn touch(&mut self, at: DateTime<Utc>, actor: Option<Id>) {
                    self.updated_at = at;
                    self.updated_by_id = actor;
                }
            }
        )+
    };
}

impl_record! {
    fo_models::User => "User",
    fo_models::Role => "Role",
    fo_models::Client => "Client",
    fo_models::ClientContact => "ClientContact",
    fo_models::ClientMaterial => "ClientMaterial",
    fo_models::WorkOrder => "WorkOrder",
    fo_models::Employee => "Employee",
    fo_models::LeaveRequest => "LeaveRequest",
    fo_models::Lookup => "Lookup",
    fo_models::Resource => "Resource",
    fo_models::DocumentTemplate => "DocumentTemplate",
}

pub struct MemoryTable<T> {
    rows: RwLock<BTreeMap<Id, T>>,
    next_id: AtomicI64,
}

impl<T: Record> Default for MemoryTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryTable<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn next_id(&self) -> Id {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn insert(&self, row: T) -> T {
        self.rows.write().insert(row.id(), row.clone());
        row
    }

    /// Inserts the row `build` makes unless a live row conflicts with it.
    /// The check and the insert happen under one write lock.
    pub fn insert_unless(&self, conflict: impl Fn(&T) -> bool, build: impl FnOnce(Id) -> T) -> Option<T> {
        let mut rows = self.rows.write();
        if rows.values().any(|row| row.deleted_at().is_none() && conflict(row)) {
            return None;
        }
        let row = build(self.next_id());
        rows.insert(row.id(), row.clone());
        Some(row)
    }

    /// Live row by id
    pub fn get(&self, id: Id) -> Option<T> {
        self.rows
            .read()
            .get(&id)
            .filter(|row| row.deleted_at().is_none())
            .cloned()
    }

    pub fn require(&self, id: Id) -> RepositoryResult<T> {
        self.get(id).ok_or_else(|| RepositoryError::not_found(T::ENTITY, id))
    }

    /// Live rows matching the predicate, in id order
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .values()
            .filter(|row| row.deleted_at().is_none() && predicate(row))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<T> {
        self.filter(|_| true)
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.rows
            .read()
            .values()
            .find(|row| row.deleted_at().is_none() && predicate(row))
            .cloned()
    }

    pub fn any(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.find(predicate).is_some()
    }

    pub fn count_where(&self, predicate: impl Fn(&T) -> bool) -> i64 {
        self.rows
            .read()
            .values()
            .filter(|row| row.deleted_at().is_none() && predicate(row))
            .count() as i64
    }

    /// Applies `change` to a live row and stamps it
    pub fn update(&self, id: Id, actor: Option<Id>, change: impl FnOnce(&mut T)) -> RepositoryResult<T> {
        self.update_checked(id, actor, |_| Ok(()), change)
    }

    /// Like `update`, but `check` sees the row first under the same lock
    /// and can refuse the change
    pub fn update_checked(
        &self,
        id: Id,
        actor: Option<Id>,
        check: impl FnOnce(&T) -> RepositoryResult<()>,
        change: impl FnOnce(&mut T),
    ) -> RepositoryResult<T> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(&id)
            .filter(|row| row.deleted_at().is_none())
            .ok_or_else(|| RepositoryError::not_found(T::ENTITY, id))?;
        check(row)?;
        change(row);
        row.touch(Utc::now(), actor);
        Ok(row.clone())
    }

    /// Applies `change` to every live row matching the predicate and
    /// returns the changed rows
    pub fn update_where(
        &self,
        actor: Option<Id>,
        predicate: impl Fn(&T) -> bool,
        change: impl Fn(&mut T),
    ) -> Vec<T> {
        let now = Utc::now();
        let mut rows = self.rows.write();
        rows.values_mut()
            .filter(|row| row.deleted_at().is_none() && predicate(row))
            .map(|row| {
                change(row);
                row.touch(now, actor);
                row.clone()
            })
            .collect()
    }

    pub fn soft_delete(&self, id: Id, actor: Option<Id>) -> RepositoryResult<()> {
        self.update(id, actor, |row| row.set_deleted_at(Some(Utc::now())))
            .map(|_| ())
    }

    pub fn restore(&self, id: Id, actor: Option<Id>) -> RepositoryResult<T> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(&id)
            .filter(|row| row.deleted_at().is_some())
            .ok_or_else(|| RepositoryError::not_found(T::ENTITY, id))?;
        row.set_deleted_at(None);
        row.touch(Utc::now(), actor);
        Ok(row.clone())
    }

    pub fn count(&self) -> i64 {
        self.count_where(|_| true)
    }
}

/// Slices a full listing the way LIMIT/OFFSET would
pub fn slice<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    fo_core::pagination::Pagination::new(limit, offset).apply(items)
}

/// Case-insensitive containment, the in-memory counterpart of ILIKE '%q%'
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

/// Non-blank search text
pub fn search_term(q: Option<&str>) -> Option<&str> {
    q.filter(|q| !q.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fo_models::Lookup;
    use fo_models::LookupKind;

    fn lookup(table: &MemoryTable<Lookup>, code: &str) -> Lookup {
        let now = Utc::now();
        table.insert(Lookup {
            id: table.next_id(),
            kind: LookupKind::Department,
            code: code.to_string(),
            name: code.to_string(),
            sort_order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
        })
    }

    #[test]
    fn test_soft_delete_hides_row() {
        let table = MemoryTable::new();
        let row = lookup(&table, "OPS");
        lookup(&table, "HR");

        table.soft_delete(row.id, Some(7)).unwrap();
        assert!(table.get(row.id).is_none());
        assert_eq!(table.count(), 1);
        assert!(matches!(
            table.soft_delete(row.id, None),
            Err(RepositoryError::NotFound { entity: "Lookup", .. })
        ));

        let restored = table.restore(row.id, Some(7)).unwrap();
        assert!(restored.deleted_at.is_none());
        assert_eq!(restored.updated_by_id, Some(7));
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn test_update_stamps_actor() {
        let table = MemoryTable::new();
        let row = lookup(&table, "OPS");

        let updated = table.update(row.id, Some(3), |l| l.name = "Operations".into()).unwrap();
        assert_eq!(updated.name, "Operations");
        assert_eq!(updated.updated_by_id, Some(3));
        assert!(table.update(99, None, |_| {}).is_err());
    }

    #[test]
    fn test_insert_unless_refuses_live_conflicts() {
        let table = MemoryTable::new();
        let ops = lookup(&table, "OPS");
        let build = |id| Lookup {
            id,
            code: "OPS".to_string(),
            ..ops.clone()
        };

        assert!(table.insert_unless(|l: &Lookup| l.code == "OPS", build).is_none());
        assert_eq!(table.count(), 1);

        table.soft_delete(ops.id, None).unwrap();
        let again = table.insert_unless(|l: &Lookup| l.code == "OPS", build).unwrap();
        assert_ne!(again.id, ops.id);
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn test_update_checked_leaves_refused_rows_alone() {
        let table = MemoryTable::new();
        let row = lookup(&table, "OPS");

        let refused = table.update_checked(
            row.id,
            Some(3),
            |l| {
                if l.is_active {
                    Err(RepositoryError::Conflict("active".into()))
                } else {
                    Ok(())
                }
            },
            |l| l.name = "Operations".into(),
        );
        assert!(matches!(refused, Err(RepositoryError::Conflict(_))));
        let unchanged = table.get(row.id).unwrap();
        assert_eq!(unchanged.name, "OPS");
        assert_eq!(unchanged.updated_by_id, None);
    }

    #[test]
    fn test_concurrent_inserts_keep_codes_unique() {
        let table = std::sync::Arc::new(MemoryTable::<Lookup>::new());
        let template = lookup(&table, "SEED");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                let template = template.clone();
                std::thread::spawn(move || {
                    table
                        .insert_unless(
                            |l| l.code == "RACE",
                            |id| Lookup {
                                id,
                                code: "RACE".to_string(),
                                ..template
                            },
                        )
                        .is_some()
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(table.count_where(|l| l.code == "RACE"), 1);
    }

    #[test]
    fn test_search_helpers() {
        assert!(contains_ci("Field Service", " SERV "));
        assert!(search_term(Some("  ")).is_none());
        assert_eq!(slice(vec![1, 2, 3, 4], 2, 1), vec![2, 3]);
    }
}

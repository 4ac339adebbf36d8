//! In-process todo store.
//!
//! Follows the same contract as the Postgres store: owner scoping, soft delete,
//! and `created_at, id` ordering. Creation timestamps are strictly increasing so
//! listing order matches insertion order.

use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CreateTodoParams, RepoError, TodoCriteria, TodoPatch, TodoRecord, TodoStore,
};
use crate::domain::TodoId;

#[derive(Default)]
pub struct InMemoryTodoStore {
    rows: RwLock<Vec<TodoRecord>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-built rows as they are, deletion markers included.
    pub fn with_records(records: impl IntoIterator<Item = TodoRecord>) -> Self {
        Self {
            rows: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Every row ever written, soft-deleted ones included.
    pub fn records(&self) -> Result<Vec<TodoRecord>, RepoError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<TodoRecord>>, RepoError> {
        self.rows.read().map_err(RepoError::from_persistence)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<TodoRecord>>, RepoError> {
        self.rows.write().map_err(RepoError::from_persistence)
    }
}

fn next_timestamp(rows: &[TodoRecord]) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    rows.iter()
        .map(|record| record.created_at + time::Duration::microseconds(1))
        .max()
        .map_or(now, |next| now.max(next))
}

fn matches(record: &TodoRecord, criteria: &TodoCriteria) -> bool {
    record.deleted_at.is_none()
        && record.owner_id == criteria.owner_id
        && criteria.id.is_none_or(|id| record.id == id)
        && criteria
            .filter
            .completed
            .is_none_or(|completed| record.completed == completed)
        && criteria
            .filter
            .title
            .as_deref()
            .is_none_or(|title| record.title == title)
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn query(
        &self,
        criteria: &TodoCriteria,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<TodoRecord>, RepoError> {
        let mut rows: Vec<TodoRecord> = self
            .read()?
            .iter()
            .filter(|record| matches(record, criteria))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let skip = usize::try_from(offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let take = limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(rows.into_iter().skip(skip).take(take).collect())
    }

    async fn count(&self, criteria: &TodoCriteria) -> Result<u64, RepoError> {
        let count = self
            .read()?
            .iter()
            .filter(|record| matches(record, criteria))
            .count();
        Ok(count as u64)
    }

    async fn insert(&self, params: CreateTodoParams) -> Result<TodoRecord, RepoError> {
        let mut rows = self.write()?;
        if rows.iter().any(|record| record.id == params.id) {
            return Err(RepoError::InvalidInput {
                message: format!("todo `{}` already exists", params.id),
            });
        }

        let now = next_timestamp(&rows);
        let record = TodoRecord {
            id: params.id,
            owner_id: params.owner_id,
            title: params.title,
            description: params.description,
            completed: params.completed,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn update_by_id(
        &self,
        id: TodoId,
        criteria: &TodoCriteria,
        patch: TodoPatch,
    ) -> Result<TodoRecord, RepoError> {
        let mut rows = self.write()?;
        let record = rows
            .iter_mut()
            .find(|record| record.id == id && matches(record, criteria))
            .ok_or(RepoError::NotFound)?;

        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        if let Some(completed) = patch.completed {
            record.completed = completed;
        }
        record.updated_at = OffsetDateTime::now_utc();

        Ok(record.clone())
    }

    async fn delete_by_id(&self, id: TodoId, criteria: &TodoCriteria) -> Result<(), RepoError> {
        let mut rows = self.write()?;
        let record = rows
            .iter_mut()
            .find(|record| record.id == id && matches(record, criteria))
            .ok_or(RepoError::NotFound)?;

        record.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }
}

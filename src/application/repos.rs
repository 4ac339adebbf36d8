//! Store port describing the persistence adapter behind the todo repository.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{NewTodo, OwnerId, Todo, TodoChanges, TodoFilter, TodoId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Row selection shared by every store call.
///
/// Rows carrying a deletion marker never match, whatever the other fields say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoCriteria {
    pub owner_id: OwnerId,
    pub id: Option<TodoId>,
    pub filter: TodoFilter,
}

impl TodoCriteria {
    pub fn owned_by(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            id: None,
            filter: TodoFilter::default(),
        }
    }

    pub fn with_id(mut self, id: TodoId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_filter(mut self, filter: TodoFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// A persisted todo row, including the ownership and lifecycle columns that the
/// domain `Todo` does not expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoRecord {
    pub id: TodoId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl From<TodoRecord> for Todo {
    fn from(record: TodoRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            completed: record.completed,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTodoParams {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl From<NewTodo> for CreateTodoParams {
    fn from(todo: NewTodo) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: todo.owner_id,
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
        }
    }
}

pub type TodoPatch = TodoChanges;

#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Rows matching `criteria` ordered by creation time, then id.
    async fn query(
        &self,
        criteria: &TodoCriteria,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<TodoRecord>, RepoError>;

    async fn count(&self, criteria: &TodoCriteria) -> Result<u64, RepoError>;

    async fn insert(&self, params: CreateTodoParams) -> Result<TodoRecord, RepoError>;

    /// Fails with `RepoError::NotFound` when no live row matches.
    async fn update_by_id(
        &self,
        id: TodoId,
        criteria: &TodoCriteria,
        patch: TodoPatch,
    ) -> Result<TodoRecord, RepoError>;

    /// Sets the deletion marker; fails with `RepoError::NotFound` when no live row matches.
    async fn delete_by_id(&self, id: TodoId, criteria: &TodoCriteria) -> Result<(), RepoError>;
}

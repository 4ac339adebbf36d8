use thiserror::Error;

use crate::{
    application::repos::RepoError,
    config::LoadError,
    domain::{TodoId, error::DomainError},
    infra::error::InfraError,
};

/// Failures surfaced by `TodoRepository`.
///
/// Cache problems never appear here; they are recovered inside the repository.
#[derive(Debug, Error)]
pub enum TodoError {
    #[error("todo `{id}` not found")]
    NotFound { id: TodoId },
    #[error("todo store unavailable")]
    StoreUnavailable(#[source] RepoError),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl TodoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Translate a store failure for the todo `id`; a store-level not-found keeps
    /// its meaning, everything else means the store could not serve the call.
    pub(crate) fn from_store(id: Option<TodoId>, err: RepoError) -> Self {
        match (err, id) {
            (RepoError::NotFound, Some(id)) => Self::NotFound { id },
            (RepoError::InvalidInput { message }, _) => {
                Self::Invalid(DomainError::validation(message))
            }
            (err, _) => Self::StoreUnavailable(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the operator CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Todo(TodoError::NotFound { .. }) => 2,
            AppError::Todo(TodoError::Invalid(_))
            | AppError::Validation(_)
            | AppError::Config(_) => 64,
            AppError::Todo(TodoError::StoreUnavailable(_)) | AppError::Infra(_) => 69,
            AppError::Unexpected(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn store_not_found_keeps_the_id() {
        let id = Uuid::new_v4();
        let err = TodoError::from_store(Some(id), RepoError::NotFound);
        assert!(matches!(err, TodoError::NotFound { id: found } if found == id));
    }

    #[test]
    fn timeouts_are_store_unavailable() {
        let err = TodoError::from_store(None, RepoError::Timeout);
        assert!(matches!(err, TodoError::StoreUnavailable(RepoError::Timeout)));
        assert_eq!(AppError::from(err).exit_code(), 69);
    }

    #[test]
    fn not_found_without_id_is_store_failure() {
        let err = TodoError::from_store(None, RepoError::NotFound);
        assert!(matches!(err, TodoError::StoreUnavailable(RepoError::NotFound)));
    }
}

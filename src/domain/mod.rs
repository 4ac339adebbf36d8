//! Domain layer types and invariants.

pub mod error;
pub mod todos;

pub use error::DomainError;
pub use todos::{
    NewTodo, OwnerId, Todo, TodoChanges, TodoFilter, TodoId, TodoPage, TodoPagination,
};

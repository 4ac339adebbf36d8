//! Todo entity and the query/command values that travel with it.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

/// Identifier of the user that exclusively owns a set of todos.
pub type OwnerId = Uuid;

/// Identifier of a single todo.
pub type TodoId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Equality constraints narrowing a list query.
///
/// A `None` field places no constraint on that column, so `TodoFilter::default()`
/// matches every live todo of the owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TodoFilter {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.title.is_none()
    }

    /// Whether `todo` satisfies every constraint present in the filter.
    pub fn matches(&self, todo: &Todo) -> bool {
        self.completed.is_none_or(|completed| todo.completed == completed)
            && self.title.as_deref().is_none_or(|title| todo.title == title)
    }
}

/// Optional page window; both fields are one-based and strictly positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<NonZeroU32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<NonZeroU32>,
}

impl TodoPagination {
    /// Build a window from raw numbers, rejecting zero.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, DomainError> {
        let page = page
            .map(|value| {
                NonZeroU32::new(value)
                    .ok_or_else(|| DomainError::validation("page must be at least 1"))
            })
            .transpose()?;
        let limit = limit
            .map(|value| {
                NonZeroU32::new(value)
                    .ok_or_else(|| DomainError::validation("limit must be at least 1"))
            })
            .transpose()?;

        Ok(Self { page, limit })
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.limit.is_none()
    }
}

/// Result of a list query, and the value stored in the cache under its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPage {
    /// Number of pages of `limit` rows needed to cover every matching todo.
    ///
    /// Without a limit the whole result is a single unbounded window and this
    /// is the matching row count.
    pub total: u64,
    pub data: Vec<Todo>,
}

impl TodoPage {
    pub fn empty() -> Self {
        Self {
            total: 0,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub owner_id: OwnerId,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl NewTodo {
    pub fn new(owner_id: OwnerId, title: impl Into<String>) -> Self {
        Self {
            owner_id,
            title: title.into(),
            description: String::new(),
            completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_title(&self.title)
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TodoChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self.title.as_deref() {
            Some(title) => ensure_title(title),
            None => Ok(()),
        }
    }
}

fn ensure_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(completed: bool, title: &str) -> Todo {
        Todo {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            completed,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = TodoFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&sample(true, "a")));
        assert!(filter.matches(&sample(false, "b")));
    }

    #[test]
    fn filter_requires_every_present_field() {
        let filter = TodoFilter {
            completed: Some(true),
            title: Some("groceries".to_string()),
        };
        assert!(filter.matches(&sample(true, "groceries")));
        assert!(!filter.matches(&sample(false, "groceries")));
        assert!(!filter.matches(&sample(true, "laundry")));
    }

    #[test]
    fn pagination_rejects_zero() {
        assert!(TodoPagination::new(Some(0), Some(10)).is_err());
        assert!(TodoPagination::new(Some(1), Some(0)).is_err());

        let window = TodoPagination::new(Some(2), Some(5)).expect("valid window");
        assert_eq!(window.page.map(NonZeroU32::get), Some(2));
        assert_eq!(window.limit.map(NonZeroU32::get), Some(5));
        assert!(TodoPagination::new(None, None).expect("empty").is_empty());
    }

    #[test]
    fn blank_titles_are_rejected() {
        let owner = Uuid::new_v4();
        assert!(NewTodo::new(owner, "   ").validate().is_err());
        assert!(NewTodo::new(owner, "write report").validate().is_ok());

        let changes = TodoChanges {
            title: Some(String::new()),
            ..TodoChanges::default()
        };
        assert!(changes.validate().is_err());
        assert!(TodoChanges::default().validate().is_ok());
    }

    #[test]
    fn todo_serializes_created_at_as_rfc3339() {
        let todo = sample(false, "a");
        let json = serde_json::to_value(&todo).expect("serialize todo");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }
}

//! Cache key derivation for todo list queries.
//!
//! Keys have the shape `todos:{owner}:{digest}`. The owner segment is what lets a
//! write drop every list cached for that owner with one namespace delete; the
//! digest is opaque, so individual keys are never targeted.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::{OwnerId, TodoFilter, TodoPagination};

pub const KEY_PREFIX: &str = "todos";

/// Bytes of the SHA-256 output kept in the key (128 bits).
const DIGEST_BYTES: usize = 16;

/// Namespace shared by every list key of `owner`, including the trailing separator.
pub fn owner_namespace(owner: OwnerId) -> String {
    format!("{KEY_PREFIX}:{owner}:")
}

/// Derive the cache key for a list query.
///
/// Equal queries produce equal keys across calls and processes: the filter and
/// window are rendered with sorted field names, absent fields omitted.
pub fn derive_key(owner: OwnerId, filter: &TodoFilter, pagination: &TodoPagination) -> String {
    let canonical = canonical_query(owner, filter, pagination);
    let digest = Sha256::digest(canonical.as_bytes());
    format!(
        "{}{}",
        owner_namespace(owner),
        hex::encode(&digest[..DIGEST_BYTES])
    )
}

// Fields are inserted in lexical order so the output does not depend on how
// serde_json orders its maps.
fn canonical_query(owner: OwnerId, filter: &TodoFilter, pagination: &TodoPagination) -> String {
    let mut filter_fields = Map::new();
    if let Some(completed) = filter.completed {
        filter_fields.insert("completed".to_string(), Value::Bool(completed));
    }
    if let Some(title) = filter.title.as_ref() {
        filter_fields.insert("title".to_string(), Value::String(title.clone()));
    }

    let mut window_fields = Map::new();
    if let Some(limit) = pagination.limit {
        window_fields.insert("limit".to_string(), Value::from(limit.get()));
    }
    if let Some(page) = pagination.page {
        window_fields.insert("page".to_string(), Value::from(page.get()));
    }

    let mut root = Map::new();
    root.insert("filter".to_string(), Value::Object(filter_fields));
    root.insert("owner".to_string(), Value::String(owner.to_string()));
    root.insert("pagination".to_string(), Value::Object(window_fields));

    Value::Object(root).to_string()
}

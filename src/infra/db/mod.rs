//! Postgres-backed todo store.

mod todos;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
};

use crate::application::repos::TodoCriteria;

#[derive(Clone)]
pub struct PostgresTodoStore {
    pool: Arc<PgPool>,
}

impl PostgresTodoStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    /// Append the owner, id, filter and live-row conditions of `criteria`.
    fn apply_criteria<'q>(qb: &mut QueryBuilder<'q, Postgres>, criteria: &'q TodoCriteria) {
        qb.push(" AND t.user_id = ");
        qb.push_bind(criteria.owner_id);
        qb.push(" AND t.deleted_at IS NULL ");

        if let Some(id) = criteria.id {
            qb.push(" AND t.id = ");
            qb.push_bind(id);
        }

        if let Some(completed) = criteria.filter.completed {
            qb.push(" AND t.completed = ");
            qb.push_bind(completed);
        }

        if let Some(title) = criteria.filter.title.as_ref() {
            qb.push(" AND t.title = ");
            qb.push_bind(title);
        }
    }
}

use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateTodoParams, RepoError, TodoCriteria, TodoPatch, TodoRecord, TodoStore,
};
use crate::domain::TodoId;

use super::{PostgresTodoStore, map_sqlx_error};

const TODO_COLUMNS: &str = "t.id, t.user_id AS owner_id, t.title, t.description, t.completed, \
                            t.created_at, t.updated_at, t.deleted_at";

#[derive(sqlx::FromRow)]
struct TodoRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: String,
    completed: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    deleted_at: Option<OffsetDateTime>,
}

impl From<TodoRow> for TodoRecord {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[async_trait]
impl TodoStore for PostgresTodoStore {
    async fn query(
        &self,
        criteria: &TodoCriteria,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<TodoRecord>, RepoError> {
        // An offset past the bigint range lies beyond every row.
        let Ok(offset) = offset.map(i64::try_from).transpose() else {
            return Ok(Vec::new());
        };

        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(TODO_COLUMNS);
        qb.push(" FROM todos t WHERE 1=1 ");
        Self::apply_criteria(&mut qb, criteria);
        qb.push(" ORDER BY t.created_at ASC, t.id ASC ");

        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }
        if let Some(offset) = offset {
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }

        let rows = qb
            .build_query_as::<TodoRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TodoRecord::from).collect())
    }

    async fn count(&self, criteria: &TodoCriteria) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM todos t WHERE 1=1 ");
        Self::apply_criteria(&mut qb, criteria);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn insert(&self, params: CreateTodoParams) -> Result<TodoRecord, RepoError> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            INSERT INTO todos AS t (id, user_id, title, description, completed)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING t.id, t.user_id AS owner_id, t.title, t.description, t.completed,
                      t.created_at, t.updated_at, t.deleted_at
            "#,
        )
        .bind(params.id)
        .bind(params.owner_id)
        .bind(params.title)
        .bind(params.description)
        .bind(params.completed)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_by_id(
        &self,
        id: TodoId,
        criteria: &TodoCriteria,
        patch: TodoPatch,
    ) -> Result<TodoRecord, RepoError> {
        let mut qb = QueryBuilder::new("UPDATE todos AS t SET title = COALESCE(");
        qb.push_bind(patch.title);
        qb.push(", t.title), description = COALESCE(");
        qb.push_bind(patch.description);
        qb.push(", t.description), completed = COALESCE(");
        qb.push_bind(patch.completed);
        qb.push(", t.completed), updated_at = now() WHERE t.id = ");
        qb.push_bind(id);
        Self::apply_criteria(&mut qb, criteria);
        qb.push(" RETURNING ");
        qb.push(TODO_COLUMNS);

        let row = qb
            .build_query_as::<TodoRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_by_id(&self, id: TodoId, criteria: &TodoCriteria) -> Result<(), RepoError> {
        let mut qb = QueryBuilder::new("UPDATE todos AS t SET deleted_at = now() WHERE t.id = ");
        qb.push_bind(id);
        Self::apply_criteria(&mut qb, criteria);

        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn offsets_beyond_bigint_yield_no_rows() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        let store = PostgresTodoStore::new(pool);

        let rows = store
            .query(
                &TodoCriteria::owned_by(Uuid::new_v4()),
                Some(u64::MAX),
                Some(10),
            )
            .await
            .expect("empty window");

        assert!(rows.is_empty());
    }
}

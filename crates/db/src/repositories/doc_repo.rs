//! Repository for the `docs` table.

use koi_core::status::DocStatus;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::doc::{CreateDoc, Doc};

const COLUMNS: &str = "id, project_id, name, url, doc_type, status, created_at, updated_at";

pub struct DocRepo;

impl DocRepo {
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreateDoc,
    ) -> Result<Doc, sqlx::Error> {
        let query = format!(
            "INSERT INTO docs (project_id, name, url, doc_type, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Doc>(&query)
            .bind(project_id)
            .bind(input.name.trim())
            .bind(&input.url)
            .bind(input.doc_type.trim())
            .bind(DocStatus::Processing.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Doc>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM docs WHERE id = $1");
        sqlx::query_as::<_, Doc>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Doc>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM docs WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Doc>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_by_project(pool: &PgPool, project_id: DbId) -> Result<Vec<Doc>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM docs WHERE project_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Doc>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn set_status<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        status: DocStatus,
    ) -> Result<Doc, sqlx::Error> {
        let query = format!("UPDATE docs SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Doc>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(executor)
            .await
    }
}

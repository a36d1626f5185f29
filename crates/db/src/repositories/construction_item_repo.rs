//! Repository for the `construction_items` table.
//!
//! Items form a two-level tree: level-1 rows have `parent_id IS NULL`,
//! level-2 rows point at a level-1 row.

use koi_core::status::ItemStatus;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::construction::{ConstructionItem, NewConstructionItem};

const COLUMNS: &str = "id, project_id, parent_id, name, description, estimate_at, actual_at, \
                        is_payment, status, created_at, updated_at";

pub struct ConstructionItemRepo;

impl ConstructionItemRepo {
    /// Insert one OPENING item.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewConstructionItem<'_>,
    ) -> Result<ConstructionItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO construction_items \
                (project_id, parent_id, name, description, estimate_at, is_payment, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConstructionItem>(&query)
            .bind(input.project_id)
            .bind(input.parent_id)
            .bind(input.name.trim())
            .bind(input.description)
            .bind(input.estimate_at)
            .bind(input.is_payment)
            .bind(ItemStatus::Opening.as_str())
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ConstructionItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM construction_items WHERE id = $1");
        sqlx::query_as::<_, ConstructionItem>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock an item row until the surrounding transaction ends.
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ConstructionItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM construction_items WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ConstructionItem>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Every item of a project, level-1 rows first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ConstructionItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM construction_items \
             WHERE project_id = $1 \
             ORDER BY parent_id NULLS FIRST, created_at, name"
        );
        sqlx::query_as::<_, ConstructionItem>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Level-1 items of a project.
    pub async fn list_roots<'e>(
        executor: impl PgExecutor<'e>,
        project_id: DbId,
    ) -> Result<Vec<ConstructionItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM construction_items \
             WHERE project_id = $1 AND parent_id IS NULL \
             ORDER BY created_at"
        );
        sqlx::query_as::<_, ConstructionItem>(&query)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }

    /// Level-2 children of `parent_id`.
    pub async fn list_children<'e>(
        executor: impl PgExecutor<'e>,
        parent_id: DbId,
    ) -> Result<Vec<ConstructionItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM construction_items \
             WHERE parent_id = $1 \
             ORDER BY created_at"
        );
        sqlx::query_as::<_, ConstructionItem>(&query)
            .bind(parent_id)
            .fetch_all(executor)
            .await
    }

    /// Set an item's status. Marking DONE also stamps `actual_at`.
    pub async fn set_status<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        status: ItemStatus,
    ) -> Result<ConstructionItem, sqlx::Error> {
        let query = format!(
            "UPDATE construction_items SET \
                status = $2, \
                actual_at = CASE WHEN $2 = $3 THEN CURRENT_DATE ELSE actual_at END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConstructionItem>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(ItemStatus::Done.as_str())
            .fetch_one(executor)
            .await
    }

    pub async fn count_children<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM construction_items WHERE parent_id = $1")
                .bind(id)
                .fetch_one(executor)
                .await?;
        Ok(row.0)
    }

    /// Hard-delete an item. Returns `true` if a row was removed.
    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM construction_items WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

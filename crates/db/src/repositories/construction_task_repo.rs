//! Repository for the `construction_tasks` table.

use chrono::NaiveDate;
use koi_core::status::TaskStatus;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::construction::{ConstructionTask, TaskWrite};

const COLUMNS: &str = "id, construction_item_id, staff_id, name, image_url, reason, deadline_at, \
                        status, created_at, updated_at";

pub struct ConstructionTaskRepo;

impl ConstructionTaskRepo {
    /// Insert one OPENING task under a level-2 item.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        item_id: DbId,
        name: &str,
        deadline_at: Option<NaiveDate>,
    ) -> Result<ConstructionTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO construction_tasks (construction_item_id, name, deadline_at, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConstructionTask>(&query)
            .bind(item_id)
            .bind(name.trim())
            .bind(deadline_at)
            .bind(TaskStatus::Opening.as_str())
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ConstructionTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM construction_tasks WHERE id = $1");
        sqlx::query_as::<_, ConstructionTask>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ConstructionTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM construction_tasks WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ConstructionTask>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_by_item<'e>(
        executor: impl PgExecutor<'e>,
        item_id: DbId,
    ) -> Result<Vec<ConstructionTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM construction_tasks \
             WHERE construction_item_id = $1 \
             ORDER BY created_at, name"
        );
        sqlx::query_as::<_, ConstructionTask>(&query)
            .bind(item_id)
            .fetch_all(executor)
            .await
    }

    /// Tasks assigned to a staff member, across projects.
    pub async fn list_by_staff(
        pool: &PgPool,
        staff_id: DbId,
    ) -> Result<Vec<ConstructionTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM construction_tasks \
             WHERE staff_id = $1 \
             ORDER BY deadline_at NULLS LAST, created_at"
        );
        sqlx::query_as::<_, ConstructionTask>(&query)
            .bind(staff_id)
            .fetch_all(pool)
            .await
    }

    /// Write the fully resolved task columns.
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        write: &TaskWrite,
    ) -> Result<ConstructionTask, sqlx::Error> {
        let query = format!(
            "UPDATE construction_tasks SET \
                name = $2, staff_id = $3, image_url = $4, reason = $5, \
                deadline_at = $6, status = $7 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConstructionTask>(&query)
            .bind(id)
            .bind(&write.name)
            .bind(write.staff_id)
            .bind(&write.image_url)
            .bind(&write.reason)
            .bind(write.deadline_at)
            .bind(write.status.as_str())
            .fetch_one(executor)
            .await
    }

    pub async fn set_status<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        status: TaskStatus,
    ) -> Result<ConstructionTask, sqlx::Error> {
        let query = format!(
            "UPDATE construction_tasks SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConstructionTask>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(executor)
            .await
    }

    pub async fn count_by_item<'e>(
        executor: impl PgExecutor<'e>,
        item_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM construction_tasks WHERE construction_item_id = $1",
        )
        .bind(item_id)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM construction_tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

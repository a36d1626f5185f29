//! Repository for the `contracts` table.

use koi_core::status::ContractStatus;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::contract::{Contract, CreateContract};

const COLUMNS: &str = "id, project_id, quotation_id, name, customer_name, contract_value, url, \
                        note, status, created_at, updated_at";

pub struct ContractRepo;

impl ContractRepo {
    /// Insert a PROCESSING contract worth `contract_value`.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        project_id: DbId,
        contract_value: i64,
        input: &CreateContract,
    ) -> Result<Contract, sqlx::Error> {
        let query = format!(
            "INSERT INTO contracts \
                (project_id, quotation_id, name, customer_name, contract_value, url, note, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contract>(&query)
            .bind(project_id)
            .bind(input.quotation_id)
            .bind(input.name.trim())
            .bind(input.customer_name.trim())
            .bind(contract_value)
            .bind(&input.url)
            .bind(&input.note)
            .bind(ContractStatus::Processing.as_str())
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Contract>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contracts WHERE id = $1");
        sqlx::query_as::<_, Contract>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock a contract row for a status transition.
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Contract>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contracts WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Contract>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_by_project<'e>(
        executor: impl PgExecutor<'e>,
        project_id: DbId,
    ) -> Result<Vec<Contract>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contracts WHERE project_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Contract>(&query)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }

    /// Move a contract to `status`, appending `note` when given.
    pub async fn set_status<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        status: ContractStatus,
        note: Option<&str>,
    ) -> Result<Contract, sqlx::Error> {
        let query = format!(
            "UPDATE contracts SET status = $2, note = COALESCE($3, note) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contract>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(note)
            .fetch_one(executor)
            .await
    }

    /// Project a contract belongs to, for ownership checks.
    pub async fn project_id_of(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as("SELECT project_id FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.0))
    }
}

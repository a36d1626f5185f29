//! Repository for the `quotations` table.

use koi_core::status::QuotationStatus;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::quotation::{NewQuotation, Quotation};

const COLUMNS: &str = "id, project_id, promotion_id, version, total_price, discount_price, \
                        final_price, reason, status, created_at, updated_at";

pub struct QuotationRepo;

impl QuotationRepo {
    /// Insert the next version of a project's quotation.
    pub async fn create(pool: &PgPool, input: &NewQuotation) -> Result<Quotation, sqlx::Error> {
        let query = format!(
            "INSERT INTO quotations \
                (project_id, promotion_id, version, total_price, discount_price, final_price, status) \
             VALUES ($1, $2, \
                (SELECT COALESCE(MAX(version), 0) + 1 FROM quotations WHERE project_id = $1), \
                $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Quotation>(&query)
            .bind(input.project_id)
            .bind(input.promotion_id)
            .bind(input.total_price)
            .bind(input.discount_price)
            .bind(input.total_price - input.discount_price)
            .bind(QuotationStatus::Previewing.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Quotation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quotations WHERE id = $1");
        sqlx::query_as::<_, Quotation>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Quotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quotations WHERE project_id = $1 ORDER BY version DESC"
        );
        sqlx::query_as::<_, Quotation>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Record a review outcome, guarded on the quotation still previewing.
    ///
    /// Returns `None` when the quotation was reviewed concurrently.
    pub async fn review(
        pool: &PgPool,
        id: DbId,
        status: QuotationStatus,
        reason: Option<&str>,
    ) -> Result<Option<Quotation>, sqlx::Error> {
        let query = format!(
            "UPDATE quotations SET status = $2, reason = $3 \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Quotation>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(reason)
            .bind(QuotationStatus::Previewing.as_str())
            .fetch_optional(pool)
            .await
    }
}

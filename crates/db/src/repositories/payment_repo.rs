//! Repository for `payment_batches` and `payments`.

use koi_core::payment::BatchPlan;
use koi_core::status::PaymentBatchStatus;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::models::payment::{NewPayment, Payment, PaymentBatch};

const BATCH_COLUMNS: &str = "id, contract_id, name, phase, percents, total_value, is_paid, \
                              status, payment_at, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, batch_id, amount, txn_ref, transaction_no, bank_code, paid_at";

pub struct PaymentRepo;

impl PaymentRepo {
    /// Insert the milestone batches of a new contract.
    pub async fn create_batches(
        tx: &mut Transaction<'_, Postgres>,
        contract_id: DbId,
        plans: &[BatchPlan],
    ) -> Result<Vec<PaymentBatch>, sqlx::Error> {
        let query = format!(
            "INSERT INTO payment_batches (contract_id, name, phase, percents, total_value, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {BATCH_COLUMNS}"
        );
        let mut batches = Vec::with_capacity(plans.len());
        for plan in plans {
            let batch = sqlx::query_as::<_, PaymentBatch>(&query)
                .bind(contract_id)
                .bind(&plan.name)
                .bind(plan.phase.as_str())
                .bind(plan.percents)
                .bind(plan.total_value)
                .bind(PaymentBatchStatus::Pending.as_str())
                .fetch_one(&mut **tx)
                .await?;
            batches.push(batch);
        }
        Ok(batches)
    }

    pub async fn list_batches(
        pool: &PgPool,
        contract_id: DbId,
    ) -> Result<Vec<PaymentBatch>, sqlx::Error> {
        let query = format!(
            "SELECT {BATCH_COLUMNS} FROM payment_batches \
             WHERE contract_id = $1 \
             ORDER BY created_at, percents"
        );
        sqlx::query_as::<_, PaymentBatch>(&query)
            .bind(contract_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_batch<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<PaymentBatch>, sqlx::Error> {
        let query = format!("SELECT {BATCH_COLUMNS} FROM payment_batches WHERE id = $1");
        sqlx::query_as::<_, PaymentBatch>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_batch_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<PaymentBatch>, sqlx::Error> {
        let query =
            format!("SELECT {BATCH_COLUMNS} FROM payment_batches WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, PaymentBatch>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn mark_batch_paid<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<PaymentBatch, sqlx::Error> {
        let query = format!(
            "UPDATE payment_batches SET is_paid = TRUE, status = $2, payment_at = NOW() \
             WHERE id = $1 \
             RETURNING {BATCH_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentBatch>(&query)
            .bind(id)
            .bind(PaymentBatchStatus::Paid.as_str())
            .fetch_one(executor)
            .await
    }

    pub async fn record_payment<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewPayment,
    ) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments (batch_id, amount, txn_ref, transaction_no, bank_code) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.batch_id)
            .bind(input.amount)
            .bind(&input.txn_ref)
            .bind(&input.transaction_no)
            .bind(&input.bank_code)
            .fetch_one(executor)
            .await
    }

    pub async fn list_payments(
        pool: &PgPool,
        batch_id: DbId,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE batch_id = $1 ORDER BY paid_at"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }
}

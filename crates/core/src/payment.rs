//! Contract payment batches.
//!
//! Every contract is paid in four milestones. Percentages are fixed and the
//! rounding remainder lands on the last batch so the batches always sum to
//! the contract value.

use crate::error::CoreError;
use crate::status::PaymentPhase;

/// Milestone split as `(phase, display name, percent)`.
pub const BATCH_SPLIT: &[(PaymentPhase, &str, i32)] = &[
    (PaymentPhase::Deposit, "Deposit", 10),
    (PaymentPhase::PreConstructing, "Pre-construction", 30),
    (PaymentPhase::Constructing, "Construction", 50),
    (PaymentPhase::Acceptance, "Acceptance", 10),
];

/// Largest money amount (VND) accepted anywhere in the workflow.
///
/// Percent splits and the gateway's x100 minor-unit encoding stay well
/// inside `i64` below this bound.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Reject amounts outside `1..=MAX_AMOUNT`.
pub fn ensure_amount_in_range(amount: i64, what: &str) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!("{what} must be positive")));
    }
    if amount > MAX_AMOUNT {
        return Err(CoreError::Validation(format!(
            "{what} must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

/// `percent`% of `amount`, rounded down.
pub fn percent_of(amount: i64, percent: i32) -> Result<i64, CoreError> {
    amount
        .checked_mul(i64::from(percent))
        .map(|v| v / 100)
        .ok_or_else(|| CoreError::Validation(format!("Amount {amount} is too large")))
}

/// A batch to be inserted for a new contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub phase: PaymentPhase,
    pub name: String,
    pub percents: i32,
    pub total_value: i64,
}

/// Split `contract_value` into the milestone batches.
pub fn plan_batches(contract_value: i64) -> Result<Vec<BatchPlan>, CoreError> {
    ensure_amount_in_range(contract_value, "Contract value")?;

    let mut remaining = contract_value;
    let last = BATCH_SPLIT.len() - 1;
    let mut plans = Vec::with_capacity(BATCH_SPLIT.len());
    for (i, &(phase, name, percents)) in BATCH_SPLIT.iter().enumerate() {
        let total_value = if i == last {
            remaining
        } else {
            percent_of(contract_value, percents)?
        };
        remaining -= total_value;
        plans.push(BatchPlan {
            phase,
            name: name.to_string(),
            percents,
            total_value,
        });
    }
    Ok(plans)
}

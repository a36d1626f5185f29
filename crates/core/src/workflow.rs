//! Status rules for projects, quotations, contracts and documents.

use crate::error::CoreError;
use crate::roles::ROLE_CONSULTANT;
use crate::status::{ContractStatus, DocStatus, ProjectStatus, QuotationStatus};

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Projects only move forward, one step at a time.
pub fn next_project_status(current: ProjectStatus) -> Option<ProjectStatus> {
    match current {
        ProjectStatus::Requesting => Some(ProjectStatus::Processing),
        ProjectStatus::Processing => Some(ProjectStatus::Designing),
        ProjectStatus::Designing => Some(ProjectStatus::Constructing),
        ProjectStatus::Constructing => Some(ProjectStatus::Finished),
        ProjectStatus::Finished => None,
    }
}

pub fn validate_project_transition(
    from: ProjectStatus,
    to: ProjectStatus,
) -> Result<(), CoreError> {
    if next_project_status(from) == Some(to) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid project transition: {from} -> {to}"
        )))
    }
}

/// Status after assigning a staff member with `role` to the project.
///
/// The first consultant picks up a requesting project.
pub fn project_status_after_assignment(current: ProjectStatus, role: &str) -> ProjectStatus {
    if current == ProjectStatus::Requesting && role == ROLE_CONSULTANT {
        ProjectStatus::Processing
    } else {
        current
    }
}

/// Construction items can be planned once the project reaches construction.
pub fn ensure_project_constructing(status: ProjectStatus) -> Result<(), CoreError> {
    match status {
        ProjectStatus::Constructing => Ok(()),
        other => Err(CoreError::Validation(format!(
            "Project must be {} to plan construction, it is {other}",
            ProjectStatus::Constructing
        ))),
    }
}

// ---------------------------------------------------------------------------
// Quotations
// ---------------------------------------------------------------------------

pub fn ensure_quotation_reviewable(status: QuotationStatus) -> Result<(), CoreError> {
    if status != QuotationStatus::Previewing {
        return Err(CoreError::Validation(format!(
            "Quotation has already been reviewed ({status})"
        )));
    }
    Ok(())
}

pub fn ensure_quotation_approved(status: QuotationStatus) -> Result<(), CoreError> {
    if status != QuotationStatus::Approved {
        return Err(CoreError::Validation(format!(
            "Contracts require an approved quotation, quotation is {status}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Contracts and documents
// ---------------------------------------------------------------------------

/// A contract accepts OTP requests and verification only while processing.
pub fn ensure_contract_pending(status: ContractStatus) -> Result<(), CoreError> {
    match status {
        ContractStatus::Processing => Ok(()),
        ContractStatus::Active => Err(CoreError::Validation(
            "Contract is already confirmed".into(),
        )),
        ContractStatus::Cancelled => Err(CoreError::Validation(
            "Contract has been cancelled".into(),
        )),
    }
}

/// A project holds at most one open (processing or active) contract.
pub fn ensure_no_open_contract(
    existing: impl IntoIterator<Item = ContractStatus>,
) -> Result<(), CoreError> {
    if existing
        .into_iter()
        .any(|s| matches!(s, ContractStatus::Processing | ContractStatus::Active))
    {
        return Err(CoreError::Conflict(
            "Project already has an open contract".into(),
        ));
    }
    Ok(())
}

pub fn ensure_doc_pending(status: DocStatus) -> Result<(), CoreError> {
    match status {
        DocStatus::Processing => Ok(()),
        DocStatus::Active => Err(CoreError::Validation(
            "Document is already confirmed".into(),
        )),
    }
}

/// Rejections and cancellations must explain themselves.
pub fn require_reason(reason: Option<&str>) -> Result<&str, CoreError> {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => Ok(r),
        _ => Err(CoreError::Validation("A reason is required".into())),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::roles::ROLE_DESIGNER;

    #[test]
    fn projects_move_one_step_forward() {
        assert!(validate_project_transition(ProjectStatus::Requesting, ProjectStatus::Processing).is_ok());
        assert!(validate_project_transition(ProjectStatus::Designing, ProjectStatus::Constructing).is_ok());
        assert!(validate_project_transition(ProjectStatus::Requesting, ProjectStatus::Constructing).is_err());
        assert!(validate_project_transition(ProjectStatus::Finished, ProjectStatus::Requesting).is_err());
    }

    #[test]
    fn consultant_assignment_picks_up_request() {
        assert_eq!(
            project_status_after_assignment(ProjectStatus::Requesting, ROLE_CONSULTANT),
            ProjectStatus::Processing
        );
        assert_eq!(
            project_status_after_assignment(ProjectStatus::Requesting, ROLE_DESIGNER),
            ProjectStatus::Requesting
        );
        assert_eq!(
            project_status_after_assignment(ProjectStatus::Designing, ROLE_CONSULTANT),
            ProjectStatus::Designing
        );
    }

    #[test]
    fn confirmed_contract_rejects_otp() {
        assert!(ensure_contract_pending(ContractStatus::Processing).is_ok());
        assert_matches!(
            ensure_contract_pending(ContractStatus::Active),
            Err(CoreError::Validation(msg)) if msg.contains("already confirmed")
        );
        assert!(ensure_contract_pending(ContractStatus::Cancelled).is_err());
    }

    #[test]
    fn open_contract_blocks_a_new_one() {
        assert!(ensure_no_open_contract([ContractStatus::Cancelled]).is_ok());
        assert_matches!(
            ensure_no_open_contract([ContractStatus::Cancelled, ContractStatus::Active]),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn quotation_review_is_single_shot() {
        assert!(ensure_quotation_reviewable(QuotationStatus::Previewing).is_ok());
        assert!(ensure_quotation_reviewable(QuotationStatus::Approved).is_err());
        assert!(ensure_quotation_approved(QuotationStatus::Rejected).is_err());
    }

    #[test]
    fn reason_must_be_present() {
        assert_eq!(require_reason(Some("  too pricey ")).unwrap(), "too pricey");
        assert!(require_reason(Some("  ")).is_err());
        assert!(require_reason(None).is_err());
    }
}

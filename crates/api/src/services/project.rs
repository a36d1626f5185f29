//! Project staffing and status transitions.

use koi_core::error::CoreError;
use koi_core::roles::is_staff_position;
use koi_core::status::ProjectStatus;
use koi_core::types::DbId;
use koi_core::workflow::{project_status_after_assignment, validate_project_transition};
use koi_db::models::project::Project;
use koi_db::repositories::{ProjectRepo, UserRepo};
use koi_db::DbPool;

use crate::error::{AppError, AppResult};

/// Assign a staff member. The first consultant picks up a requesting project.
pub async fn assign_staff(pool: &DbPool, project_id: DbId, staff_id: DbId) -> AppResult<Project> {
    let staff = UserRepo::find_by_id(pool, staff_id)
        .await?
        .ok_or_else(|| AppError::not_found("Staff", staff_id))?;
    if !staff.is_active || !is_staff_position(&staff.role) {
        return Err(CoreError::Validation(format!(
            "User {staff_id} is not an active staff member"
        ))
        .into());
    }

    let mut tx = pool.begin().await?;
    let project = ProjectRepo::find_for_update(&mut *tx, project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", project_id))?;

    if ProjectRepo::is_member(&mut *tx, project_id, staff_id).await? {
        return Err(CoreError::Conflict("Staff is already assigned to this project".into()).into());
    }
    ProjectRepo::assign_staff(&mut *tx, project_id, staff_id).await?;

    let next = project_status_after_assignment(project.status, &staff.role);
    let project = if next != project.status {
        ProjectRepo::set_status(&mut *tx, project_id, next).await?
    } else {
        project
    };
    tx.commit().await?;

    tracing::info!(%project_id, %staff_id, role = %staff.role, status = %project.status, "Staff assigned to project");
    Ok(project)
}

/// Move a project one step forward.
pub async fn change_status(
    pool: &DbPool,
    project_id: DbId,
    to: ProjectStatus,
) -> AppResult<Project> {
    let mut tx = pool.begin().await?;
    let project = ProjectRepo::find_for_update(&mut *tx, project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", project_id))?;
    validate_project_transition(project.status, to)?;
    let updated = ProjectRepo::set_status(&mut *tx, project_id, to).await?;
    tx.commit().await?;

    tracing::info!(%project_id, from = %project.status, %to, "Project status changed");
    Ok(updated)
}

//! Project visibility rules.

use koi_core::error::CoreError;
use koi_core::types::DbId;
use koi_db::models::project::Project;
use koi_db::repositories::ProjectRepo;
use koi_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Load a project or fail with 404.
pub async fn load_project(pool: &DbPool, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))
}

/// Managers see every project, customers their own, other staff the
/// projects they are assigned to.
pub async fn ensure_can_view(pool: &DbPool, user: &AuthUser, project: &Project) -> AppResult<()> {
    if user.is_manager() {
        return Ok(());
    }
    if user.is_customer() {
        return ensure_owner(user, project);
    }
    if ProjectRepo::is_member(pool, project.id, user.user_id).await? {
        return Ok(());
    }
    Err(CoreError::Forbidden("You are not assigned to this project".into()).into())
}

/// Only the project's customer may review quotations and confirm documents.
pub fn ensure_owner(user: &AuthUser, project: &Project) -> AppResult<()> {
    if project.customer_id != user.user_id {
        return Err(CoreError::Forbidden("Only the project's customer may do this".into()).into());
    }
    Ok(())
}

/// Load a project and check the caller may view it.
pub async fn load_visible_project(
    pool: &DbPool,
    user: &AuthUser,
    id: DbId,
) -> AppResult<Project> {
    let project = load_project(pool, id).await?;
    ensure_can_view(pool, user, &project).await?;
    Ok(project)
}

//! Project and project staff models.

use koi_core::status::ProjectStatus;
use koi_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub customer_id: DbId,
    pub name: String,
    pub address: String,
    pub area: Option<f64>,
    pub depth: Option<f64>,
    pub note: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for a customer's project request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(range(min = 0.0))]
    pub area: Option<f64>,
    #[validate(range(min = 0.0))]
    pub depth: Option<f64>,
    pub note: Option<String>,
}

/// DTO for updating project details. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub address: Option<String>,
    pub area: Option<f64>,
    pub depth: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProjectStatus {
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignStaff {
    pub staff_id: DbId,
}

/// A staff member assigned to a project, joined with the user row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectStaffMember {
    pub staff_id: DbId,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub assigned_at: Timestamp,
}

//! Repository for the `projects` and `project_staffs` tables.

use koi_core::status::ProjectStatus;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::project::{CreateProject, Project, ProjectStaffMember, UpdateProject};

/// Column list for `projects` queries.
const COLUMNS: &str = "id, customer_id, name, address, area, depth, note, status, \
                        is_active, created_at, updated_at";

/// Provides CRUD operations for projects and their staff.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project in REQUESTING status.
    pub async fn create(
        pool: &PgPool,
        customer_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (customer_id, name, address, area, depth, note, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(customer_id)
            .bind(input.name.trim())
            .bind(input.address.trim())
            .bind(input.area)
            .bind(input.depth)
            .bind(&input.note)
            .bind(ProjectStatus::Requesting.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find an active project by ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock a project row for the rest of the transaction.
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE id = $1 AND is_active FOR UPDATE"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List all active projects, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE is_active ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// List a customer's own projects.
    pub async fn list_by_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects \
             WHERE customer_id = $1 AND is_active \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(customer_id)
            .fetch_all(pool)
            .await
    }

    /// List projects a staff member is assigned to.
    pub async fn list_by_staff(
        pool: &PgPool,
        staff_id: DbId,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM projects p \
             JOIN project_staffs ps ON ps.project_id = p.id \
             WHERE ps.staff_id = $1 AND p.is_active \
             ORDER BY p.created_at DESC",
            prefixed("p")
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(staff_id)
            .fetch_all(pool)
            .await
    }

    /// Update project details. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                name = COALESCE($2, name), \
                address = COALESCE($3, address), \
                area = COALESCE($4, area), \
                depth = COALESCE($5, depth), \
                note = COALESCE($6, note) \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(input.address.as_deref().map(str::trim))
            .bind(input.area)
            .bind(input.depth)
            .bind(&input.note)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        status: ProjectStatus,
    ) -> Result<Project, sqlx::Error> {
        let query = format!("UPDATE projects SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(executor)
            .await
    }

    /// Assign a staff member. Fails with `uq_project_staffs_pair` on repeats.
    pub async fn assign_staff<'e>(
        executor: impl PgExecutor<'e>,
        project_id: DbId,
        staff_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO project_staffs (project_id, staff_id) VALUES ($1, $2)")
            .bind(project_id)
            .bind(staff_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn is_member<'e>(
        executor: impl PgExecutor<'e>,
        project_id: DbId,
        staff_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM project_staffs WHERE project_id = $1 AND staff_id = $2)",
        )
        .bind(project_id)
        .bind(staff_id)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    pub async fn list_staff(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ProjectStaffMember>, sqlx::Error> {
        sqlx::query_as::<_, ProjectStaffMember>(
            "SELECT u.id AS staff_id, u.full_name, u.email, u.role, ps.created_at AS assigned_at \
             FROM project_staffs ps \
             JOIN users u ON u.id = ps.staff_id \
             WHERE ps.project_id = $1 \
             ORDER BY ps.created_at",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}

/// `COLUMNS` qualified with a table alias, for joins.
fn prefixed(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

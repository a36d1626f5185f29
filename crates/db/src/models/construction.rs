//! Construction items (two-level tree) and their tasks.

use chrono::NaiveDate;
use koi_core::status::{ItemStatus, TaskStatus};
use koi_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConstructionItem {
    pub id: DbId,
    pub project_id: DbId,
    /// `None` for level-1 items.
    pub parent_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub estimate_at: Option<NaiveDate>,
    pub actual_at: Option<NaiveDate>,
    pub is_payment: bool,
    #[sqlx(try_from = "String")]
    pub status: ItemStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A level-1 item with its level-2 children, as returned by tree listings.
#[derive(Debug, Clone, Serialize)]
pub struct ConstructionItemNode {
    #[serde(flatten)]
    pub item: ConstructionItem,
    pub children: Vec<ConstructionItem>,
}

/// Level-2 child in a create request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChildItem {
    pub name: String,
    pub description: Option<String>,
    pub estimate_at: Option<NaiveDate>,
}

/// Level-1 item in a create request, optionally with children.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConstructionItem {
    pub name: String,
    pub description: Option<String>,
    pub estimate_at: Option<NaiveDate>,
    #[serde(default)]
    pub is_payment: bool,
    #[serde(default)]
    pub children: Vec<CreateChildItem>,
}

/// Insert payload for a single item row.
#[derive(Debug, Clone)]
pub struct NewConstructionItem<'a> {
    pub project_id: DbId,
    pub parent_id: Option<DbId>,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub estimate_at: Option<NaiveDate>,
    pub is_payment: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConstructionTask {
    pub id: DbId,
    pub construction_item_id: DbId,
    pub staff_id: Option<DbId>,
    pub name: String,
    pub image_url: Option<String>,
    pub reason: Option<String>,
    pub deadline_at: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One task in a create request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConstructionTask {
    pub name: String,
    pub deadline_at: Option<NaiveDate>,
}

/// Partial update of a task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateConstructionTask {
    pub name: Option<String>,
    pub staff_id: Option<DbId>,
    pub image_url: Option<String>,
    pub reason: Option<String>,
    pub deadline_at: Option<NaiveDate>,
}

/// Fully resolved column values written by a task update.
#[derive(Debug, Clone)]
pub struct TaskWrite {
    pub name: String,
    pub staff_id: Option<DbId>,
    pub image_url: Option<String>,
    pub reason: Option<String>,
    pub deadline_at: Option<NaiveDate>,
    pub status: TaskStatus,
}

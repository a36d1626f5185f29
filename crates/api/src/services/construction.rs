//! Construction item tree and task status cascade.
//!
//! Every write runs in one transaction. Rows are locked in a fixed order
//! (task, then level-2 item, then level-1 parent) so that concurrent
//! confirmations of sibling tasks or items serialize on the shared parent
//! and each sees the other's committed status.

use std::collections::HashMap;

use koi_core::construction::{self, Cascade, ItemDraft, ItemLevel, TaskChange};
use koi_core::error::CoreError;
use koi_core::roles::ROLE_CONSTRUCTOR;
use koi_core::status::{ItemStatus, TaskStatus};
use koi_core::types::DbId;
use koi_core::workflow::ensure_project_constructing;
use koi_db::models::construction::{
    ConstructionItem, ConstructionItemNode, ConstructionTask, CreateChildItem,
    CreateConstructionItem, CreateConstructionTask, NewConstructionItem, TaskWrite,
    UpdateConstructionTask,
};
use koi_db::repositories::{ConstructionItemRepo, ConstructionTaskRepo, ProjectRepo, UserRepo};
use koi_db::DbPool;
use sqlx::{Postgres, Transaction};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Group a project's items into level-1 nodes with their children.
pub fn build_tree(items: Vec<ConstructionItem>) -> Vec<ConstructionItemNode> {
    let mut children: HashMap<DbId, Vec<ConstructionItem>> = HashMap::new();
    let mut roots = Vec::new();
    for item in items {
        match item.parent_id {
            Some(parent_id) => children.entry(parent_id).or_default().push(item),
            None => roots.push(item),
        }
    }
    roots
        .into_iter()
        .map(|item| ConstructionItemNode {
            children: children.remove(&item.id).unwrap_or_default(),
            item,
        })
        .collect()
}

pub async fn list_tree(pool: &DbPool, project_id: DbId) -> AppResult<Vec<ConstructionItemNode>> {
    let items = ConstructionItemRepo::list_by_project(pool, project_id).await?;
    Ok(build_tree(items))
}

pub async fn load_item(pool: &DbPool, id: DbId) -> AppResult<ConstructionItem> {
    ConstructionItemRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("ConstructionItem", id))
}

pub async fn load_task(pool: &DbPool, id: DbId) -> AppResult<ConstructionTask> {
    ConstructionTaskRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("ConstructionTask", id))
}

/// Project that owns a task, via its level-2 item.
pub async fn project_of_task(pool: &DbPool, task: &ConstructionTask) -> AppResult<DbId> {
    Ok(load_item(pool, task.construction_item_id).await?.project_id)
}

async fn lock_item(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
) -> AppResult<ConstructionItem> {
    ConstructionItemRepo::find_for_update(&mut **tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("ConstructionItem", id))
}

async fn lock_task(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
) -> AppResult<ConstructionTask> {
    ConstructionTaskRepo::find_for_update(&mut **tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("ConstructionTask", id))
}

fn parent_of(item: &ConstructionItem) -> AppResult<DbId> {
    item.parent_id.ok_or_else(|| {
        AppError::InternalError(format!("Child construction item {} has no parent", item.id))
    })
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Create level-1 items, each with optional level-2 children.
pub async fn create_items(
    pool: &DbPool,
    project_id: DbId,
    input: &[CreateConstructionItem],
) -> AppResult<Vec<ConstructionItemNode>> {
    let mut tx = pool.begin().await?;

    // The project lock serializes tree edits so the payment cap holds.
    let project = ProjectRepo::find_for_update(&mut *tx, project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", project_id))?;
    ensure_project_constructing(project.status)?;

    let roots = ConstructionItemRepo::list_roots(&mut *tx, project_id).await?;
    let root_names: Vec<&str> = roots.iter().map(|r| r.name.as_str()).collect();
    let payment_items = roots.iter().filter(|r| r.is_payment).count() as i64;

    let drafts: Vec<ItemDraft<'_>> = input
        .iter()
        .map(|item| ItemDraft {
            name: &item.name,
            is_payment: item.is_payment,
            children: item.children.iter().map(|c| c.name.as_str()).collect(),
        })
        .collect();
    construction::validate_item_tree(&drafts, &root_names, payment_items)?;

    let mut nodes = Vec::with_capacity(input.len());
    for draft in input {
        let item = ConstructionItemRepo::create(
            &mut *tx,
            &NewConstructionItem {
                project_id,
                parent_id: None,
                name: draft.name.trim(),
                description: draft.description.as_deref(),
                estimate_at: draft.estimate_at,
                is_payment: draft.is_payment,
            },
        )
        .await?;
        let children = insert_children(&mut tx, &item, &draft.children).await?;
        nodes.push(ConstructionItemNode { item, children });
    }

    tx.commit().await?;
    tracing::info!(%project_id, created = nodes.len(), "Construction items created");
    Ok(nodes)
}

/// Add level-2 children under an existing level-1 item.
pub async fn add_children(
    pool: &DbPool,
    parent_id: DbId,
    input: &[CreateChildItem],
) -> AppResult<Vec<ConstructionItem>> {
    let mut tx = pool.begin().await?;

    let parent = lock_item(&mut tx, parent_id).await?;
    construction::ensure_can_hold_children(ItemLevel::of(parent.parent_id))?;
    construction::ensure_accepts_work(parent.status)?;

    let existing = ConstructionItemRepo::list_children(&mut *tx, parent_id).await?;
    construction::validate_new_names(
        input.iter().map(|c| c.name.as_str()),
        existing.iter().map(|c| c.name.as_str()),
        "Construction item",
    )?;

    let children = insert_children(&mut tx, &parent, input).await?;
    tx.commit().await?;

    tracing::info!(%parent_id, created = children.len(), "Child construction items created");
    Ok(children)
}

async fn insert_children(
    tx: &mut Transaction<'_, Postgres>,
    parent: &ConstructionItem,
    children: &[CreateChildItem],
) -> AppResult<Vec<ConstructionItem>> {
    let mut created = Vec::with_capacity(children.len());
    for child in children {
        let row = ConstructionItemRepo::create(
            &mut **tx,
            &NewConstructionItem {
                project_id: parent.project_id,
                parent_id: Some(parent.id),
                name: child.name.trim(),
                description: child.description.as_deref(),
                estimate_at: child.estimate_at,
                is_payment: false,
            },
        )
        .await?;
        created.push(row);
    }
    Ok(created)
}

/// Delete an OPENING item with no children and no tasks.
pub async fn delete_item(pool: &DbPool, id: DbId) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let item = lock_item(&mut tx, id).await?;
    let parent = match item.parent_id {
        Some(parent_id) => Some(lock_item(&mut tx, parent_id).await?),
        None => None,
    };

    let child_count = ConstructionItemRepo::count_children(&mut *tx, id).await?;
    let task_count = ConstructionTaskRepo::count_by_item(&mut *tx, id).await?;
    construction::ensure_item_deletable(item.status, child_count, task_count)?;
    ConstructionItemRepo::delete(&mut *tx, id).await?;

    // Removing the last unfinished child can complete the parent.
    if let Some(parent) = parent {
        let siblings = ConstructionItemRepo::list_children(&mut *tx, parent.id).await?;
        if parent.status != ItemStatus::Done
            && construction::all_done(siblings.iter().map(|s| s.status))
        {
            ConstructionItemRepo::set_status(&mut *tx, parent.id, ItemStatus::Done).await?;
            tracing::info!(item_id = %parent.id, "Construction item done");
        }
    }

    tx.commit().await?;
    tracing::info!(item_id = %id, "Construction item deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Create tasks on a level-2 item and open the item (and its parent).
pub async fn create_tasks(
    pool: &DbPool,
    item_id: DbId,
    input: &[CreateConstructionTask],
) -> AppResult<Vec<ConstructionTask>> {
    let mut tx = pool.begin().await?;

    let item = lock_item(&mut tx, item_id).await?;
    construction::ensure_can_hold_tasks(ItemLevel::of(item.parent_id))?;
    construction::ensure_accepts_work(item.status)?;
    let parent = lock_item(&mut tx, parent_of(&item)?).await?;

    let existing = ConstructionTaskRepo::list_by_item(&mut *tx, item_id).await?;
    construction::validate_new_names(
        input.iter().map(|t| t.name.as_str()),
        existing.iter().map(|t| t.name.as_str()),
        "Task",
    )?;

    let mut tasks = Vec::with_capacity(input.len());
    for task in input {
        tasks.push(
            ConstructionTaskRepo::create(&mut *tx, item_id, task.name.trim(), task.deadline_at)
                .await?,
        );
    }

    for locked in [&item, &parent] {
        let next = construction::status_after_work_added(locked.status);
        if next != locked.status {
            ConstructionItemRepo::set_status(&mut *tx, locked.id, next).await?;
            tracing::info!(
                item_id = %locked.id,
                from = %locked.status,
                to = %next,
                "Construction item status changed"
            );
        }
    }

    tx.commit().await?;
    tracing::info!(%item_id, created = tasks.len(), "Construction tasks created");
    Ok(tasks)
}

/// Apply a partial task update in the order name, staff, image, reason.
///
/// Constructors may only attach an image to a task assigned to them.
pub async fn update_task(
    pool: &DbPool,
    user: &AuthUser,
    task_id: DbId,
    patch: &UpdateConstructionTask,
) -> AppResult<ConstructionTask> {
    let mut tx = pool.begin().await?;

    let task = lock_task(&mut tx, task_id).await?;
    if user.role == ROLE_CONSTRUCTOR {
        ensure_constructor_patch(user, &task, patch)?;
    }

    let item = ConstructionItemRepo::find_by_id(&mut *tx, task.construction_item_id)
        .await?
        .ok_or_else(|| AppError::not_found("ConstructionItem", task.construction_item_id))?;

    let mut name = task.name.clone();
    if let Some(new_name) = &patch.name {
        let siblings = ConstructionTaskRepo::list_by_item(&mut *tx, item.id).await?;
        construction::validate_new_names(
            [new_name.as_str()],
            siblings
                .iter()
                .filter(|t| t.id != task.id)
                .map(|t| t.name.as_str()),
            "Task",
        )?;
        name = new_name.trim().to_string();
    }

    if let Some(staff_id) = patch.staff_id {
        let is_member = ProjectRepo::is_member(&mut *tx, item.project_id, staff_id).await?;
        let role = if is_member {
            UserRepo::find_by_id(&mut *tx, staff_id)
                .await?
                .map(|u| u.role)
                .unwrap_or_default()
        } else {
            String::new()
        };
        construction::validate_task_assignee(is_member, &role)?;
    }

    let change = TaskChange {
        assigns_staff: patch.staff_id.is_some(),
        image_url: patch.image_url.as_deref(),
        reason: patch.reason.as_deref(),
    };
    let status = construction::apply_task_change(task.status, task.image_url.as_deref(), &change)?;

    let write = TaskWrite {
        name,
        staff_id: patch.staff_id.or(task.staff_id),
        image_url: patch
            .image_url
            .as_ref()
            .map(|u| u.trim().to_string())
            .or(task.image_url.clone()),
        reason: patch
            .reason
            .as_ref()
            .map(|r| r.trim().to_string())
            .or(task.reason.clone()),
        deadline_at: patch.deadline_at.or(task.deadline_at),
        status,
    };
    let updated = ConstructionTaskRepo::update(&mut *tx, task_id, &write).await?;
    tx.commit().await?;

    if updated.status != task.status {
        tracing::info!(
            %task_id,
            from = %task.status,
            to = %updated.status,
            "Construction task status changed"
        );
    }
    Ok(updated)
}

fn ensure_constructor_patch(
    user: &AuthUser,
    task: &ConstructionTask,
    patch: &UpdateConstructionTask,
) -> Result<(), CoreError> {
    if task.staff_id != Some(user.user_id) {
        return Err(CoreError::Forbidden("Task is not assigned to you".into()));
    }
    let only_image = patch.name.is_none()
        && patch.staff_id.is_none()
        && patch.reason.is_none()
        && patch.deadline_at.is_none();
    if !only_image {
        return Err(CoreError::Forbidden(
            "Constructors may only upload task images".into(),
        ));
    }
    Ok(())
}

/// Confirm a previewed task and cascade completion up the tree.
pub async fn confirm_task(pool: &DbPool, task_id: DbId) -> AppResult<ConstructionTask> {
    let mut tx = pool.begin().await?;

    let task = lock_task(&mut tx, task_id).await?;
    construction::ensure_confirmable(task.status, task.image_url.as_deref())?;

    let item = lock_item(&mut tx, task.construction_item_id).await?;
    let parent = lock_item(&mut tx, parent_of(&item)?).await?;

    let confirmed = ConstructionTaskRepo::set_status(&mut *tx, task_id, TaskStatus::Done).await?;
    tracing::info!(%task_id, item_id = %item.id, "Construction task confirmed");

    let cascade = cascade_in_tx(&mut tx, &item, &parent).await?;
    tx.commit().await?;

    if cascade.item_done {
        tracing::info!(item_id = %item.id, "Construction item done");
    }
    if cascade.parent_done {
        tracing::info!(item_id = %parent.id, "Construction item done");
    }
    Ok(confirmed)
}

/// Delete an OPENING task.
pub async fn delete_task(pool: &DbPool, task_id: DbId) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let task = lock_task(&mut tx, task_id).await?;
    construction::ensure_task_deletable(task.status)?;
    let item = lock_item(&mut tx, task.construction_item_id).await?;
    let parent = lock_item(&mut tx, parent_of(&item)?).await?;

    ConstructionTaskRepo::delete(&mut *tx, task_id).await?;

    // Removing the last unfinished task can complete the item.
    let cascade = if item.status == ItemStatus::Done {
        Cascade::default()
    } else {
        cascade_in_tx(&mut tx, &item, &parent).await?
    };
    tx.commit().await?;

    tracing::info!(
        %task_id,
        item_done = cascade.item_done,
        parent_done = cascade.parent_done,
        "Construction task deleted"
    );
    Ok(())
}

/// Recompute completion for a locked level-2 item and its locked parent.
async fn cascade_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    item: &ConstructionItem,
    parent: &ConstructionItem,
) -> AppResult<Cascade> {
    let tasks = ConstructionTaskRepo::list_by_item(&mut **tx, item.id).await?;
    let task_statuses: Vec<TaskStatus> = tasks.iter().map(|t| t.status).collect();
    let siblings: Vec<(DbId, ItemStatus)> =
        ConstructionItemRepo::list_children(&mut **tx, parent.id)
            .await?
            .iter()
            .map(|s| (s.id, s.status))
            .collect();

    let cascade = construction::cascade_after_confirm(&task_statuses, item.id, &siblings);
    if cascade.item_done && item.status != ItemStatus::Done {
        ConstructionItemRepo::set_status(&mut **tx, item.id, ItemStatus::Done).await?;
    }
    if cascade.parent_done && parent.status != ItemStatus::Done {
        ConstructionItemRepo::set_status(&mut **tx, parent.id, ItemStatus::Done).await?;
    }
    Ok(cascade)
}

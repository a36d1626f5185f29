//! Construction item/task rules.
//!
//! Items form a fixed two-level tree per project: level-1 items have no
//! parent, level-2 items hang off a level-1 item, and tasks hang off level-2
//! items. Task transitions cascade completion upwards:
//!
//! ```text
//! task:  OPENING --staff--> PROCESSING --image--> PREVIEWING --confirm--> DONE
//!                               ^                     |
//!                               +-------reason--------+
//! item:  OPENING --first task--> PROCESSING --all children DONE--> DONE
//! ```
//!
//! The functions here are pure; the API layer loads rows, asks these rules
//! what to do, and writes the results inside one transaction.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::roles::ROLE_CONSTRUCTOR;
use crate::status::{ItemStatus, TaskStatus};
use crate::types::DbId;

/// Maximum number of level-1 items per project flagged as payment milestones.
pub const MAX_PAYMENT_ITEMS: i64 = 3;

/// Maximum length of an item or task name.
pub const MAX_NAME_LENGTH: usize = 255;

// ---------------------------------------------------------------------------
// Tree shape
// ---------------------------------------------------------------------------

/// Position of an item in the two-level tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLevel {
    /// Level-1 item, no parent.
    Parent,
    /// Level-2 item under a level-1 parent.
    Child,
}

impl ItemLevel {
    pub fn of(parent_id: Option<DbId>) -> Self {
        match parent_id {
            Some(_) => ItemLevel::Child,
            None => ItemLevel::Parent,
        }
    }
}

/// Anything that can report completion, so one reduction serves items and tasks.
pub trait Completion {
    fn is_done(&self) -> bool;
}

impl Completion for ItemStatus {
    fn is_done(&self) -> bool {
        *self == ItemStatus::Done
    }
}

impl Completion for TaskStatus {
    fn is_done(&self) -> bool {
        *self == TaskStatus::Done
    }
}

/// True when there is at least one child and every child is done.
pub fn all_done<S: Completion>(statuses: impl IntoIterator<Item = S>) -> bool {
    let mut seen = false;
    for status in statuses {
        if !status.is_done() {
            return false;
        }
        seen = true;
    }
    seen
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Comparison key for sibling names: trimmed and case-folded.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn validate_name(name: &str, what: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{what} name must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "{what} name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a batch of new sibling names against each other and the
/// names already present under the same parent.
pub fn validate_new_names<'a, 'b>(
    new_names: impl IntoIterator<Item = &'a str>,
    existing: impl IntoIterator<Item = &'b str>,
    what: &str,
) -> Result<(), CoreError> {
    let mut seen: HashSet<String> = existing.into_iter().map(name_key).collect();
    let mut any = false;
    for name in new_names {
        any = true;
        validate_name(name, what)?;
        if !seen.insert(name_key(name)) {
            return Err(CoreError::Validation(format!(
                "{what} name '{}' is duplicated",
                name.trim()
            )));
        }
    }
    if !any {
        return Err(CoreError::Validation(format!("At least one {what} is required")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Item tree creation
// ---------------------------------------------------------------------------

/// A level-1 item to be created together with its level-2 children.
#[derive(Debug, Clone)]
pub struct ItemDraft<'a> {
    pub name: &'a str,
    pub is_payment: bool,
    pub children: Vec<&'a str>,
}

/// Validate a new item tree for a project.
///
/// `existing_roots` are the names of level-1 items already in the project and
/// `existing_payment_items` how many of them are payment milestones.
pub fn validate_item_tree(
    drafts: &[ItemDraft<'_>],
    existing_roots: &[&str],
    existing_payment_items: i64,
) -> Result<(), CoreError> {
    validate_new_names(
        drafts.iter().map(|d| d.name),
        existing_roots.iter().copied(),
        "Construction item",
    )?;

    for draft in drafts {
        if !draft.children.is_empty() {
            validate_new_names(draft.children.iter().copied(), [], "Construction item")?;
        }
    }

    let payment_items =
        existing_payment_items + drafts.iter().filter(|d| d.is_payment).count() as i64;
    if payment_items > MAX_PAYMENT_ITEMS {
        return Err(CoreError::Validation(format!(
            "A project can have at most {MAX_PAYMENT_ITEMS} payment items"
        )));
    }
    Ok(())
}

/// Children are added under an existing level-1 item only.
pub fn ensure_can_hold_children(parent_level: ItemLevel) -> Result<(), CoreError> {
    match parent_level {
        ItemLevel::Parent => Ok(()),
        ItemLevel::Child => Err(CoreError::Validation(
            "Construction items can only be nested two levels deep".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Task creation
// ---------------------------------------------------------------------------

/// Tasks can only be attached to level-2 items.
pub fn ensure_can_hold_tasks(level: ItemLevel) -> Result<(), CoreError> {
    match level {
        ItemLevel::Child => Ok(()),
        ItemLevel::Parent => Err(CoreError::Validation(
            "Tasks can only be added to a child construction item".into(),
        )),
    }
}

/// New tasks or children cannot be added under a finished item.
pub fn ensure_accepts_work(status: ItemStatus) -> Result<(), CoreError> {
    if status == ItemStatus::Done {
        return Err(CoreError::Validation(
            "Construction item is already done".into(),
        ));
    }
    Ok(())
}

/// Status an item moves to when tasks (or children with tasks) are added.
///
/// Only OPENING moves; PROCESSING and DONE are left alone.
pub fn status_after_work_added(current: ItemStatus) -> ItemStatus {
    match current {
        ItemStatus::Opening => ItemStatus::Processing,
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Task updates
// ---------------------------------------------------------------------------

/// The status-relevant part of a task patch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskChange<'a> {
    /// A staff member is being (re)assigned.
    pub assigns_staff: bool,
    /// A new image is uploaded.
    pub image_url: Option<&'a str>,
    /// A rejection reason is supplied.
    pub reason: Option<&'a str>,
}

/// Check that `role` may work on tasks of a project it `is_member` of.
pub fn validate_task_assignee(is_member: bool, role: &str) -> Result<(), CoreError> {
    if !is_member {
        return Err(CoreError::Validation(
            "Staff is not assigned to this project".into(),
        ));
    }
    if role != ROLE_CONSTRUCTOR {
        return Err(CoreError::Validation(format!(
            "Staff must hold the {ROLE_CONSTRUCTOR} position, found {role}"
        )));
    }
    Ok(())
}

/// Apply a task patch to `current` and return the resulting status.
///
/// Steps run in order staff, image, reason, so a patch carrying several
/// fields moves through each matching transition once. `stored_image` is the
/// image on the task before this patch.
pub fn apply_task_change(
    current: TaskStatus,
    stored_image: Option<&str>,
    change: &TaskChange<'_>,
) -> Result<TaskStatus, CoreError> {
    if current == TaskStatus::Done {
        return Err(CoreError::Validation("Task is already done".into()));
    }

    if let Some(image) = change.image_url {
        if image.trim().is_empty() {
            return Err(CoreError::Validation("Image URL must not be empty".into()));
        }
    }

    if let Some(reason) = change.reason {
        if stored_image.map_or(true, |img| img.trim().is_empty()) {
            return Err(CoreError::Validation(
                "A reason can only be given once an image has been uploaded".into(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(CoreError::Validation("Reason must not be empty".into()));
        }
    }

    let mut status = current;
    if change.assigns_staff && status == TaskStatus::Opening {
        status = TaskStatus::Processing;
    }
    if change.image_url.is_some() && status == TaskStatus::Processing {
        status = TaskStatus::Previewing;
    }
    if change.reason.is_some() && status == TaskStatus::Previewing {
        status = TaskStatus::Processing;
    }
    Ok(status)
}

// ---------------------------------------------------------------------------
// Task confirmation
// ---------------------------------------------------------------------------

/// A task can be confirmed only while PREVIEWING with an image.
pub fn ensure_confirmable(status: TaskStatus, image_url: Option<&str>) -> Result<(), CoreError> {
    if status != TaskStatus::Previewing {
        return Err(CoreError::Validation(format!(
            "Only previewing tasks can be confirmed, task is {status}"
        )));
    }
    if image_url.map_or(true, |img| img.trim().is_empty()) {
        return Err(CoreError::Validation(
            "Task has no image to confirm".into(),
        ));
    }
    Ok(())
}

/// Which ancestors become DONE after a task is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cascade {
    pub item_done: bool,
    pub parent_done: bool,
}

/// Compute the cascade after confirming a task.
///
/// - `task_statuses`: every task of the level-2 item, with the confirmed task
///   already counted as DONE.
/// - `item_id`: the level-2 item.
/// - `sibling_items`: every level-2 child of the parent, including `item_id`
///   with its status before this cascade.
pub fn cascade_after_confirm(
    task_statuses: &[TaskStatus],
    item_id: DbId,
    sibling_items: &[(DbId, ItemStatus)],
) -> Cascade {
    let item_done = all_done(task_statuses.iter().copied());
    if !item_done {
        return Cascade::default();
    }

    let parent_done = all_done(sibling_items.iter().map(|&(id, status)| {
        if id == item_id {
            ItemStatus::Done
        } else {
            status
        }
    }));

    Cascade {
        item_done,
        parent_done,
    }
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

pub fn ensure_task_deletable(status: TaskStatus) -> Result<(), CoreError> {
    if status != TaskStatus::Opening {
        return Err(CoreError::Validation(format!(
            "Only opening tasks can be deleted, task is {status}"
        )));
    }
    Ok(())
}

pub fn ensure_item_deletable(
    status: ItemStatus,
    child_count: i64,
    task_count: i64,
) -> Result<(), CoreError> {
    if status != ItemStatus::Opening {
        return Err(CoreError::Validation(format!(
            "Only opening items can be deleted, item is {status}"
        )));
    }
    if child_count > 0 {
        return Err(CoreError::Validation(
            "Item still has child items".into(),
        ));
    }
    if task_count > 0 {
        return Err(CoreError::Validation("Item still has tasks".into()));
    }
    Ok(())
}

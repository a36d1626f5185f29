//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the requests that create or patch it
//!
//! Status columns are TEXT and decode straight into the `koi_core::status`
//! enums via `#[sqlx(try_from = "String")]`.

pub mod construction;
pub mod contract;
pub mod deferred_job;
pub mod doc;
pub mod payment;
pub mod project;
pub mod promotion;
pub mod quotation;
pub mod user;

//! HTTP request handlers, one module per resource.
//!
//! Handlers extract and authorize the caller, validate the body, and call a
//! repository or a [`crate::services`] function. Every success body uses the
//! [`crate::response::DataResponse`] envelope.

pub mod auth;
pub mod construction;
pub mod contract;
pub mod doc;
pub mod payment;
pub mod project;
pub mod promotion;
pub mod quotation;
pub mod staff;

//! Multi-step business operations shared by handlers and background jobs.
//!
//! Handlers stay thin: they extract and authorize the caller, then call into
//! a service. Services own the transactions and row locks that keep status
//! transitions consistent under concurrent requests.

pub mod access;
pub mod confirmation;
pub mod construction;
pub mod contract;
pub mod payment;
pub mod project;
pub mod promotion;
pub mod quotation;

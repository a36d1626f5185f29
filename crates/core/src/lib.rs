//! Domain rules for the koi pond works platform.
//!
//! Everything in this crate is free of database and HTTP concerns so the
//! same rules back the API handlers, the background job runner and tests.

pub mod construction;
pub mod deferred;
pub mod error;
pub mod otp;
pub mod payment;
pub mod promotion;
pub mod roles;
pub mod status;
pub mod types;
pub mod vnpay;
pub mod workflow;

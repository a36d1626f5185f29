//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `ADMINISTRATOR` role.
//! - [`rbac::RequireManager`] -- Requires `MANAGER` or `ADMINISTRATOR`.
//! - [`rbac::RequireConsultant`] -- Requires `CONSULTANT`, `MANAGER` or `ADMINISTRATOR`.
//! - [`rbac::RequireStaff`] -- Requires any staff position or `ADMINISTRATOR`.
//! - [`rbac::RequireCustomer`] -- Requires the `CUSTOMER` role.

pub mod auth;
pub mod rbac;

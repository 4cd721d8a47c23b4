//! Request extractors for the portal API.
//!
//! - [`admin`] - `X-Admin-Password` credential check
//! - [`extract`] - JSON body and path extractors with uniform error bodies

pub mod admin;
pub mod extract;

pub use admin::{ADMIN_PASSWORD_HEADER, AdminCredential};
pub use extract::{ApiJson, ApiPath};

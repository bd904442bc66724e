//! Users, roles and competition eligibility.

pub mod models;

pub use models::{Role, User, UserId};

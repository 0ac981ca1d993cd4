//! Application services and the repository seams they depend on.

pub mod error;
pub mod pagination;
pub mod repos;
pub mod users;

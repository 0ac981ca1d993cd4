//! Roster: a user-directory service with templated SQL and a cache-aside read path.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod query;

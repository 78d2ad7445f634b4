//! Articles service: JWT-authenticated article CRUD over Postgres with a
//! read-through cache in front of the read paths.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;

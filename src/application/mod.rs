//! Application services: articles, accounts, and the shared repository seams.

pub mod articles;
pub mod auth;
pub mod error;
pub mod pagination;
pub mod repos;

//! Hotel recommendations from historical stay spend.
//!
//! Stay records are aggregated into a user × hotel spend matrix, users are
//! compared by cosine similarity, and each query blends a user's own top hotels
//! with hotels favored by their nearest neighbors.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

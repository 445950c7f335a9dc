//! Meal recommendations under allergen and BMI constraints.
//!
//! The core (`services`) is synchronous and side-effect free; `api` is a thin
//! axum layer over an in-memory store.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

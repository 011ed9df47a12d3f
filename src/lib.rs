// src/lib.rs

pub mod app_state;
pub mod auth;
pub mod board;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;
pub mod task;
pub mod user_management;
pub mod validation;

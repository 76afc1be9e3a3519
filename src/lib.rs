// src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod graph;
pub mod handlers;
pub mod metadata;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use common::error::AppError;
pub use config::{AppState, Settings};

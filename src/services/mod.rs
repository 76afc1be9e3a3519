// src/services/mod.rs

pub mod auth;
pub mod client_service;
pub mod history_service;
pub mod resource_service;

pub use auth::AuthService;
pub use client_service::ClientService;
pub use history_service::HistoryService;
pub use resource_service::ResourceService;

// src/handlers/mod.rs

pub mod frontend;
pub mod history;
pub mod resources;

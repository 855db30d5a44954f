// src/services/mod.rs
pub mod access_service;
pub mod auth_service;
pub mod catalog_service;
pub mod syllabus_service;
pub mod user_service;

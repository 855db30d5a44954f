// src/web/mod.rs
pub mod auth_handlers;
pub mod course_handlers;
pub mod extract;
pub mod routes;
pub mod session;
pub mod syllabus_handlers;
pub mod user_handlers;

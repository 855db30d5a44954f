// src/models/mod.rs
pub mod course;
pub mod role;
pub mod syllabus;
pub mod user;

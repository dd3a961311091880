pub mod auth;
pub mod common;
pub mod courses;
pub mod favorites;
pub mod organizations;
pub mod teachers;
pub mod users;

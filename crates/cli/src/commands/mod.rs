pub mod auth;
pub mod resource;

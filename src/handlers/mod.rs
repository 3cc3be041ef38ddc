//! HTTP handlers

pub mod health;
pub mod auth;
pub mod catalog;
pub mod admin_plants;
pub mod admin_images;
pub mod admin_categories;

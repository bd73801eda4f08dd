// src/middleware.rs

pub mod auth;
pub mod ferme;
pub mod i18n;
pub mod rbac;

// src/services.rs

pub mod auth;
pub mod catalog_service;
pub mod dashboard_service;
pub mod ferme_service;
pub mod import_service;
pub mod occupancy_service;
pub mod room_service;
pub mod stock_service;
pub mod supervisor_service;
pub mod sync;
pub mod transfer_service;
pub mod worker_service;

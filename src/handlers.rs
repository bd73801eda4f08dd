// src/handlers.rs

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod fermes;
pub mod health;
pub mod rooms;
pub mod stock;
pub mod supervisors;
pub mod transfers;
pub mod workers;

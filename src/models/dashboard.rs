// src/models/dashboard.rs

use serde::Serialize;

// The stat cards at the top of the admin screens
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub active_workers: usize,
    pub hommes: usize,
    pub femmes: usize,
    pub rooms: usize,
    pub total_capacity: u32,
    pub occupied_places: u32,
    pub occupancy_rate: f64, // occupied / capacity, 0.0 when there is no capacity
    pub active_supervisors: usize,
    pub pending_transfers: usize,
    pub low_stock_articles: usize,
}

// src/models/import.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Spreadsheet as sent by the client: first row split out as headers.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportWorkersPayload {
    #[serde(default)]
    pub headers: Vec<String>,
    #[validate(length(min = 1, message = "required"))]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    // 1-based line number in the spreadsheet
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
    pub column_mapping: BTreeMap<String, usize>,
    pub matched_by_position: bool,
    pub dry_run: bool,
}

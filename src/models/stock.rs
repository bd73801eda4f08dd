// src/models/stock.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::Document;

// Catalogue entry (`article_names`), managed by superadmins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleName {
    pub id: String,
    pub nom: String,
    #[serde(default)]
    pub unite: Option<String>,
}

impl Document for ArticleName {
    const COLLECTION: &'static str = "article_names";

    fn id(&self) -> &str {
        &self.id
    }
}

// Stock line of one farm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockArticle {
    pub id: String,
    pub nom: String,
    pub ferme_id: String,
    pub quantite: Decimal,
    #[serde(default)]
    pub unite: Option<String>,
    #[serde(default)]
    pub seuil_alerte: Option<Decimal>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockArticle {
    pub fn is_low(&self) -> bool {
        self.seuil_alerte.is_some_and(|seuil| self.quantite <= seuil)
    }
}

impl Document for StockArticle {
    const COLLECTION: &'static str = "stock_articles";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockMovementKind {
    Entree,
    Sortie,
}

// History line written together with every stock change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub article_id: String,
    pub ferme_id: String,
    #[serde(rename = "type")]
    pub kind: StockMovementKind,
    pub quantite: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    pub par: String,
    pub created_at: DateTime<Utc>,
}

impl Document for StockMovement {
    const COLLECTION: &'static str = "stock_movements";

    fn id(&self) -> &str {
        &self.id
    }
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("not_negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("positive".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct ArticleNamePayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: String,
    pub unite: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockArticlePayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: String,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub quantite: Decimal,
    pub unite: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub seuil_alerte: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StockMovementPayload {
    #[serde(rename = "type")]
    pub kind: StockMovementKind,
    #[validate(custom(function = "validate_positive"))]
    pub quantite: Decimal,
    pub note: Option<String>,
}

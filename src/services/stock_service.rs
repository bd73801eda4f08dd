// src/services/stock_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{Document, DocumentStore, Repository, WriteBatch},
    middleware::ferme::FermeScope,
    models::{
        new_id,
        stock::{CreateStockArticlePayload, StockArticle, StockMovement, StockMovementKind, StockMovementPayload},
    },
};

/// Quantity after applying a movement; `None` when it would go below zero.
pub fn apply_movement(current: Decimal, kind: StockMovementKind, quantite: Decimal) -> Option<Decimal> {
    let next = match kind {
        StockMovementKind::Entree => current + quantite,
        StockMovementKind::Sortie => current - quantite,
    };
    (next >= Decimal::ZERO).then_some(next)
}

#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn DocumentStore>,
    articles: Repository<StockArticle>,
    movements: Repository<StockMovement>,
}

impl StockService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            articles: Repository::new(store.clone()),
            movements: Repository::new(store.clone()),
            store,
        }
    }

    pub async fn list(&self, scope: &FermeScope) -> Result<Vec<StockArticle>, AppError> {
        let mut articles = self.articles.list_where(|a| scope.includes(&a.ferme_id)).await?;
        articles.sort_by(|a, b| a.nom.cmp(&b.nom));
        Ok(articles)
    }

    pub async fn low_stock(&self, scope: &FermeScope) -> Result<Vec<StockArticle>, AppError> {
        Ok(self.list(scope).await?.into_iter().filter(StockArticle::is_low).collect())
    }

    async fn get(&self, scope: &FermeScope, id: &str) -> Result<StockArticle, AppError> {
        let article = self.articles.get(id).await?;
        if !scope.includes(&article.ferme_id) {
            return Err(AppError::NotFound {
                collection: StockArticle::COLLECTION.to_string(),
                id: id.to_string(),
            });
        }
        Ok(article)
    }

    pub async fn create(&self, ferme_id: &str, user_id: &str, payload: CreateStockArticlePayload) -> Result<StockArticle, AppError> {
        let now = Utc::now();
        let article = StockArticle {
            id: new_id(),
            nom: payload.nom.trim().to_string(),
            ferme_id: ferme_id.to_string(),
            quantite: payload.quantite,
            unite: payload.unite,
            seuil_alerte: payload.seuil_alerte,
            updated_at: Some(now),
        };

        let mut batch = WriteBatch::new();
        batch.set(&article)?;
        if article.quantite > Decimal::ZERO {
            // Opening stock is recorded like any other entry
            batch.set(&StockMovement {
                id: new_id(),
                article_id: article.id.clone(),
                ferme_id: ferme_id.to_string(),
                kind: StockMovementKind::Entree,
                quantite: article.quantite,
                note: Some("Stock initial".to_string()),
                par: user_id.to_string(),
                created_at: now,
            })?;
        }
        self.store.commit(batch).await?;

        tracing::info!(article_id = %article.id, ferme_id, quantite = %article.quantite, "📦 Stock article created");
        Ok(article)
    }

    /// Applies an entry or a withdrawal and records it, in one batch.
    pub async fn record_movement(
        &self,
        scope: &FermeScope,
        article_id: &str,
        user_id: &str,
        payload: StockMovementPayload,
    ) -> Result<StockArticle, AppError> {
        let mut article = self.get(scope, article_id).await?;

        let Some(next) = apply_movement(article.quantite, payload.kind, payload.quantite) else {
            tracing::debug!(article_id, stock = %article.quantite, requested = %payload.quantite, "Withdrawal refused");
            return Err(AppError::InsufficientStock);
        };

        let now = Utc::now();
        article.quantite = next;
        article.updated_at = Some(now);

        let movement = StockMovement {
            id: new_id(),
            article_id: article.id.clone(),
            ferme_id: article.ferme_id.clone(),
            kind: payload.kind,
            quantite: payload.quantite,
            note: payload.note,
            par: user_id.to_string(),
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.set(&article)?.set(&movement)?;
        self.store.commit(batch).await?;

        if article.is_low() {
            tracing::warn!(article_id, quantite = %article.quantite, "Stock below alert threshold");
        }
        Ok(article)
    }

    pub async fn movements(&self, scope: &FermeScope, article_id: &str) -> Result<Vec<StockMovement>, AppError> {
        self.get(scope, article_id).await?;
        let mut movements = self.movements.list_where(|m| m.article_id == article_id).await?;
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(movements)
    }

    pub async fn delete(&self, scope: &FermeScope, id: &str) -> Result<(), AppError> {
        self.get(scope, id).await?;
        let history = self.movements.list_where(|m| m.article_id == id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(StockArticle::COLLECTION, id);
        for movement in &history {
            batch.delete(StockMovement::COLLECTION, &movement.id);
        }
        self.store.commit(batch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use rust_decimal::prelude::FromPrimitive;

    fn dec(v: f64) -> Decimal {
        Decimal::from_f64(v).unwrap()
    }

    fn scope() -> FermeScope {
        FermeScope::Ferme("F".into())
    }

    async fn engrais(service: &StockService) -> StockArticle {
        service
            .create(
                "F",
                "u1",
                CreateStockArticlePayload {
                    nom: "Engrais".into(),
                    quantite: dec(10.0),
                    unite: Some("sac".into()),
                    seuil_alerte: Some(dec(3.0)),
                },
            )
            .await
            .unwrap()
    }

    #[test]
    fn movement_arithmetic() {
        assert_eq!(apply_movement(dec(2.5), StockMovementKind::Entree, dec(1.5)), Some(dec(4.0)));
        assert_eq!(apply_movement(dec(2.5), StockMovementKind::Sortie, dec(2.5)), Some(Decimal::ZERO));
        assert_eq!(apply_movement(dec(2.5), StockMovementKind::Sortie, dec(3.0)), None);
    }

    #[tokio::test]
    async fn withdrawal_cannot_go_negative() {
        let service = StockService::new(Arc::new(MemoryDocumentStore::new()));
        let article = engrais(&service).await;

        let err = service
            .record_movement(&scope(), &article.id, "u1", StockMovementPayload { kind: StockMovementKind::Sortie, quantite: dec(11.0), note: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock));

        let after = service
            .record_movement(&scope(), &article.id, "u1", StockMovementPayload { kind: StockMovementKind::Sortie, quantite: dec(8.0), note: None })
            .await
            .unwrap();
        assert_eq!(after.quantite, dec(2.0));
        assert!(after.is_low());
        assert_eq!(service.low_stock(&scope()).await.unwrap().len(), 1);

        // Opening entry plus the accepted withdrawal
        assert_eq!(service.movements(&scope(), &article.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn articles_of_other_farms_are_hidden() {
        let service = StockService::new(Arc::new(MemoryDocumentStore::new()));
        let article = engrais(&service).await;

        let other = FermeScope::Ferme("G".into());
        assert!(service.list(&other).await.unwrap().is_empty());
        assert!(matches!(service.movements(&other, &article.id).await, Err(AppError::NotFound { .. })));

        service.delete(&scope(), &article.id).await.unwrap();
        assert!(service.list(&FermeScope::All).await.unwrap().is_empty());
    }
}

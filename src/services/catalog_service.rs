// src/services/catalog_service.rs
// Global lists maintained by superadmins: exit reasons and stock article names.

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{DocumentStore, Repository},
    models::{
        motif::{Motif, MotifPayload},
        new_id,
        stock::{ArticleName, ArticleNamePayload},
    },
};

#[derive(Clone)]
pub struct CatalogService {
    motifs: Repository<Motif>,
    article_names: Repository<ArticleName>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            motifs: Repository::new(store.clone()),
            article_names: Repository::new(store),
        }
    }

    // --- Motifs ---

    pub async fn list_motifs(&self) -> Result<Vec<Motif>, AppError> {
        let mut motifs = self.motifs.list().await?;
        motifs.sort_by(|a, b| a.libelle.cmp(&b.libelle));
        Ok(motifs)
    }

    pub async fn create_motif(&self, payload: MotifPayload) -> Result<Motif, AppError> {
        let motif = Motif { id: new_id(), libelle: payload.libelle.trim().to_string() };
        self.motifs.save(&motif).await?;
        Ok(motif)
    }

    pub async fn update_motif(&self, id: &str, payload: MotifPayload) -> Result<Motif, AppError> {
        let mut motif = self.motifs.get(id).await?;
        motif.libelle = payload.libelle.trim().to_string();
        self.motifs.save(&motif).await?;
        Ok(motif)
    }

    pub async fn delete_motif(&self, id: &str) -> Result<(), AppError> {
        self.motifs.get(id).await?;
        Ok(self.motifs.delete(id).await?)
    }

    // --- Article names ---

    pub async fn list_article_names(&self) -> Result<Vec<ArticleName>, AppError> {
        let mut names = self.article_names.list().await?;
        names.sort_by(|a, b| a.nom.cmp(&b.nom));
        Ok(names)
    }

    pub async fn create_article_name(&self, payload: ArticleNamePayload) -> Result<ArticleName, AppError> {
        let name = ArticleName {
            id: new_id(),
            nom: payload.nom.trim().to_string(),
            unite: payload.unite,
        };
        self.article_names.save(&name).await?;
        Ok(name)
    }

    pub async fn update_article_name(&self, id: &str, payload: ArticleNamePayload) -> Result<ArticleName, AppError> {
        let mut name = self.article_names.get(id).await?;
        name.nom = payload.nom.trim().to_string();
        name.unite = payload.unite;
        self.article_names.save(&name).await?;
        Ok(name)
    }

    pub async fn delete_article_name(&self, id: &str) -> Result<(), AppError> {
        self.article_names.get(id).await?;
        Ok(self.article_names.delete(id).await?)
    }
}

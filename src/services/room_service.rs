// src/services/room_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::{Document, DocumentStore, Repository},
    middleware::ferme::FermeScope,
    models::{
        new_id,
        room::{CreateRoomPayload, Room, UpdateRoomPayload},
    },
    services::occupancy_service::{room_key, OccupancyService},
};

#[derive(Clone)]
pub struct RoomService {
    rooms: Repository<Room>,
    occupancy: OccupancyService,
}

impl RoomService {
    pub fn new(store: Arc<dyn DocumentStore>, occupancy: OccupancyService) -> Self {
        Self {
            rooms: Repository::new(store),
            occupancy,
        }
    }

    pub async fn list(&self, scope: &FermeScope) -> Result<Vec<Room>, AppError> {
        let mut rooms = self.rooms.list_where(|r| scope.includes(&r.ferme_id)).await?;
        rooms.sort_by(|a, b| (&a.ferme_id, &a.numero).cmp(&(&b.ferme_id, &b.numero)));
        Ok(rooms)
    }

    pub async fn get(&self, scope: &FermeScope, id: &str) -> Result<Room, AppError> {
        let room = self.rooms.get(id).await?;
        if !scope.includes(&room.ferme_id) {
            return Err(AppError::NotFound {
                collection: Room::COLLECTION.to_string(),
                id: id.to_string(),
            });
        }
        Ok(room)
    }

    async fn ensure_unique_numero(&self, ferme_id: &str, numero: &str, except: Option<&str>) -> Result<(), AppError> {
        let key = room_key(ferme_id, numero);
        let clash = self
            .rooms
            .list_where(|r| room_key(&r.ferme_id, &r.numero) == key && Some(r.id.as_str()) != except)
            .await?;
        if clash.is_empty() {
            Ok(())
        } else {
            Err(AppError::RoomAlreadyExists(numero.to_string()))
        }
    }

    pub async fn create(&self, ferme_id: &str, payload: CreateRoomPayload) -> Result<Room, AppError> {
        let numero = payload.numero.trim().to_string();
        self.ensure_unique_numero(ferme_id, &numero, None).await?;

        let room = Room {
            id: new_id(),
            numero,
            ferme_id: ferme_id.to_string(),
            genre: payload.genre,
            capacite: payload.capacite,
            occupants_actuels: 0,
            liste_occupants: Vec::new(),
            updated_at: Some(Utc::now()),
        };
        self.rooms.save(&room).await?;
        tracing::info!(room_id = %room.id, ferme_id, numero = %room.numero, "🛏️ Room created");

        // Workers may already carry this room number
        self.resync(&room.id).await;
        self.rooms.get(&room.id).await.map_err(AppError::from)
    }

    pub async fn update(&self, scope: &FermeScope, id: &str, payload: UpdateRoomPayload) -> Result<Room, AppError> {
        let mut room = self.get(scope, id).await?;

        if let Some(numero) = payload.numero {
            let numero = numero.trim().to_string();
            self.ensure_unique_numero(&room.ferme_id, &numero, Some(id)).await?;
            room.numero = numero;
        }
        if let Some(genre) = payload.genre {
            room.genre = genre;
        }
        if let Some(capacite) = payload.capacite {
            room.capacite = capacite;
        }
        room.updated_at = Some(Utc::now());
        self.rooms.save(&room).await?;

        self.resync(id).await;
        self.rooms.get(id).await.map_err(AppError::from)
    }

    pub async fn delete(&self, scope: &FermeScope, id: &str) -> Result<(), AppError> {
        self.get(scope, id).await?;
        self.rooms.delete(id).await?;
        tracing::info!(room_id = %id, "Room deleted");
        Ok(())
    }

    async fn resync(&self, id: &str) {
        if let Err(e) = self.occupancy.reconcile_room(id).await {
            tracing::warn!(room_id = %id, error = %e, "Room resync failed");
        }
    }
}

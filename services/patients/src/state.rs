use sea_orm::DatabaseConnection;

use crate::infra::db::{DbOutboxRepository, DbPatientRepository};
use crate::infra::storage::LocalPhotoStorage;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub photos: LocalPhotoStorage,
}

impl AppState {
    pub fn patient_repo(&self) -> DbPatientRepository {
        DbPatientRepository {
            db: self.db.clone(),
        }
    }

    pub fn outbox_repo(&self) -> DbOutboxRepository {
        DbOutboxRepository {
            db: self.db.clone(),
        }
    }
}

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::warn;

use clinic_core::sea_ext::DbErrExt as _;
use clinic_domain::id::OutboxEntryId;
use clinic_domain::outbox::{OutboxChannel, OutboxStatus, UnknownVariant};
use clinic_patients_schema::{outbox, patients};

use crate::domain::repository::{OutboxRepository, PatientRepository};
use crate::domain::types::{OutboxEntry, Patient};
use crate::error::PatientsServiceError;

// ── Patient repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbPatientRepository {
    pub db: DatabaseConnection,
}

impl PatientRepository for DbPatientRepository {
    async fn create_with_outbox(
        &self,
        patient: &Patient,
        entry: &OutboxEntry,
    ) -> Result<(), PatientsServiceError> {
        let patient_row = patients::ActiveModel {
            id: Set(patient.id.0),
            full_name: Set(patient.full_name.clone()),
            email: Set(patient.email.clone()),
            phone_country_code: Set(patient.phone_country_code.clone()),
            phone_number: Set(patient.phone_number.clone()),
            document_photo_path: Set(patient.document_photo_path.clone()),
            created_at: Set(patient.created_at),
            updated_at: Set(patient.updated_at),
        };
        let outbox_row = outbox::ActiveModel {
            id: Set(entry.id.0),
            patient_id: Set(entry.patient_id.0),
            channel: Set(entry.channel.as_str().to_owned()),
            to: Set(entry.to.clone()),
            subject: Set(entry.subject.clone()),
            body: Set(entry.body.clone()),
            status: Set(entry.status.as_str().to_owned()),
            error: Set(entry.error.clone()),
            sent_at: Set(entry.sent_at),
            created_at: Set(entry.created_at),
        };

        self.db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    patient_row.insert(txn).await?;
                    outbox_row.insert(txn).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    PatientsServiceError::DuplicateEmail
                } else {
                    PatientsServiceError::Internal(
                        anyhow::Error::new(e).context("create patient with outbox entry"),
                    )
                }
            })
    }

    async fn list_newest_first(&self) -> Result<Vec<Patient>, PatientsServiceError> {
        let models = patients::Entity::find()
            .order_by_desc(patients::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list patients")?;
        Ok(models.into_iter().map(patient_from_model).collect())
    }
}

fn patient_from_model(model: patients::Model) -> Patient {
    Patient {
        id: model.id.into(),
        full_name: model.full_name,
        email: model.email,
        phone_country_code: model.phone_country_code,
        phone_number: model.phone_number,
        document_photo_path: model.document_photo_path,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Outbox repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn find_pending(
        &self,
        channels: &[OutboxChannel],
        limit: u64,
    ) -> Result<Vec<OutboxEntry>, PatientsServiceError> {
        let models = outbox::Entity::find()
            .filter(outbox::Column::Status.eq(OutboxStatus::Pending.as_str()))
            .filter(outbox::Column::Channel.is_in(channels.iter().map(|c| c.as_str())))
            .order_by_asc(outbox::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("find pending outbox entries")?;

        Ok(models
            .into_iter()
            .filter_map(|model| {
                let id = model.id;
                match entry_from_model(model) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(outbox_id = %id, error = %e, "skipping unreadable outbox row");
                        None
                    }
                }
            })
            .collect())
    }

    async fn mark_sent(
        &self,
        id: OutboxEntryId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), PatientsServiceError> {
        outbox::ActiveModel {
            id: Set(id.0),
            status: Set(OutboxStatus::Sent.as_str().to_owned()),
            sent_at: Set(Some(sent_at)),
            error: Set(None),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("mark outbox entry sent")?;
        Ok(())
    }

    async fn mark_failed(&self, id: OutboxEntryId, error: &str) -> Result<(), PatientsServiceError> {
        outbox::ActiveModel {
            id: Set(id.0),
            status: Set(OutboxStatus::Failed.as_str().to_owned()),
            error: Set(Some(error.to_owned())),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("mark outbox entry failed")?;
        Ok(())
    }
}

fn entry_from_model(model: outbox::Model) -> Result<OutboxEntry, UnknownVariant> {
    Ok(OutboxEntry {
        id: model.id.into(),
        patient_id: model.patient_id.into(),
        channel: model.channel.parse()?,
        to: model.to,
        subject: model.subject,
        body: model.body,
        status: model.status.parse()?,
        error: model.error,
        sent_at: model.sent_at,
        created_at: model.created_at,
    })
}

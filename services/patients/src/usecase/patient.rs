use chrono::Utc;
use clinic_domain::id::PatientId;
use clinic_domain::outbox::OutboxChannel;
use clinic_domain::patient::{ConfirmationEmail, normalize_email};
use tracing::info;

use crate::domain::repository::PatientRepository;
use crate::domain::types::{OutboxEntry, Patient};
use crate::error::PatientsServiceError;

// ── CreatePatient ────────────────────────────────────────────────────────────

/// Registration fields that already passed validation.
pub struct CreatePatientInput {
    pub full_name: String,
    pub email: String,
    pub phone_country_code: String,
    pub phone_number: String,
}

pub struct CreatePatientUseCase<R: PatientRepository> {
    pub repo: R,
}

impl<R: PatientRepository> CreatePatientUseCase<R> {
    /// Persist the patient and queue its confirmation email atomically.
    ///
    /// The caller owns the stored photo at `document_photo_path` and must
    /// remove it when this fails.
    pub async fn execute(
        &self,
        input: CreatePatientInput,
        document_photo_path: String,
    ) -> Result<Patient, PatientsServiceError> {
        let now = Utc::now();
        let patient = Patient {
            id: PatientId::generate(),
            full_name: input.full_name.trim().to_owned(),
            email: normalize_email(&input.email),
            phone_country_code: input.phone_country_code.trim().to_owned(),
            phone_number: input.phone_number.trim().to_owned(),
            document_photo_path,
            created_at: now,
            updated_at: now,
        };

        let confirmation = ConfirmationEmail::for_patient(&patient.full_name);
        let entry = OutboxEntry::pending(
            patient.id,
            OutboxChannel::Email,
            patient.email.clone(),
            Some(confirmation.subject.to_owned()),
            confirmation.body,
            now,
        );

        self.repo.create_with_outbox(&patient, &entry).await?;
        info!(
            patient_id = %patient.id,
            outbox_id = %entry.id,
            "patient registered, confirmation queued"
        );
        Ok(patient)
    }
}

// ── ListPatients ─────────────────────────────────────────────────────────────

pub struct ListPatientsUseCase<R: PatientRepository> {
    pub repo: R,
}

impl<R: PatientRepository> ListPatientsUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<Patient>, PatientsServiceError> {
        self.repo.list_newest_first().await
    }
}

use std::path::Path;

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::{Json, extract::State, http::StatusCode};
use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

use clinic_domain::patient::RegistrationFields;

use crate::domain::types::{MAX_DOCUMENT_PHOTO_BYTES, Patient};
use crate::error::PatientsServiceError;
use crate::infra::storage::document_photo_url;
use crate::state::AppState;
use crate::usecase::patient::{CreatePatientInput, CreatePatientUseCase, ListPatientsUseCase};

const PHOTO_REQUIRED: &str = "Document photo is required and must be a .jpg image";
const PHOTO_TOO_LARGE: &str = "Document photo must be 5 MB or smaller";

/// `{"data": ...}` envelope used by every successful response.
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: PhoneResponse,
    pub document_photo_url: String,
    #[serde(serialize_with = "clinic_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "clinic_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneResponse {
    pub country_code: String,
    pub number: String,
}

impl From<Patient> for PatientResponse {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id.to_string(),
            document_photo_url: document_photo_url(&patient.document_photo_path),
            full_name: patient.full_name,
            email: patient.email,
            phone: PhoneResponse {
                country_code: patient.phone_country_code,
                number: patient.phone_number,
            },
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

// ── GET /patients ────────────────────────────────────────────────────────────

pub async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<PatientResponse>>>, PatientsServiceError> {
    let usecase = ListPatientsUseCase {
        repo: state.patient_repo(),
    };
    let patients = usecase.execute().await?;
    Ok(Json(DataResponse {
        data: patients.into_iter().map(PatientResponse::from).collect(),
    }))
}

// ── POST /patients ───────────────────────────────────────────────────────────

struct UploadedPhoto {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

#[derive(Default)]
struct RegistrationForm {
    full_name: String,
    email: String,
    phone_country_code: String,
    phone_number: String,
    document_photo: Option<UploadedPhoto>,
}

impl RegistrationForm {
    async fn read(mut multipart: Multipart) -> Result<Self, PatientsServiceError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(from_multipart)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "documentPhoto" => {
                    let file_name = field.file_name().map(str::to_owned);
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await.map_err(from_multipart)?;
                    form.document_photo = Some(UploadedPhoto {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                "fullName" => form.full_name = field.text().await.map_err(from_multipart)?,
                "email" => form.email = field.text().await.map_err(from_multipart)?,
                "phoneCountryCode" => {
                    form.phone_country_code = field.text().await.map_err(from_multipart)?
                }
                "phoneNumber" => form.phone_number = field.text().await.map_err(from_multipart)?,
                _ => {}
            }
        }
        Ok(form)
    }

    fn fields(&self) -> RegistrationFields<'_> {
        RegistrationFields {
            full_name: &self.full_name,
            email: &self.email,
            phone_country_code: &self.phone_country_code,
            phone_number: &self.phone_number,
        }
    }
}

fn from_multipart(e: MultipartError) -> PatientsServiceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PatientsServiceError::InvalidDocumentPhoto(PHOTO_TOO_LARGE)
    } else {
        warn!(error = %e.body_text(), "malformed multipart body");
        PatientsServiceError::MalformedForm
    }
}

/// A `.jpg` file with a jpeg content type, non-empty and within the size cap.
fn check_document_photo(photo: &UploadedPhoto) -> Result<(), &'static str> {
    let is_jpg = photo
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
    let is_jpeg = photo
        .content_type
        .as_deref()
        .is_some_and(|mime| mime.to_ascii_lowercase().contains("jpeg"));
    if !is_jpg || !is_jpeg || photo.bytes.is_empty() {
        return Err(PHOTO_REQUIRED);
    }
    if photo.bytes.len() > MAX_DOCUMENT_PHOTO_BYTES {
        return Err(PHOTO_TOO_LARGE);
    }
    Ok(())
}

pub async fn create_patient(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<DataResponse<PatientResponse>>), PatientsServiceError> {
    let multipart = multipart.map_err(|e| {
        warn!(error = %e, "rejected non-multipart registration request");
        PatientsServiceError::MalformedForm
    })?;
    let form = RegistrationForm::read(multipart).await?;

    let photo = form
        .document_photo
        .as_ref()
        .ok_or(PatientsServiceError::InvalidDocumentPhoto(PHOTO_REQUIRED))?;
    check_document_photo(photo).map_err(PatientsServiceError::InvalidDocumentPhoto)?;
    form.fields()
        .validate()
        .map_err(PatientsServiceError::InvalidFields)?;

    let photo_path = state.photos.store_document(&photo.bytes).await?;

    let usecase = CreatePatientUseCase {
        repo: state.patient_repo(),
    };
    let input = CreatePatientInput {
        full_name: form.full_name,
        email: form.email,
        phone_country_code: form.phone_country_code,
        phone_number: form.phone_number,
    };
    match usecase.execute(input, photo_path.clone()).await {
        Ok(patient) => Ok((
            StatusCode::CREATED,
            Json(DataResponse {
                data: PatientResponse::from(patient),
            }),
        )),
        Err(e) => {
            state.photos.remove(&photo_path).await;
            Err(e)
        }
    }
}

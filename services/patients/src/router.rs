use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use clinic_core::health::healthz;
use clinic_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::domain::types::MAX_DOCUMENT_PHOTO_BYTES;
use crate::handlers::{
    health::readyz,
    patient::{create_patient, list_patients},
};
use crate::state::AppState;

/// Headroom for the text fields and multipart framing around the photo.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.photos.root());

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Patients
        .route(
            "/patients",
            get(list_patients)
                .post(create_patient)
                .layer(DefaultBodyLimit::max(
                    MAX_DOCUMENT_PHOTO_BYTES + FORM_OVERHEAD_BYTES,
                )),
        )
        // Stored document photos
        .nest_service("/uploads", uploads)
        .with_state(state)
        // CORS sits inside the trace span: `Cors` needs a `Default` response
        // body, which the trace layer's body wrapper is not.
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(CorsLayer::permissive()),
        )
}

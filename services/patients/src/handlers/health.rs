use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    clinic_core::health::readyz(&state.db).await
}

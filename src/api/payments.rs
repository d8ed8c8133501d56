//! Hosted checkout routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::{ApiResult, AppJson, AppQuery, AppState};
use crate::domain::aggregates::Receipt;
use crate::domain::value_objects::UserId;
use crate::services::payments::HostedSession;
use crate::services::HostedCheckoutService;
use crate::storage::Record;
use crate::StorefrontError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pagos/sesion", post(start_session))
        .route("/pagos/confirmar", get(confirm_session))
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    #[serde(rename = "id_usuario")]
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
    pub session_id: String,
}

fn checkout(s: &AppState) -> Result<&HostedCheckoutService, StorefrontError> {
    s.checkout.as_ref().ok_or(StorefrontError::PaymentsUnavailable)
}

async fn start_session(State(s): State<AppState>, AppJson(r): AppJson<StartSessionRequest>) -> ApiResult<Json<HostedSession>> {
    Ok(Json(checkout(&s)?.start(&r.user_id).await?))
}

async fn confirm_session(State(s): State<AppState>, AppQuery(p): AppQuery<ConfirmParams>) -> ApiResult<Json<Record<Receipt>>> {
    Ok(Json(checkout(&s)?.confirm(&p.session_id).await?))
}

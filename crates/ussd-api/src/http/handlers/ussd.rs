//! Gateway endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use ussd_types::ussd::{UssdReply, UssdRequest};

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /ussd - Process one gateway keystroke.
///
/// Malformed or incomplete requests are rejected with 400 before the engine
/// runs. Every valid request gets a `{message, continuation}` reply, including
/// failures, which end the session with a generic message.
pub async fn handle_ussd(
    State(state): State<AppState>,
    payload: Result<Json<UssdRequest>, JsonRejection>,
) -> Result<Json<UssdReply>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reply = state.engine.handle(&request).await;
    Ok(Json(reply))
}

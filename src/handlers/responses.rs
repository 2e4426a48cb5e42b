// src/handlers/responses.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::response::SubmitResponseRequest,
    store::Store,
    submission::{self, SubmitOutcome},
    utils::jwt::Claims,
};

/// Submits a respondent's answers to a published form.
///
/// * 201 with the freshly computed score on first submission.
/// * 409 with the original response if this respondent already submitted —
///   an idempotent read of prior state, embedded so the caller need not
///   re-fetch; the answers sent with the losing call are discarded.
pub async fn submit_response(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(form_id): Path<String>,
    Json(payload): Json<SubmitResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let respondent = claims.respondent();

    let outcome = submission::submit(&*store, &form_id, &respondent, payload.answers).await?;

    match outcome {
        SubmitOutcome::Created(response) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "status": "created",
                "responseId": response.id,
                "score": response.score,
                "submittedAt": response.submitted_at,
            })),
        )),
        SubmitOutcome::AlreadySubmitted(response) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "status": "already_submitted",
                "responseId": response.id,
                "score": response.score,
                "answers": response.answers,
                "submittedAt": response.submitted_at,
            })),
        )),
    }
}

/// Returns the caller's own response for a form, used on page load to decide
/// between the draft flow and the read-only result view.
pub async fn get_my_response(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(form_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let respondent = claims.respondent();

    let response = submission::get_for_respondent(&*store, &form_id, &respondent)
        .await?
        .ok_or(AppError::NotFound("No response submitted".to_string()))?;

    Ok(Json(response))
}

/// Lists all responses for a form, newest first. Owner only for owned forms.
pub async fn list_responses(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(form_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let form = store
        .get_form(&form_id)
        .await?
        .ok_or(AppError::NotFound("Form not found".to_string()))?;

    if !form.is_owned_by(Some(claims.sub.as_str())) {
        return Err(AppError::Forbidden(
            "Only the form owner may view responses".to_string(),
        ));
    }

    let responses = store.list_responses(&form.id).await?;

    Ok(Json(responses))
}

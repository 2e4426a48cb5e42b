// src/handlers/forms.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::form::{CreateFormRequest, Form, NewForm, UpdateFormRequest},
    store::Store,
    utils::jwt::OptionalClaims,
};

/// Lists all forms, newest first.
pub async fn list_forms(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    let forms = store.list_forms().await?;
    Ok(Json(forms))
}

/// Fetches a single form by id.
pub async fn get_form(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let form = store
        .get_form(&id)
        .await?
        .ok_or(AppError::NotFound("Form not found".to_string()))?;

    Ok(Json(form))
}

/// Creates a form in draft state. The caller's identity (when present)
/// becomes the owner; anonymous forms have no owner and stay open.
pub async fn create_form(
    State(store): State<Arc<dyn Store>>,
    Extension(OptionalClaims(claims)): Extension<OptionalClaims>,
    Json(payload): Json<CreateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let form = store
        .create_form(NewForm {
            title: payload.title,
            description: payload.description,
            header_image: payload.header_image,
            questions: payload.questions,
            is_published: payload.is_published,
            owner_id: claims.map(|c| c.sub),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(form)))
}

/// Partially updates a form; publishing is an update of `isPublished`.
/// Only the owner may mutate an owned form. Respondents never mutate forms.
pub async fn update_form(
    State(store): State<Arc<dyn Store>>,
    Extension(OptionalClaims(claims)): Extension<OptionalClaims>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let form = load_owned(&*store, &id, claims.as_ref().map(|c| c.sub.as_str())).await?;

    let updated = store
        .update_form(&form.id, payload)
        .await?
        .ok_or(AppError::NotFound("Form not found".to_string()))?;

    Ok(Json(updated))
}

/// Deletes a form and, cascading, its responses. Owner only.
pub async fn delete_form(
    State(store): State<Arc<dyn Store>>,
    Extension(OptionalClaims(claims)): Extension<OptionalClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let form = load_owned(&*store, &id, claims.as_ref().map(|c| c.sub.as_str())).await?;

    store.delete_form(&form.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Loads a form and enforces the ownership rule shared by every mutation.
async fn load_owned(
    store: &dyn Store,
    id: &str,
    identity: Option<&str>,
) -> Result<Form, AppError> {
    let form = store
        .get_form(id)
        .await?
        .ok_or(AppError::NotFound("Form not found".to_string()))?;

    if !form.is_owned_by(identity) {
        return Err(AppError::Forbidden(
            "Only the form owner may modify it".to_string(),
        ));
    }

    Ok(form)
}

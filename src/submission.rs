// src/submission.rs

use std::collections::HashMap;

use crate::models::question::Answer;
use crate::models::response::{FormResponse, NewResponse};
use crate::scoring;
use crate::store::{InsertOutcome, Store, StoreError};

/// The respondent identity established by the identity provider. Carried as
/// request extensions by the auth middleware; the controller never sees an
/// unauthenticated call.
#[derive(Debug, Clone)]
pub struct Respondent {
    pub subject_id: String,
    pub email: Option<String>,
}

/// Result of a submit call. `AlreadySubmitted` is the idempotent outcome,
/// not a failure: it carries the original response and the freshly supplied
/// answers are discarded.
#[derive(Debug)]
pub enum SubmitOutcome {
    Created(FormResponse),
    AlreadySubmitted(FormResponse),
}

/// Terminal submit failures. Transient storage errors are surfaced for the
/// transport-level caller to retry; the controller itself never retries, so
/// nothing can be scored twice.
#[derive(Debug)]
pub enum SubmitError {
    /// The form does not exist.
    FormNotFound,
    /// The form exists but is not published.
    FormUnpublished,
    Store(StoreError),
}

impl From<StoreError> for SubmitError {
    fn from(err: StoreError) -> Self {
        SubmitError::Store(err)
    }
}

/// Scores the answers and records the response, exactly once per
/// (form, respondent).
///
/// The insert is the synchronization point: both sides of a race run the
/// scorer, but only one row is ever persisted and both callers receive it.
pub async fn submit(
    store: &dyn Store,
    form_id: &str,
    respondent: &Respondent,
    answers: HashMap<String, Answer>,
) -> Result<SubmitOutcome, SubmitError> {
    let form = store
        .get_form(form_id)
        .await?
        .ok_or(SubmitError::FormNotFound)?;

    if !form.is_published {
        return Err(SubmitError::FormUnpublished);
    }

    let report = scoring::score(&form.questions, &answers);

    let new_response = NewResponse {
        form_id: form.id,
        respondent_id: respondent.subject_id.clone(),
        respondent_email: respondent.email.clone(),
        answers,
        score: report,
    };

    match store.insert_response_if_absent(new_response).await? {
        InsertOutcome::Created(response) => {
            tracing::info!(
                form_id = %response.form_id,
                percentage = response.score.percentage,
                "response recorded"
            );
            Ok(SubmitOutcome::Created(response))
        }
        InsertOutcome::Existing(response) => {
            tracing::info!(form_id = %response.form_id, "repeat submission, returning prior response");
            Ok(SubmitOutcome::AlreadySubmitted(response))
        }
    }
}

/// Read-only lookup used on form load to pick the draft flow or the
/// read-only result view.
pub async fn get_for_respondent(
    store: &dyn Store,
    form_id: &str,
    respondent: &Respondent,
) -> Result<Option<FormResponse>, StoreError> {
    store.get_response(form_id, &respondent.subject_id).await
}

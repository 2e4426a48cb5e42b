// src/models/response.rs

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::question::Answer;

/// A submitted response. Exactly one exists per (form, respondent) pair and
/// it is never mutated after creation; deletion only happens as a cascade
/// when the owner deletes the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: String,
    pub form_id: String,
    pub respondent_id: String,
    pub respondent_email: Option<String>,
    pub answers: HashMap<String, Answer>,
    pub score: ScoreReport,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Deterministic grading result for a whole form. Persisted verbatim with
/// the response so the result view never re-scores.
///
/// `per_question` is a BTreeMap so two identical scoring runs serialize
/// identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub total_units: u32,
    pub earned_units: u32,
    /// round(100 * earned / total) over the whole form; 0 when there are no
    /// units. Heavier questions dominate proportionally by design.
    pub percentage: u8,
    pub per_question: BTreeMap<String, QuestionScore>,
}

/// Per-question slice of a score report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScore {
    pub earned_units: u32,
    pub total_units: u32,
    pub fully_correct: bool,
}

/// Insert payload for the store; id and submission time are assigned there.
#[derive(Debug, Clone)]
pub struct NewResponse {
    pub form_id: String,
    pub respondent_id: String,
    pub respondent_email: Option<String>,
    pub answers: HashMap<String, Answer>,
    pub score: ScoreReport,
}

/// DTO for submitting a response to a published form.
#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    /// question id -> answer. Questions left out entirely are skipped by the
    /// scorer rather than counted as wrong.
    pub answers: HashMap<String, Answer>,
}

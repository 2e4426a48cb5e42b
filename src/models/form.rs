// src/models/form.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{Question, validate_questions};

/// A quiz form as stored and served. `owner_id` is the authoring identity's
/// subject id; anonymous forms (no owner) are permitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub header_image: Option<String>,
    pub questions: Vec<Question>,
    pub is_published: bool,
    pub owner_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Form {
    /// Whether `identity` may mutate or inspect responses of this form.
    /// Forms without an owner are open to any caller.
    pub fn is_owned_by(&self, identity: Option<&str>) -> bool {
        match &self.owner_id {
            Some(owner) => identity == Some(owner.as_str()),
            None => true,
        }
    }
}

/// Insert payload handed to the store; id and timestamps are assigned there.
#[derive(Debug, Clone)]
pub struct NewForm {
    pub title: String,
    pub description: Option<String>,
    pub header_image: Option<String>,
    pub questions: Vec<Question>,
    pub is_published: bool,
    pub owner_id: Option<String>,
}

/// DTO for creating a new form.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub header_image: Option<String>,
    #[serde(default)]
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub is_published: bool,
}

/// DTO for partial form updates. Absent fields are left unchanged;
/// publishing is an update setting `isPublished`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub header_image: Option<String>,
    #[validate(custom(function = validate_questions))]
    pub questions: Option<Vec<Question>>,
    pub is_published: Option<bool>,
}

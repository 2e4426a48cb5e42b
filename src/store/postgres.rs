// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::form::{Form, NewForm, UpdateFormRequest};
use crate::models::question::{Answer, Question};
use crate::models::response::{FormResponse, NewResponse, ScoreReport};
use crate::store::{InsertOutcome, Store, StoreError};

/// Postgres-backed store. Queries use the runtime-checked sqlx API because
/// this sits behind the `Store` trait and the schema is owned by the
/// migrations in `./migrations`.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape for the `forms` table; JSONB questions decode through
/// `sqlx::types::Json`.
#[derive(FromRow)]
struct FormRow {
    id: String,
    title: String,
    description: Option<String>,
    header_image: Option<String>,
    questions: Json<Vec<Question>>,
    is_published: bool,
    owner_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<FormRow> for Form {
    fn from(row: FormRow) -> Self {
        Form {
            id: row.id,
            title: row.title,
            description: row.description,
            header_image: row.header_image,
            questions: row.questions.0,
            is_published: row.is_published,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row shape for the `responses` table.
#[derive(FromRow)]
struct ResponseRow {
    id: String,
    form_id: String,
    respondent_id: String,
    respondent_email: Option<String>,
    answers: Json<HashMap<String, Answer>>,
    score: Json<ScoreReport>,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

impl From<ResponseRow> for FormResponse {
    fn from(row: ResponseRow) -> Self {
        FormResponse {
            id: row.id,
            form_id: row.form_id,
            respondent_id: row.respondent_id,
            respondent_email: row.respondent_email,
            answers: row.answers.0,
            score: row.score.0,
            submitted_at: row.submitted_at,
        }
    }
}

const FORM_COLUMNS: &str =
    "id, title, description, header_image, questions, is_published, owner_id, created_at, updated_at";

const RESPONSE_COLUMNS: &str =
    "id, form_id, respondent_id, respondent_email, answers, score, submitted_at";

#[async_trait]
impl Store for PgStore {
    async fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        let rows = sqlx::query_as::<_, FormRow>(&format!(
            "SELECT {FORM_COLUMNS} FROM forms ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Form::from).collect())
    }

    async fn get_form(&self, id: &str) -> Result<Option<Form>, StoreError> {
        let row = sqlx::query_as::<_, FormRow>(&format!(
            "SELECT {FORM_COLUMNS} FROM forms WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Form::from))
    }

    async fn create_form(&self, new_form: NewForm) -> Result<Form, StoreError> {
        let row = sqlx::query_as::<_, FormRow>(&format!(
            r#"
            INSERT INTO forms (id, title, description, header_image, questions, is_published, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {FORM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(new_form.title)
        .bind(new_form.description)
        .bind(new_form.header_image)
        .bind(Json(new_form.questions))
        .bind(new_form.is_published)
        .bind(new_form.owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_form(
        &self,
        id: &str,
        patch: UpdateFormRequest,
    ) -> Result<Option<Form>, StoreError> {
        // COALESCE keeps the stored value for any field absent in the patch.
        let row = sqlx::query_as::<_, FormRow>(&format!(
            r#"
            UPDATE forms SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                header_image = COALESCE($4, header_image),
                questions = COALESCE($5, questions),
                is_published = COALESCE($6, is_published),
                updated_at = now()
            WHERE id = $1
            RETURNING {FORM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.header_image)
        .bind(patch.questions.map(Json))
        .bind(patch.is_published)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Form::from))
    }

    async fn delete_form(&self, id: &str) -> Result<bool, StoreError> {
        // Responses cascade via the foreign key.
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_response_if_absent(
        &self,
        new_response: NewResponse,
    ) -> Result<InsertOutcome, StoreError> {
        // The unique constraint is the synchronization point: no prior read,
        // so concurrent submits cannot both pass a check-then-act window.
        let inserted = sqlx::query_as::<_, ResponseRow>(&format!(
            r#"
            INSERT INTO responses (id, form_id, respondent_id, respondent_email, answers, score)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT responses_form_respondent_key DO NOTHING
            RETURNING {RESPONSE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&new_response.form_id)
        .bind(&new_response.respondent_id)
        .bind(&new_response.respondent_email)
        .bind(Json(new_response.answers))
        .bind(Json(new_response.score))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Created(row.into()));
        }

        // Lost the race; hand back the winner's row.
        let existing = self
            .get_response(&new_response.form_id, &new_response.respondent_id)
            .await?
            .ok_or_else(|| {
                StoreError::Backend(
                    "response insert conflicted but the existing row was not found".to_string(),
                )
            })?;

        Ok(InsertOutcome::Existing(existing))
    }

    async fn get_response(
        &self,
        form_id: &str,
        respondent_id: &str,
    ) -> Result<Option<FormResponse>, StoreError> {
        let row = sqlx::query_as::<_, ResponseRow>(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE form_id = $1 AND respondent_id = $2"
        ))
        .bind(form_id)
        .bind(respondent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FormResponse::from))
    }

    async fn list_responses(&self, form_id: &str) -> Result<Vec<FormResponse>, StoreError> {
        let rows = sqlx::query_as::<_, ResponseRow>(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE form_id = $1 ORDER BY submitted_at DESC"
        ))
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FormResponse::from).collect())
    }
}

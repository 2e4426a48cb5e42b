// src/store/memory.rs

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::form::{Form, NewForm, UpdateFormRequest};
use crate::models::response::{FormResponse, NewResponse};
use crate::store::{InsertOutcome, Store, StoreError};

/// In-memory store. Backs the integration tests and local development runs
/// where no Postgres is available.
///
/// Uniqueness of (form_id, respondent_id) is enforced by an occupied-entry
/// check inside a single lock acquisition, which gives the same
/// insert-or-return-existing semantics as the database constraint.
#[derive(Default)]
pub struct MemoryStore {
    forms: Mutex<HashMap<String, Form>>,
    responses: Mutex<HashMap<(String, String), FormResponse>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        let forms = self.forms.lock().unwrap();
        let mut all: Vec<Form> = forms.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn get_form(&self, id: &str) -> Result<Option<Form>, StoreError> {
        Ok(self.forms.lock().unwrap().get(id).cloned())
    }

    async fn create_form(&self, new_form: NewForm) -> Result<Form, StoreError> {
        let now = chrono::Utc::now();
        let form = Form {
            id: Uuid::new_v4().to_string(),
            title: new_form.title,
            description: new_form.description,
            header_image: new_form.header_image,
            questions: new_form.questions,
            is_published: new_form.is_published,
            owner_id: new_form.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.forms
            .lock()
            .unwrap()
            .insert(form.id.clone(), form.clone());
        Ok(form)
    }

    async fn update_form(
        &self,
        id: &str,
        patch: UpdateFormRequest,
    ) -> Result<Option<Form>, StoreError> {
        let mut forms = self.forms.lock().unwrap();
        let Some(form) = forms.get_mut(id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            form.title = title;
        }
        if let Some(description) = patch.description {
            form.description = Some(description);
        }
        if let Some(header_image) = patch.header_image {
            form.header_image = Some(header_image);
        }
        if let Some(questions) = patch.questions {
            form.questions = questions;
        }
        if let Some(is_published) = patch.is_published {
            form.is_published = is_published;
        }
        form.updated_at = chrono::Utc::now();

        Ok(Some(form.clone()))
    }

    async fn delete_form(&self, id: &str) -> Result<bool, StoreError> {
        let existed = self.forms.lock().unwrap().remove(id).is_some();
        if existed {
            self.responses
                .lock()
                .unwrap()
                .retain(|(form_id, _), _| form_id != id);
        }
        Ok(existed)
    }

    async fn insert_response_if_absent(
        &self,
        new_response: NewResponse,
    ) -> Result<InsertOutcome, StoreError> {
        let key = (
            new_response.form_id.clone(),
            new_response.respondent_id.clone(),
        );

        let mut responses = self.responses.lock().unwrap();
        match responses.entry(key) {
            Entry::Occupied(existing) => Ok(InsertOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                let response = FormResponse {
                    id: Uuid::new_v4().to_string(),
                    form_id: new_response.form_id,
                    respondent_id: new_response.respondent_id,
                    respondent_email: new_response.respondent_email,
                    answers: new_response.answers,
                    score: new_response.score,
                    submitted_at: chrono::Utc::now(),
                };
                slot.insert(response.clone());
                Ok(InsertOutcome::Created(response))
            }
        }
    }

    async fn get_response(
        &self,
        form_id: &str,
        respondent_id: &str,
    ) -> Result<Option<FormResponse>, StoreError> {
        let key = (form_id.to_string(), respondent_id.to_string());
        Ok(self.responses.lock().unwrap().get(&key).cloned())
    }

    async fn list_responses(&self, form_id: &str) -> Result<Vec<FormResponse>, StoreError> {
        let responses = self.responses.lock().unwrap();
        let mut matching: Vec<FormResponse> = responses
            .values()
            .filter(|response| response.form_id == form_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(matching)
    }
}

// src/store/mod.rs

use std::fmt;

use async_trait::async_trait;

use crate::models::form::{Form, NewForm, UpdateFormRequest};
use crate::models::response::{FormResponse, NewResponse};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of an insert-if-absent on the responses table.
///
/// `Existing` is the loser's side of a submit race (or a repeat submit): the
/// row that already holds the (form, respondent) key, returned unchanged.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(FormResponse),
    Existing(FormResponse),
}

/// Failure in the storage backend. Transient from the caller's point of
/// view; retrying a whole `submit` is safe because inserts are keyed.
#[derive(Debug)]
pub enum StoreError {
    Backend(String),
    /// A stored document failed to decode. Not retryable.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "storage backend error: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "corrupt stored document: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Durable storage for forms and responses.
///
/// `insert_response_if_absent` is the exactly-once synchronization point:
/// implementations must enforce uniqueness of (form_id, respondent_id) at
/// the storage layer, not by a prior read.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_forms(&self) -> Result<Vec<Form>, StoreError>;
    async fn get_form(&self, id: &str) -> Result<Option<Form>, StoreError>;
    async fn create_form(&self, new_form: NewForm) -> Result<Form, StoreError>;
    /// Applies the provided fields, returns the updated form, or `None` if
    /// the form does not exist.
    async fn update_form(
        &self,
        id: &str,
        patch: UpdateFormRequest,
    ) -> Result<Option<Form>, StoreError>;
    /// Deletes a form and, cascading, its responses. Returns whether a form
    /// was deleted.
    async fn delete_form(&self, id: &str) -> Result<bool, StoreError>;

    async fn insert_response_if_absent(
        &self,
        new_response: NewResponse,
    ) -> Result<InsertOutcome, StoreError>;
    async fn get_response(
        &self,
        form_id: &str,
        respondent_id: &str,
    ) -> Result<Option<FormResponse>, StoreError>;
    /// All responses for a form, newest first.
    async fn list_responses(&self, form_id: &str) -> Result<Vec<FormResponse>, StoreError>;
}

// src/draft.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::models::question::Answer;
use crate::models::response::{FormResponse, ScoreReport};

/// Client-local durable key-value storage. The browser's storage is one
/// implementation target; tests inject [`MemoryLocalStore`] and desktop
/// clients use [`FileLocalStore`].
///
/// All draft state goes through this seam instead of scattered string-keyed
/// global calls, so the manager's behavior is testable in isolation.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory local store.
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// File-backed local store: one JSON document holding the whole key space.
/// Writes are best effort; a failed write keeps the in-memory view and logs,
/// matching how browser local storage degrades.
pub struct FileLocalStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileLocalStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!("discarding unreadable local store {}: {}", path.display(), err);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        match serde_json::to_string(entries) {
            Ok(raw) => {
                if let Err(err) = std::fs::write(&self.path, raw) {
                    tracing::warn!("failed to write local store {}: {}", self.path.display(), err);
                }
            }
            Err(err) => tracing::warn!("failed to encode local store: {}", err),
        }
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.persist(&entries);
    }
}

/// In-progress answers for one respondent on one form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub form_id: String,
    pub respondent_id: String,
    pub answers: HashMap<String, Answer>,
    pub last_saved_at: chrono::DateTime<chrono::Utc>,
}

/// Authoritative post-submission state cached locally so a reload renders
/// the result without the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRecord {
    pub answers: HashMap<String, Answer>,
    pub score: ScoreReport,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// What a form load starts from.
#[derive(Debug)]
pub enum RestoredState {
    /// Already submitted: render the read-only result view.
    Submitted(SubmittedRecord),
    /// Unsubmitted draft found: prefill the editor.
    Draft(HashMap<String, Answer>),
    Empty,
}

fn draft_key(form_id: &str, respondent_id: &str) -> String {
    format!("draft:{form_id}:{respondent_id}")
}

fn submitted_key(form_id: &str, respondent_id: &str) -> String {
    format!("submitted:{form_id}:{respondent_id}")
}

/// Persists in-progress answers on a debounce and reconciles them against
/// the server's submitted state. One manager per open form.
///
/// Rapid edits reschedule the single pending write rather than queuing;
/// dropping the manager (component unmount) cancels it.
pub struct DraftManager {
    store: Arc<dyn LocalStore>,
    quiet_period: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DraftManager {
    /// Uses the production quiet period of one second between the last edit
    /// and the durable write.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self::with_quiet_period(store, Duration::from_secs(1))
    }

    pub fn with_quiet_period(store: Arc<dyn LocalStore>, quiet_period: Duration) -> Self {
        Self {
            store,
            quiet_period,
            pending: Mutex::new(None),
        }
    }

    /// Decides what the form page starts from. The submitted marker always
    /// wins over a draft; a corrupt entry is dropped and treated as absent.
    pub fn restore(&self, form_id: &str, respondent_id: &str) -> RestoredState {
        let marker_key = submitted_key(form_id, respondent_id);
        if let Some(raw) = self.store.get(&marker_key) {
            match serde_json::from_str::<SubmittedRecord>(&raw) {
                Ok(record) => return RestoredState::Submitted(record),
                Err(err) => {
                    tracing::warn!("discarding corrupt submitted marker: {}", err);
                    self.store.remove(&marker_key);
                }
            }
        }

        let key = draft_key(form_id, respondent_id);
        if let Some(raw) = self.store.get(&key) {
            match serde_json::from_str::<Draft>(&raw) {
                Ok(draft) => return RestoredState::Draft(draft.answers),
                Err(err) => {
                    tracing::warn!("discarding corrupt draft: {}", err);
                    self.store.remove(&key);
                }
            }
        }

        RestoredState::Empty
    }

    /// Schedules a durable write of the current answers after the quiet
    /// period. Called on every answer mutation; an already-pending write is
    /// rescheduled, not queued.
    pub fn save(&self, form_id: &str, respondent_id: &str, answers: &HashMap<String, Answer>) {
        let store = Arc::clone(&self.store);
        let key = draft_key(form_id, respondent_id);
        let form_id = form_id.to_string();
        let respondent_id = respondent_id.to_string();
        let answers = answers.clone();
        let quiet_period = self.quiet_period;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            let draft = Draft {
                form_id,
                respondent_id,
                answers,
                last_saved_at: chrono::Utc::now(),
            };
            match serde_json::to_string(&draft) {
                Ok(raw) => store.set(&key, &raw),
                Err(err) => tracing::warn!("failed to encode draft: {}", err),
            }
        });

        let mut pending = self.pending.lock().unwrap();
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Writes the draft immediately, cancelling any pending timer. Used when
    /// the page is about to go away before the quiet period elapses.
    pub fn flush(&self, form_id: &str, respondent_id: &str, answers: &HashMap<String, Answer>) {
        self.cancel_pending();

        let draft = Draft {
            form_id: form_id.to_string(),
            respondent_id: respondent_id.to_string(),
            answers: answers.clone(),
            last_saved_at: chrono::Utc::now(),
        };
        match serde_json::to_string(&draft) {
            Ok(raw) => self.store.set(&draft_key(form_id, respondent_id), &raw),
            Err(err) => tracing::warn!("failed to encode draft: {}", err),
        }
    }

    /// Records the server-confirmed response locally: the draft key is
    /// removed (not merely shadowed) and the submitted marker takes its
    /// place. Called for both fresh and already-submitted outcomes, so a
    /// stale client converges on the server's state.
    pub fn commit(&self, response: &FormResponse) {
        self.cancel_pending();

        let record = SubmittedRecord {
            answers: response.answers.clone(),
            score: response.score.clone(),
            submitted_at: response.submitted_at,
        };

        match serde_json::to_string(&record) {
            Ok(raw) => {
                self.store
                    .remove(&draft_key(&response.form_id, &response.respondent_id));
                self.store
                    .set(&submitted_key(&response.form_id, &response.respondent_id), &raw);
            }
            Err(err) => tracing::warn!("failed to encode submitted record: {}", err),
        }
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for DraftManager {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn answers(value: &str) -> HashMap<String, Answer> {
        HashMap::from([(
            "q1".to_string(),
            Answer::Cloze(HashMap::from([("b1".to_string(), value.to_string())])),
        )])
    }

    fn response(form_id: &str, respondent_id: &str) -> FormResponse {
        FormResponse {
            id: "r1".to_string(),
            form_id: form_id.to_string(),
            respondent_id: respondent_id.to_string(),
            respondent_email: None,
            answers: answers("Paris"),
            score: ScoreReport {
                total_units: 1,
                earned_units: 1,
                percentage: 100,
                per_question: BTreeMap::new(),
            },
            submitted_at: chrono::Utc::now(),
        }
    }

    fn manager(store: &Arc<MemoryLocalStore>) -> DraftManager {
        DraftManager::with_quiet_period(
            Arc::clone(store) as Arc<dyn LocalStore>,
            Duration::from_secs(1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn save_waits_for_the_quiet_period() {
        let store = Arc::new(MemoryLocalStore::new());
        let drafts = manager(&store);

        drafts.save("f1", "u1", &answers("Par"));
        assert!(store.get("draft:f1:u1").is_none());

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let raw = store.get("draft:f1:u1").expect("draft written after quiet period");
        let draft: Draft = serde_json::from_str(&raw).unwrap();
        assert!(matches!(draft.answers.get("q1"), Some(Answer::Cloze(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_reschedule_the_pending_write() {
        let store = Arc::new(MemoryLocalStore::new());
        let drafts = manager(&store);

        drafts.save("f1", "u1", &answers("P"));
        tokio::time::sleep(Duration::from_millis(500)).await;
        drafts.save("f1", "u1", &answers("Paris"));

        // Past the first deadline but not the rescheduled one.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(store.get("draft:f1:u1").is_none());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let draft: Draft =
            serde_json::from_str(&store.get("draft:f1:u1").unwrap()).unwrap();
        let Some(Answer::Cloze(selected)) = draft.answers.get("q1") else {
            panic!("unexpected draft shape");
        };
        assert_eq!(selected["b1"], "Paris");
    }

    #[tokio::test(start_paused = true)]
    async fn restore_returns_saved_draft() {
        let store = Arc::new(MemoryLocalStore::new());
        let drafts = manager(&store);

        drafts.flush("f1", "u1", &answers("Paris"));

        match drafts.restore("f1", "u1") {
            RestoredState::Draft(restored) => {
                assert!(restored.contains_key("q1"));
            }
            other => panic!("expected draft, got {other:?}"),
        }

        // A different respondent on the same form starts clean.
        assert!(matches!(drafts.restore("f1", "u2"), RestoredState::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn commit_replaces_the_draft_with_the_submitted_marker() {
        let store = Arc::new(MemoryLocalStore::new());
        let drafts = manager(&store);

        drafts.flush("f1", "u1", &answers("Madrid"));
        drafts.commit(&response("f1", "u1"));

        assert!(store.get("draft:f1:u1").is_none());
        match drafts.restore("f1", "u1") {
            RestoredState::Submitted(record) => {
                assert_eq!(record.score.percentage, 100);
            }
            other => panic!("expected submitted state, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn commit_cancels_a_pending_save() {
        let store = Arc::new(MemoryLocalStore::new());
        let drafts = manager(&store);

        drafts.save("f1", "u1", &answers("Madrid"));
        drafts.commit(&response("f1", "u1"));

        // The aborted timer must not resurrect the draft after commit.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(store.get("draft:f1:u1").is_none());
        assert!(matches!(
            drafts.restore("f1", "u1"),
            RestoredState::Submitted(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn submitted_marker_wins_over_a_stale_draft() {
        let store = Arc::new(MemoryLocalStore::new());
        let drafts = manager(&store);

        drafts.commit(&response("f1", "u1"));
        // Simulate a stale draft key left behind by another tab.
        store.set("draft:f1:u1", &serde_json::to_string(&Draft {
            form_id: "f1".to_string(),
            respondent_id: "u1".to_string(),
            answers: answers("Madrid"),
            last_saved_at: chrono::Utc::now(),
        }).unwrap());

        assert!(matches!(
            drafts.restore("f1", "u1"),
            RestoredState::Submitted(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_entries_are_discarded() {
        let store = Arc::new(MemoryLocalStore::new());
        let drafts = manager(&store);

        store.set("draft:f1:u1", "not json");
        assert!(matches!(drafts.restore("f1", "u1"), RestoredState::Empty));
        assert!(store.get("draft:f1:u1").is_none());
    }
}

// src/models/question.rs

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A gradable question, discriminated by the `type` tag on the wire.
///
/// The set is closed: the scorer and every renderer match exhaustively, so a
/// new variant fails to compile until all consumers handle it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Question {
    /// Drag items into categories. The data model carries no canonical
    /// correct categorization, so this type is never worth credit.
    #[serde(rename_all = "camelCase")]
    Categorize {
        id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        items: Vec<String>,
        categories: Vec<String>,
    },

    /// Fill-in-the-blank over a body text. Respondents pick from a shared
    /// option pool (correct values plus distractors).
    #[serde(rename_all = "camelCase")]
    Cloze {
        id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        text: String,
        blanks: Vec<Blank>,
        options: Vec<String>,
    },

    /// A passage followed by multiple-choice sub-questions.
    #[serde(rename_all = "camelCase")]
    Comprehension {
        id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        passage: String,
        sub_questions: Vec<SubQuestion>,
    },
}

impl Question {
    pub fn id(&self) -> &str {
        match self {
            Question::Categorize { id, .. } => id,
            Question::Cloze { id, .. } => id,
            Question::Comprehension { id, .. } => id,
        }
    }
}

/// One blank inside a Cloze question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blank {
    pub id: String,
    pub correct_answer: String,
}

/// One multiple-choice sub-question inside a Comprehension question.
/// `correct_answer` is an index into `options`; a sub-question without one
/// still counts toward the denominator but can never be earned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<u32>,
}

/// A respondent's answer to one question. The client sends plain maps with no
/// type tag, so the variant is recovered from the value shape: item lists for
/// categorize, option indexes for comprehension, option strings for cloze.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// category label -> items placed there
    Categorize(HashMap<String, Vec<String>>),
    /// sub-question id -> selected option index
    Comprehension(HashMap<String, u32>),
    /// blank id -> selected option string
    Cloze(HashMap<String, String>),
}

/// Checks the id-uniqueness invariants on a question set:
/// question ids unique within the form, blank ids unique within a Cloze,
/// sub-question ids unique within a Comprehension.
pub fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    let mut question_ids = HashSet::new();

    for question in questions {
        if !question_ids.insert(question.id()) {
            return Err(validator::ValidationError::new("duplicate_question_id"));
        }

        match question {
            Question::Categorize { .. } => {}
            Question::Cloze { blanks, .. } => {
                let mut blank_ids = HashSet::new();
                for blank in blanks {
                    if !blank_ids.insert(blank.id.as_str()) {
                        return Err(validator::ValidationError::new("duplicate_blank_id"));
                    }
                }
            }
            Question::Comprehension { sub_questions, .. } => {
                let mut sub_ids = HashSet::new();
                for sub in sub_questions {
                    if !sub_ids.insert(sub.id.as_str()) {
                        return Err(validator::ValidationError::new("duplicate_sub_question_id"));
                    }
                }
            }
        }
    }

    Ok(())
}

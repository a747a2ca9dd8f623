use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// A course subunit as stored: optional transcript, optional notes and an
/// optional quiz (JSON array of questions).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Topic {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
    pub transcript: Option<String>,
    pub notes: Option<String>,
    pub quiz_questions: Option<JsonValue>,
}

impl Topic {
    /// Question texts of the topic's stored quiz, whatever shape the entries have.
    pub fn existing_question_texts(&self) -> Vec<String> {
        self.quiz_questions
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|q| q.get("question").and_then(|s| s.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Grounding material for one topic, built per request and discarded after.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    pub topic_id: Uuid,
    pub topic_title: String,
    pub content: String,
    pub existing_question_texts: Vec<String>,
}

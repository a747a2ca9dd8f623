use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Completed vs. total topics of a course for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicProgress {
    pub completed: i64,
    pub total: i64,
}

impl TopicProgress {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::question::CandidateQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Scheduled => "SCHEDULED",
            ExamStatus::InProgress => "IN_PROGRESS",
            ExamStatus::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(&self, next: ExamStatus) -> bool {
        matches!(
            (self, next),
            (ExamStatus::Scheduled, ExamStatus::InProgress)
                | (ExamStatus::InProgress, ExamStatus::Completed)
        )
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(ExamStatus::Scheduled),
            "IN_PROGRESS" => Ok(ExamStatus::InProgress),
            "COMPLETED" => Ok(ExamStatus::Completed),
            other => Err(format!("Unknown exam status: {}", other)),
        }
    }
}

/// Row shape of `exam_schedules`.
#[derive(Debug, Clone, FromRow)]
pub struct ExamScheduleRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub questions: JsonValue,
    pub status: String,
    pub score: Option<i32>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExamSchedule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub questions: Vec<CandidateQuestion>,
    pub status: ExamStatus,
    pub score: Option<i32>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ExamScheduleRow> for ExamSchedule {
    type Error = crate::error::Error;

    fn try_from(row: ExamScheduleRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ExamStatus>()
            .map_err(crate::error::Error::Internal)?;
        Ok(Self {
            id: row.id,
            course_id: row.course_id,
            user_id: row.user_id,
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes.max(0) as u32,
            questions: serde_json::from_value(row.questions)?,
            status,
            score: row.score,
            percentage: row.percentage,
            passed: row.passed,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// A course's question bank as persisted for reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredQuestionSet {
    pub questions: Vec<CandidateQuestion>,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct NewExamSchedule {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub questions: Vec<CandidateQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamOutcome {
    pub score: i32,
    pub percentage: f64,
    pub passed: bool,
}

use crate::models::exam::{ExamSchedule, ExamStatus};
use crate::models::question::CandidateQuestion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScheduleExamPayload {
    pub user_id: Uuid,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartExamPayload {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExamAnswer {
    pub question_index: usize,
    pub selected: u8,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitExamPayload {
    pub user_id: Uuid,
    #[validate(length(max = 60, message = "Too many answers"))]
    pub answers: Vec<ExamAnswer>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExamResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: ExamStatus,
    pub question_count: usize,
    pub questions: Vec<CandidateQuestion>,
    pub score: Option<i32>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
}

impl From<ExamSchedule> for ExamResponse {
    fn from(exam: ExamSchedule) -> Self {
        Self {
            id: exam.id,
            course_id: exam.course_id,
            user_id: exam.user_id,
            scheduled_at: exam.scheduled_at,
            duration_minutes: exam.duration_minutes,
            status: exam.status,
            question_count: exam.questions.len(),
            questions: exam.questions,
            score: exam.score,
            percentage: exam.percentage,
            passed: exam.passed,
        }
    }
}

use crate::models::question::CandidateQuestion;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_QUIZ_QUESTIONS: usize = 10;
pub const DEFAULT_PASSING_SCORE: f64 = 70.0;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct GenerateQuizPayload {
    #[validate(range(min = 1, max = 20, message = "Count must be between 1 and 20"))]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicQuiz {
    pub topic_id: Uuid,
    pub questions: Vec<CandidateQuestion>,
    pub passing_score: f64,
    pub used_fallback: bool,
}

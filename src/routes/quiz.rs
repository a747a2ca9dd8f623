use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz_dto::{GenerateQuizPayload, TopicQuiz, DEFAULT_QUIZ_QUESTIONS},
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/topics/{topic_id}/quiz",
    params(
        ("topic_id" = Uuid, Path, description = "Topic ID")
    ),
    request_body = GenerateQuizPayload,
    responses(
        (status = 200, description = "Quiz generated", body = Json<TopicQuiz>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Topic not found"),
        (status = 422, description = "Topic has no usable content"),
        (status = 429, description = "Generation request budget exhausted")
    )
)]
#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
    payload: Option<Json<GenerateQuizPayload>>,
) -> Result<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;
    let count = payload.count.unwrap_or(DEFAULT_QUIZ_QUESTIONS);
    let quiz = state.quiz_service.generate_topic_quiz(topic_id, count).await?;
    Ok(Json(quiz))
}

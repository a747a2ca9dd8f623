use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::exam_dto::{ExamResponse, ScheduleExamPayload, StartExamPayload, SubmitExamPayload},
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/exams",
    params(
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    request_body = ScheduleExamPayload,
    responses(
        (status = 201, description = "Exam scheduled", body = Json<ExamResponse>),
        (status = 403, description = "User not enrolled or topics incomplete"),
        (status = 404, description = "Course not found"),
        (status = 422, description = "Course has no usable content"),
        (status = 429, description = "Generation request budget exhausted")
    )
)]
#[axum::debug_handler]
pub async fn schedule_exam(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<ScheduleExamPayload>,
) -> Result<impl IntoResponse> {
    let exam = state
        .exam_service
        .schedule_exam(payload.user_id, course_id, payload.scheduled_at)
        .await?;
    Ok((StatusCode::CREATED, Json(ExamResponse::from(exam))))
}

#[utoipa::path(
    get,
    path = "/api/exams/{id}",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    responses(
        (status = 200, description = "Exam found", body = Json<ExamResponse>),
        (status = 404, description = "Exam not found")
    )
)]
#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.get_exam(id).await?;
    Ok(Json(ExamResponse::from(exam)))
}

#[utoipa::path(
    post,
    path = "/api/exams/{id}/start",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    request_body = StartExamPayload,
    responses(
        (status = 200, description = "Exam started", body = Json<ExamResponse>),
        (status = 404, description = "Exam not found"),
        (status = 409, description = "Exam is not scheduled")
    )
)]
#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartExamPayload>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.start_exam(id, payload.user_id).await?;
    Ok(Json(ExamResponse::from(exam)))
}

#[utoipa::path(
    post,
    path = "/api/exams/{id}/submit",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    request_body = SubmitExamPayload,
    responses(
        (status = 200, description = "Exam graded", body = Json<ExamResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Exam not found"),
        (status = 409, description = "Exam is not in progress")
    )
)]
#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state
        .exam_service
        .submit_exam(id, payload.user_id, &payload.answers)
        .await?;
    Ok(Json(ExamResponse::from(exam)))
}

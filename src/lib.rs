pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::database::exam_store::{ExamStore, PgExamStore};
use crate::services::{
    ai_service::{GeminiClient, GenerativeClient},
    exam_assembler::{AssemblySettings, ExamAssembler},
    exam_service::ExamService,
    question_generator::QuestionGenerator,
    quiz_service::QuizService,
    validation_service::QuestionValidator,
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub exam_service: ExamService,
    pub quiz_service: QuizService,
}

impl AppState {
    pub fn new(pool: PgPool) -> error::Result<Self> {
        let config = config::get_config();
        let timeout = Duration::from_secs(config.generation_timeout_secs);
        let http_client = Client::builder()
            .timeout(timeout + Duration::from_secs(5))
            .build()?;

        let client = GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_api_base.clone(),
            http_client,
        )
        .with_timeout(timeout);

        let settings = AssemblySettings {
            min_questions: config.exam_min_questions,
            max_questions: config.exam_max_questions,
        };

        Ok(Self::from_parts(
            Arc::new(PgExamStore::new(pool)),
            Arc::new(client),
            settings,
            config.exam_passing_score,
        ))
    }

    /// Wires the services over any store and generative backend.
    pub fn from_parts(
        store: Arc<dyn ExamStore>,
        client: Arc<dyn GenerativeClient>,
        settings: AssemblySettings,
        passing_score: f64,
    ) -> Self {
        let generator = QuestionGenerator::new(client);
        let validator = QuestionValidator::default();
        let assembler = ExamAssembler::new(generator.clone(), validator.clone(), settings);

        Self {
            exam_service: ExamService::new(store.clone(), assembler, passing_score),
            quiz_service: QuizService::new(store, generator, validator),
        }
    }
}

/// Full HTTP surface. Endpoints that may call the generative backend sit
/// behind a per-minute request budget.
pub fn build_router(state: AppState, generation_rpm: u32) -> Router {
    let generation_api = Router::new()
        .route("/api/courses/:course_id/exams", post(routes::exam::schedule_exam))
        .route("/api/topics/:topic_id/quiz", post(routes::quiz::generate_quiz))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rpm_state(generation_rpm),
            middleware::rate_limit::rpm_middleware,
        ));

    let exam_api = Router::new()
        .route("/api/exams/:id", get(routes::exam::get_exam))
        .route("/api/exams/:id/start", post(routes::exam::start_exam))
        .route("/api/exams/:id/submit", post(routes::exam::submit_exam));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(generation_api)
        .merge(exam_api)
        .with_state(state)
}

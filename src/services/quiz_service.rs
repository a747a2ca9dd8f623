use crate::database::exam_store::ExamStore;
use crate::dto::quiz_dto::{TopicQuiz, DEFAULT_PASSING_SCORE};
use crate::error::{Error, Result};
use crate::models::question::CandidateQuestion;
use crate::services::content_service::require_content_units;
use crate::services::fallback_service::FallbackBank;
use crate::services::question_generator::{PromptKind, QuestionGenerator};
use crate::services::validation_service::QuestionValidator;
use crate::utils::json_repair::parse_generated_payload;
use std::sync::Arc;
use uuid::Uuid;

/// Short per-topic quizzes grounded in the topic transcript.
#[derive(Clone)]
pub struct QuizService {
    store: Arc<dyn ExamStore>,
    generator: QuestionGenerator,
    validator: QuestionValidator,
    fallback: FallbackBank,
}

impl QuizService {
    pub fn new(store: Arc<dyn ExamStore>, generator: QuestionGenerator, validator: QuestionValidator) -> Self {
        Self {
            store,
            generator,
            validator,
            fallback: FallbackBank,
        }
    }

    pub async fn generate_topic_quiz(&self, topic_id: Uuid, count: usize) -> Result<TopicQuiz> {
        let topic = self
            .store
            .find_topic(topic_id)
            .await?
            .ok_or_else(|| Error::NotFound("Topic not found".to_string()))?;

        let unit = require_content_units(std::slice::from_ref(&topic), &format!("Topic '{}'", topic.title))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoContentAvailable(topic.title.clone()))?;

        let mut passing_score = None;
        let mut questions: Vec<CandidateQuestion> = Vec::new();

        match self
            .generator
            .generate_for_topic(&unit, count, PromptKind::TranscriptGrounded)
            .await
        {
            Ok(raw) => match parse_generated_payload(&raw) {
                Ok(payload) => {
                    passing_score = payload.passing_score;
                    questions = self
                        .validator
                        .filter_candidates(&payload.questions, &unit.existing_question_texts);
                }
                Err(e) => {
                    tracing::warn!(topic = %topic.title, error = %e, "Could not parse quiz response");
                }
            },
            Err(e) => {
                tracing::warn!(topic = %topic.title, error = %e, "Quiz generation failed");
            }
        }
        questions.truncate(count);

        let passing_score = passing_score
            .filter(|s| (0.0..=100.0).contains(s))
            .unwrap_or(DEFAULT_PASSING_SCORE);

        if questions.is_empty() {
            // A stored quiz is never replaced by fallback filler.
            if let Some(existing) = stored_quiz(&topic.quiz_questions) {
                tracing::info!(topic = %topic.title, "No new questions accepted, keeping stored quiz");
                return Ok(TopicQuiz {
                    topic_id,
                    questions: existing,
                    passing_score,
                    used_fallback: false,
                });
            }

            tracing::warn!(topic = %topic.title, count, "Using fallback quiz questions");
            let questions = self.fallback.generate(&topic.title, count);
            self.store.save_topic_quiz(topic_id, &questions).await?;
            return Ok(TopicQuiz {
                topic_id,
                questions,
                passing_score,
                used_fallback: true,
            });
        }

        self.store.save_topic_quiz(topic_id, &questions).await?;
        tracing::info!(topic = %topic.title, count = questions.len(), "Topic quiz generated");

        Ok(TopicQuiz {
            topic_id,
            questions,
            passing_score,
            used_fallback: false,
        })
    }
}

fn stored_quiz(value: &Option<serde_json::Value>) -> Option<Vec<CandidateQuestion>> {
    let questions: Vec<CandidateQuestion> = serde_json::from_value(value.clone()?).ok()?;
    QuestionValidator::is_well_formed_set(&questions).then_some(questions)
}

use crate::config::EXAM_QUESTION_CAP;
use crate::error::{Error, Result};
use crate::models::question::CandidateQuestion;
use crate::models::topic::ContentUnit;
use crate::services::fallback_service::FallbackBank;
use crate::services::question_generator::{PromptKind, QuestionGenerator};
use crate::services::validation_service::QuestionValidator;
use crate::utils::json_repair::parse_generated_payload;
use rand::seq::SliceRandom;

pub const DEFAULT_MIN_QUESTIONS: usize = 50;
pub const MIN_QUESTIONS_PER_TOPIC: usize = 8;
pub const MAX_TOP_UP_QUESTIONS: usize = 30;
pub const FALLBACK_EXAM_QUESTIONS: usize = 30;

const BASE_DURATION_MINUTES: u32 = 15;
const MIN_DURATION_MINUTES: u32 = 30;

/// Exam length: 15 minutes overhead plus one per question, never under 30.
pub fn exam_duration_minutes(question_count: usize) -> u32 {
    let count = u32::try_from(question_count).unwrap_or(u32::MAX - BASE_DURATION_MINUTES);
    (BASE_DURATION_MINUTES + count).max(MIN_DURATION_MINUTES)
}

/// Over-provisions by half so filter rejections still leave enough questions.
pub fn questions_per_topic(min_questions: usize, topic_count: usize) -> usize {
    let topics = topic_count.max(1);
    let wanted = (min_questions * 3).div_ceil(2 * topics);
    wanted.max(MIN_QUESTIONS_PER_TOPIC)
}

#[derive(Debug, Clone, Copy)]
pub struct AssemblySettings {
    pub min_questions: usize,
    pub max_questions: usize,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            min_questions: DEFAULT_MIN_QUESTIONS,
            max_questions: EXAM_QUESTION_CAP,
        }
    }
}

impl AssemblySettings {
    pub fn target_questions(&self) -> usize {
        self.min_questions.min(self.max_questions.min(EXAM_QUESTION_CAP))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledExam {
    pub questions: Vec<CandidateQuestion>,
    pub duration_minutes: u32,
    pub used_fallback: bool,
    pub rate_limited: bool,
}

/// Runs per-topic generation, the combined top-up pass and the fallback floor.
#[derive(Clone)]
pub struct ExamAssembler {
    generator: QuestionGenerator,
    validator: QuestionValidator,
    fallback: FallbackBank,
    settings: AssemblySettings,
}

impl ExamAssembler {
    pub fn new(
        generator: QuestionGenerator,
        validator: QuestionValidator,
        settings: AssemblySettings,
    ) -> Self {
        Self {
            generator,
            validator,
            fallback: FallbackBank,
            settings,
        }
    }

    pub fn settings(&self) -> AssemblySettings {
        self.settings
    }

    /// Builds the exam question set for `units`.
    ///
    /// The output is never empty: whenever the final pool is empty the
    /// fallback bank fills it, whether or not a generation call failed. A
    /// backend that answers but has every candidate rejected still yields an
    /// exam. `generation_failed` only feeds the fallback log line.
    pub async fn assemble(&self, course_title: &str, units: &[ContentUnit]) -> Result<AssembledExam> {
        if units.is_empty() {
            return Err(Error::NoContentAvailable(format!(
                "Course '{}' has no topic content",
                course_title
            )));
        }

        let target = self.settings.target_questions();
        let per_topic = questions_per_topic(self.settings.min_questions, units.len());
        let mut pool: Vec<CandidateQuestion> = Vec::new();
        let mut generation_failed = false;
        let mut rate_limited = false;

        tracing::info!(
            course = %course_title,
            topics = units.len(),
            per_topic,
            target,
            "Generating exam questions"
        );

        for unit in units {
            let raw = match self
                .generator
                .generate_for_topic(unit, per_topic, PromptKind::ExamGrade)
                .await
            {
                Ok(raw) => raw,
                Err(e) if e.is_rate_limit() => {
                    tracing::warn!(topic = %unit.topic_title, error = %e, "Generation rate limited, skipping remaining topics");
                    generation_failed = true;
                    rate_limited = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(topic = %unit.topic_title, error = %e, "Topic generation failed");
                    generation_failed = true;
                    continue;
                }
            };

            match parse_generated_payload(&raw) {
                Ok(payload) => {
                    let accepted = self
                        .validator
                        .filter_candidates(&payload.questions, &unit.existing_question_texts);
                    tracing::debug!(
                        topic = %unit.topic_title,
                        generated = payload.questions.len(),
                        accepted = accepted.len(),
                        "Topic questions validated"
                    );
                    pool.extend(accepted);
                }
                Err(e) => {
                    tracing::warn!(topic = %unit.topic_title, error = %e, "Could not parse topic questions");
                    generation_failed = true;
                }
            }
        }

        if pool.len() < target && !rate_limited {
            let needed = (target - pool.len()).min(MAX_TOP_UP_QUESTIONS);
            match self.top_up(course_title, units, &pool, needed).await {
                Ok(extra) => {
                    tracing::info!(requested = needed, accepted = extra.len(), "Combined top-up pass finished");
                    pool.extend(extra);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Combined top-up pass failed");
                    generation_failed = true;
                }
            }
        }

        pool.shuffle(&mut rand::thread_rng());
        pool.truncate(target);

        let mut used_fallback = false;
        if pool.is_empty() {
            let count = FALLBACK_EXAM_QUESTIONS.min(self.settings.max_questions.min(EXAM_QUESTION_CAP));
            tracing::warn!(
                course = %course_title,
                generation_failed,
                count,
                "No generated questions survived, using fallback bank"
            );
            pool = self.fallback.generate(course_title, count);
            used_fallback = true;
        }

        Ok(AssembledExam {
            duration_minutes: exam_duration_minutes(pool.len()),
            questions: pool,
            used_fallback,
            rate_limited,
        })
    }

    async fn top_up(
        &self,
        course_title: &str,
        units: &[ContentUnit],
        pool: &[CandidateQuestion],
        needed: usize,
    ) -> std::result::Result<Vec<CandidateQuestion>, anyhow::Error> {
        let mut existing: Vec<String> = pool.iter().map(|q| q.question.clone()).collect();
        existing.extend(units.iter().flat_map(|u| u.existing_question_texts.iter().cloned()));

        let raw = self
            .generator
            .generate_combined(course_title, units, &existing, needed)
            .await?;
        let payload = parse_generated_payload(&raw)?;
        Ok(self.validator.filter_candidates(&payload.questions, &existing))
    }
}

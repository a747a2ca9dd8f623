use crate::database::exam_store::ExamStore;
use crate::dto::exam_dto::ExamAnswer;
use crate::error::{Error, Result};
use crate::models::exam::{ExamSchedule, ExamStatus, NewExamSchedule, StoredQuestionSet};
use crate::services::content_service::require_content_units;
use crate::services::exam_assembler::ExamAssembler;
use crate::services::grading_service::GradingService;
use crate::services::validation_service::QuestionValidator;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Eligibility gate, question-bank reuse and the exam lifecycle.
#[derive(Clone)]
pub struct ExamService {
    store: Arc<dyn ExamStore>,
    assembler: ExamAssembler,
    passing_score: f64,
}

impl ExamService {
    pub fn new(store: Arc<dyn ExamStore>, assembler: ExamAssembler, passing_score: f64) -> Self {
        Self {
            store,
            assembler,
            passing_score,
        }
    }

    pub async fn schedule_exam(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<ExamSchedule> {
        let course = self
            .store
            .find_course(course_id)
            .await?
            .ok_or_else(|| Error::NotFound("Course not found".to_string()))?;

        if !self.store.is_enrolled(user_id, course_id).await? {
            return Err(Error::NotEnrolled);
        }

        let progress = self.store.topic_progress(user_id, course_id).await?;
        if !progress.is_complete() {
            return Err(Error::TopicsIncomplete {
                completed: progress.completed,
                total: progress.total,
            });
        }

        let set = match self.reusable_question_set(course_id).await? {
            Some(set) => {
                tracing::info!(%course_id, questions = set.questions.len(), "Reusing course question bank");
                set
            }
            None => self.generate_question_set(course_id, &course.title).await?,
        };

        let exam = self
            .store
            .insert_exam(NewExamSchedule {
                course_id,
                user_id,
                scheduled_at: scheduled_at.unwrap_or_else(Utc::now),
                duration_minutes: set.duration_minutes,
                questions: set.questions,
            })
            .await?;

        tracing::info!(
            exam_id = %exam.id,
            %course_id,
            %user_id,
            questions = exam.questions.len(),
            duration_minutes = exam.duration_minutes,
            "Exam scheduled"
        );
        Ok(exam)
    }

    async fn reusable_question_set(&self, course_id: Uuid) -> Result<Option<StoredQuestionSet>> {
        match self.store.find_question_set(course_id).await? {
            Some(set) if QuestionValidator::is_well_formed_set(&set.questions) => Ok(Some(set)),
            Some(_) => {
                tracing::warn!(%course_id, "Stored question bank is malformed, regenerating");
                self.store.discard_question_set(course_id).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn generate_question_set(&self, course_id: Uuid, course_title: &str) -> Result<StoredQuestionSet> {
        let topics = self.store.list_topics(course_id).await?;
        let units = require_content_units(&topics, &format!("Course '{}'", course_title))?;

        let assembled = self.assembler.assemble(course_title, &units).await?;
        let set = StoredQuestionSet {
            questions: assembled.questions,
            duration_minutes: assembled.duration_minutes,
        };

        // A concurrent scheduler may have claimed the bank first; its set wins.
        self.store.claim_question_set(course_id, &set).await
    }

    pub async fn get_exam(&self, exam_id: Uuid) -> Result<ExamSchedule> {
        self.store
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    async fn get_owned_exam(&self, exam_id: Uuid, user_id: Uuid) -> Result<ExamSchedule> {
        let exam = self.get_exam(exam_id).await?;
        if exam.user_id != user_id {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        Ok(exam)
    }

    pub async fn start_exam(&self, exam_id: Uuid, user_id: Uuid) -> Result<ExamSchedule> {
        let exam = self.get_owned_exam(exam_id, user_id).await?;
        self.transition(exam, ExamStatus::InProgress, None).await
    }

    pub async fn submit_exam(
        &self,
        exam_id: Uuid,
        user_id: Uuid,
        answers: &[ExamAnswer],
    ) -> Result<ExamSchedule> {
        let exam = self.get_owned_exam(exam_id, user_id).await?;
        let outcome = GradingService::grade(&exam.questions, answers, self.passing_score);
        tracing::info!(
            %exam_id,
            score = outcome.score,
            percentage = outcome.percentage,
            passed = outcome.passed,
            "Exam graded"
        );
        self.transition(exam, ExamStatus::Completed, Some(outcome)).await
    }

    async fn transition(
        &self,
        exam: ExamSchedule,
        to: ExamStatus,
        outcome: Option<crate::models::exam::ExamOutcome>,
    ) -> Result<ExamSchedule> {
        if !exam.status.can_transition_to(to) {
            return Err(Error::InvalidTransition(format!(
                "cannot move exam from {} to {}",
                exam.status, to
            )));
        }
        self.store
            .transition_exam(exam.id, exam.status, to, outcome)
            .await?
            .ok_or_else(|| {
                Error::InvalidTransition(format!("exam is no longer {}", exam.status))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_store::MemoryExamStore;
    use crate::services::ai_service::MockGenerativeClient;
    use crate::services::exam_assembler::{exam_duration_minutes, AssemblySettings};
    use crate::services::fallback_service::FallbackBank;
    use crate::services::question_generator::QuestionGenerator;

    fn service(client: MockGenerativeClient, store: &MemoryExamStore) -> ExamService {
        let assembler = ExamAssembler::new(
            QuestionGenerator::new(Arc::new(client)),
            QuestionValidator::default(),
            AssemblySettings { min_questions: 10, max_questions: 60 },
        );
        ExamService::new(Arc::new(store.clone()), assembler, 70.0)
    }

    fn ready_course(store: &MemoryExamStore, user: Uuid, topics: usize) -> Uuid {
        let course = store.add_course("Astronomy");
        for i in 0..topics {
            store.add_topic(course, &format!("Topic {}", i), Some("Stars fuse hydrogen."), None);
        }
        store.enroll(user, course);
        store.complete_course(user, course);
        course
    }

    fn generated(n: usize) -> String {
        let questions: Vec<_> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "question": format!("q{i} star{i}x fusion{i}y hydrogen{i}z?", i = i),
                    "options": ["a", "b", "c", "d"],
                    "correctAnswer": 2
                })
            })
            .collect();
        serde_json::json!({ "questions": questions }).to_string()
    }

    #[tokio::test]
    async fn incomplete_topics_block_scheduling_without_generation() {
        let store = MemoryExamStore::new();
        let user = Uuid::new_v4();
        let course = store.add_course("Astronomy");
        let first = store.add_topic(course, "One", Some("text"), None);
        store.add_topic(course, "Two", Some("text"), None);
        store.add_topic(course, "Three", Some("text"), None);
        store.enroll(user, course);
        store.complete_topic(user, first);

        let mut client = MockGenerativeClient::new();
        client.expect_generate().never();

        let err = service(client, &store).schedule_exam(user, course, None).await.unwrap_err();
        assert!(matches!(err, Error::TopicsIncomplete { completed: 1, total: 3 }));
        assert!(err.to_string().contains("1/3"));
    }

    #[tokio::test]
    async fn unenrolled_user_is_rejected() {
        let store = MemoryExamStore::new();
        let course = store.add_course("Astronomy");
        let mut client = MockGenerativeClient::new();
        client.expect_generate().never();

        let err = service(client, &store)
            .schedule_exam(Uuid::new_v4(), course, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotEnrolled));
    }

    #[tokio::test]
    async fn course_without_content_fails_with_no_content() {
        let store = MemoryExamStore::new();
        let user = Uuid::new_v4();
        let course = store.add_course("Astronomy");
        store.add_topic(course, "Silent", None, None);
        store.enroll(user, course);
        store.complete_course(user, course);

        let mut client = MockGenerativeClient::new();
        client.expect_generate().never();

        let err = service(client, &store).schedule_exam(user, course, None).await.unwrap_err();
        assert!(matches!(err, Error::NoContentAvailable(_)));
    }

    #[tokio::test]
    async fn reuses_stored_question_set_verbatim() {
        let store = MemoryExamStore::new();
        let user = Uuid::new_v4();
        let course = ready_course(&store, user, 2);
        let bank = FallbackBank.generate("Astronomy", 12);
        store.set_question_set(
            course,
            StoredQuestionSet { questions: bank.clone(), duration_minutes: 42 },
        );

        let mut client = MockGenerativeClient::new();
        client.expect_generate().never();

        let exam = service(client, &store).schedule_exam(user, course, None).await.unwrap();
        assert_eq!(exam.questions, bank);
        assert_eq!(exam.duration_minutes, 42);
        assert_eq!(exam.status, ExamStatus::Scheduled);
    }

    #[tokio::test]
    async fn malformed_stored_set_is_regenerated() {
        let store = MemoryExamStore::new();
        let user = Uuid::new_v4();
        let course = ready_course(&store, user, 1);
        let mut broken = FallbackBank.generate("Astronomy", 2);
        broken[1].question = "  ".to_string();
        store.set_question_set(course, StoredQuestionSet { questions: broken, duration_minutes: 30 });

        let mut client = MockGenerativeClient::new();
        client.expect_generate().times(1).returning(|_| Ok(generated(10)));

        let exam = service(client, &store).schedule_exam(user, course, None).await.unwrap();
        assert_eq!(exam.questions.len(), 10);
    }

    #[tokio::test]
    async fn second_schedule_reuses_first_generation() {
        let store = MemoryExamStore::new();
        let first_user = Uuid::new_v4();
        let second_user = Uuid::new_v4();
        let course = ready_course(&store, first_user, 1);
        store.enroll(second_user, course);
        store.complete_course(second_user, course);

        let mut client = MockGenerativeClient::new();
        client.expect_generate().times(1).returning(|_| Ok(generated(10)));
        let svc = service(client, &store);

        let first = svc.schedule_exam(first_user, course, None).await.unwrap();
        let second = svc.schedule_exam(second_user, course, None).await.unwrap();

        assert_eq!(first.questions.len(), 10);
        assert_eq!(first.duration_minutes, exam_duration_minutes(10));
        assert_eq!(second.questions, first.questions);
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn lifecycle_runs_scheduled_in_progress_completed() {
        let store = MemoryExamStore::new();
        let user = Uuid::new_v4();
        let course = ready_course(&store, user, 1);
        let bank = FallbackBank.generate("Astronomy", 10);
        store.set_question_set(course, StoredQuestionSet { questions: bank.clone(), duration_minutes: 30 });

        let mut client = MockGenerativeClient::new();
        client.expect_generate().never();
        let svc = service(client, &store);

        let exam = svc.schedule_exam(user, course, None).await.unwrap();

        let err = svc.submit_exam(exam.id, user, &[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));

        let started = svc.start_exam(exam.id, user).await.unwrap();
        assert_eq!(started.status, ExamStatus::InProgress);
        assert!(started.started_at.is_some());

        let answers: Vec<ExamAnswer> = bank
            .iter()
            .enumerate()
            .take(8)
            .map(|(i, q)| ExamAnswer { question_index: i, selected: q.correct_answer_index })
            .collect();
        let done = svc.submit_exam(exam.id, user, &answers).await.unwrap();
        assert_eq!(done.status, ExamStatus::Completed);
        assert_eq!(done.score, Some(8));
        assert_eq!(done.passed, Some(true));

        let err = svc.start_exam(exam.id, user).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn other_users_cannot_touch_an_exam() {
        let store = MemoryExamStore::new();
        let user = Uuid::new_v4();
        let course = ready_course(&store, user, 1);
        store.set_question_set(
            course,
            StoredQuestionSet { questions: FallbackBank.generate("Astronomy", 5), duration_minutes: 30 },
        );
        let mut client = MockGenerativeClient::new();
        client.expect_generate().never();
        let svc = service(client, &store);

        let exam = svc.schedule_exam(user, course, None).await.unwrap();
        let err = svc.start_exam(exam.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

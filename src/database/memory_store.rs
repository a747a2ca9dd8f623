use crate::database::exam_store::ExamStore;
use crate::error::{Error, Result};
use crate::models::course::{Course, TopicProgress};
use crate::models::exam::{ExamOutcome, ExamSchedule, ExamStatus, NewExamSchedule, StoredQuestionSet};
use crate::models::question::CandidateQuestion;
use crate::models::topic::Topic;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    courses: HashMap<Uuid, Course>,
    topics: Vec<Topic>,
    enrollments: HashSet<(Uuid, Uuid)>,
    completed_topics: HashSet<(Uuid, Uuid)>,
    banks: HashMap<Uuid, StoredQuestionSet>,
    exams: HashMap<Uuid, ExamSchedule>,
}

/// Process-local store with the same semantics as [`PgExamStore`](super::exam_store::PgExamStore).
/// Suited to embedding and tests; nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryExamStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory store mutex poisoned".to_string()))
    }

    /// Seeding never drops a write; a poisoned guard is recovered.
    fn seed(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_course(&self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.seed().courses.insert(
            id,
            Course {
                id,
                title: title.to_string(),
                description: None,
                created_at: Some(Utc::now()),
            },
        );
        id
    }

    pub fn add_topic(
        &self,
        course_id: Uuid,
        title: &str,
        transcript: Option<&str>,
        notes: Option<&str>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.seed();
        let position = state.topics.iter().filter(|t| t.course_id == course_id).count() as i32;
        state.topics.push(Topic {
            id,
            course_id,
            title: title.to_string(),
            position,
            transcript: transcript.map(String::from),
            notes: notes.map(String::from),
            quiz_questions: None,
        });
        id
    }

    pub fn enroll(&self, user_id: Uuid, course_id: Uuid) {
        self.seed().enrollments.insert((user_id, course_id));
    }

    pub fn complete_topic(&self, user_id: Uuid, topic_id: Uuid) {
        self.seed().completed_topics.insert((user_id, topic_id));
    }

    pub fn complete_course(&self, user_id: Uuid, course_id: Uuid) {
        let mut state = self.seed();
        let ids: Vec<Uuid> = state
            .topics
            .iter()
            .filter(|t| t.course_id == course_id)
            .map(|t| t.id)
            .collect();
        state.completed_topics.extend(ids.into_iter().map(|id| (user_id, id)));
    }

    pub fn set_question_set(&self, course_id: Uuid, set: StoredQuestionSet) {
        self.seed().banks.insert(course_id, set);
    }
}

#[async_trait]
impl ExamStore for MemoryExamStore {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>> {
        Ok(self.lock()?.courses.get(&course_id).cloned())
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool> {
        Ok(self.lock()?.enrollments.contains(&(user_id, course_id)))
    }

    async fn topic_progress(&self, user_id: Uuid, course_id: Uuid) -> Result<TopicProgress> {
        let state = self.lock()?;
        let topics: Vec<&Topic> = state.topics.iter().filter(|t| t.course_id == course_id).collect();
        let completed = topics
            .iter()
            .filter(|t| state.completed_topics.contains(&(user_id, t.id)))
            .count();
        Ok(TopicProgress {
            completed: completed as i64,
            total: topics.len() as i64,
        })
    }

    async fn list_topics(&self, course_id: Uuid) -> Result<Vec<Topic>> {
        let state = self.lock()?;
        let mut topics: Vec<Topic> = state
            .topics
            .iter()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect();
        topics.sort_by_key(|t| t.position);
        Ok(topics)
    }

    async fn find_topic(&self, topic_id: Uuid) -> Result<Option<Topic>> {
        Ok(self.lock()?.topics.iter().find(|t| t.id == topic_id).cloned())
    }

    async fn save_topic_quiz(&self, topic_id: Uuid, questions: &[CandidateQuestion]) -> Result<()> {
        let questions_json = serde_json::to_value(questions)?;
        let mut state = self.lock()?;
        let topic = state
            .topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or_else(|| Error::NotFound("Topic not found".to_string()))?;
        topic.quiz_questions = Some(questions_json);
        Ok(())
    }

    async fn find_question_set(&self, course_id: Uuid) -> Result<Option<StoredQuestionSet>> {
        let state = self.lock()?;
        if let Some(bank) = state.banks.get(&course_id) {
            return Ok(Some(bank.clone()));
        }
        let earliest = state
            .exams
            .values()
            .filter(|e| e.course_id == course_id && !e.questions.is_empty())
            .min_by_key(|e| e.scheduled_at)
            .map(|e| StoredQuestionSet {
                questions: e.questions.clone(),
                duration_minutes: e.duration_minutes,
            });
        Ok(earliest)
    }

    async fn discard_question_set(&self, course_id: Uuid) -> Result<()> {
        self.lock()?.banks.remove(&course_id);
        Ok(())
    }

    async fn claim_question_set(
        &self,
        course_id: Uuid,
        set: &StoredQuestionSet,
    ) -> Result<StoredQuestionSet> {
        let mut state = self.lock()?;
        Ok(state.banks.entry(course_id).or_insert_with(|| set.clone()).clone())
    }

    async fn insert_exam(&self, exam: NewExamSchedule) -> Result<ExamSchedule> {
        let record = ExamSchedule {
            id: Uuid::new_v4(),
            course_id: exam.course_id,
            user_id: exam.user_id,
            scheduled_at: exam.scheduled_at,
            duration_minutes: exam.duration_minutes,
            questions: exam.questions,
            status: ExamStatus::Scheduled,
            score: None,
            percentage: None,
            passed: None,
            started_at: None,
            completed_at: None,
        };
        self.lock()?.exams.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_exam(&self, exam_id: Uuid) -> Result<Option<ExamSchedule>> {
        Ok(self.lock()?.exams.get(&exam_id).cloned())
    }

    async fn transition_exam(
        &self,
        exam_id: Uuid,
        from: ExamStatus,
        to: ExamStatus,
        outcome: Option<ExamOutcome>,
    ) -> Result<Option<ExamSchedule>> {
        let mut state = self.lock()?;
        let Some(exam) = state.exams.get_mut(&exam_id) else {
            return Ok(None);
        };
        if exam.status != from {
            return Ok(None);
        }

        let now = Utc::now();
        exam.status = to;
        match to {
            ExamStatus::InProgress => {
                exam.started_at.get_or_insert(now);
            }
            ExamStatus::Completed => exam.completed_at = Some(now),
            ExamStatus::Scheduled => {}
        }
        if let Some(o) = outcome {
            exam.score = Some(o.score);
            exam.percentage = Some(o.percentage);
            exam.passed = Some(o.passed);
        }
        Ok(Some(exam.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fallback_service::FallbackBank;
    use tokio_test::{assert_ok, block_on};

    fn set(title: &str, n: usize) -> StoredQuestionSet {
        StoredQuestionSet {
            questions: FallbackBank.generate(title, n),
            duration_minutes: 30,
        }
    }

    #[test]
    fn first_claim_wins() {
        let store = MemoryExamStore::new();
        let course = store.add_course("History");

        let first = assert_ok!(block_on(store.claim_question_set(course, &set("Rome", 3))));
        let second = assert_ok!(block_on(store.claim_question_set(course, &set("Greece", 5))));

        assert_eq!(second, first);
        assert_eq!(second.questions.len(), 3);
    }

    #[test]
    fn discarded_bank_can_be_reclaimed() {
        let store = MemoryExamStore::new();
        let course = store.add_course("History");
        store.set_question_set(course, set("Rome", 3));

        assert_ok!(block_on(store.discard_question_set(course)));
        assert_eq!(assert_ok!(block_on(store.find_question_set(course))), None);

        let claimed = assert_ok!(block_on(store.claim_question_set(course, &set("Greece", 5))));
        assert_eq!(claimed.questions.len(), 5);
    }

    #[test]
    fn transition_only_applies_from_expected_state() {
        let store = MemoryExamStore::new();
        let course = store.add_course("History");
        let exam = assert_ok!(block_on(store.insert_exam(NewExamSchedule {
            course_id: course,
            user_id: Uuid::new_v4(),
            scheduled_at: Utc::now(),
            duration_minutes: 30,
            questions: set("Rome", 2).questions,
        })));

        let moved = assert_ok!(block_on(store.transition_exam(
            exam.id,
            ExamStatus::InProgress,
            ExamStatus::Completed,
            None,
        )));
        assert!(moved.is_none());

        let moved = assert_ok!(block_on(store.transition_exam(
            exam.id,
            ExamStatus::Scheduled,
            ExamStatus::InProgress,
            None,
        )));
        assert_eq!(moved.map(|e| e.status), Some(ExamStatus::InProgress));
    }

    #[test]
    fn seeding_survives_a_poisoned_lock() {
        let store = MemoryExamStore::new();
        let shared = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.state.lock().unwrap();
            panic!("poison the store");
        })
        .join();
        assert!(store.state.is_poisoned());

        let course = store.add_course("History");
        let topic = store.add_topic(course, "Rome", Some("text"), None);

        let state = store.seed();
        assert!(state.courses.contains_key(&course));
        assert!(state.topics.iter().any(|t| t.id == topic && t.course_id == course));
    }

    #[test]
    fn progress_counts_only_the_users_completed_topics() {
        let store = MemoryExamStore::new();
        let user = Uuid::new_v4();
        let course = store.add_course("History");
        let first = store.add_topic(course, "Rome", Some("text"), None);
        store.add_topic(course, "Greece", Some("text"), None);
        store.complete_topic(user, first);
        store.complete_topic(Uuid::new_v4(), first);

        let progress = assert_ok!(block_on(store.topic_progress(user, course)));
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total, 2);
        assert!(!progress.is_complete());
    }
}

use crate::error::Result;
use crate::models::course::{Course, TopicProgress};
use crate::models::exam::{
    ExamOutcome, ExamSchedule, ExamScheduleRow, ExamStatus, NewExamSchedule, StoredQuestionSet,
};
use crate::models::question::CandidateQuestion;
use crate::models::topic::Topic;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Persistence needed by quiz generation and exam scheduling.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>>;

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool>;

    async fn topic_progress(&self, user_id: Uuid, course_id: Uuid) -> Result<TopicProgress>;

    async fn list_topics(&self, course_id: Uuid) -> Result<Vec<Topic>>;

    async fn find_topic(&self, topic_id: Uuid) -> Result<Option<Topic>>;

    async fn save_topic_quiz(&self, topic_id: Uuid, questions: &[CandidateQuestion]) -> Result<()>;

    /// A previously generated, parseable question set for the course, if any.
    async fn find_question_set(&self, course_id: Uuid) -> Result<Option<StoredQuestionSet>>;

    /// Drops the course bank so the next claim can replace it.
    async fn discard_question_set(&self, course_id: Uuid) -> Result<()>;

    /// Stores `set` as the course bank unless one already exists; returns the bank in effect.
    async fn claim_question_set(
        &self,
        course_id: Uuid,
        set: &StoredQuestionSet,
    ) -> Result<StoredQuestionSet>;

    async fn insert_exam(&self, exam: NewExamSchedule) -> Result<ExamSchedule>;

    async fn find_exam(&self, exam_id: Uuid) -> Result<Option<ExamSchedule>>;

    /// Moves an exam from `from` to `to` if it is still in `from`.
    /// Returns `None` when the exam was not in the expected state.
    async fn transition_exam(
        &self,
        exam_id: Uuid,
        from: ExamStatus,
        to: ExamStatus,
        outcome: Option<ExamOutcome>,
    ) -> Result<Option<ExamSchedule>>;
}

#[derive(Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EXAM_COLUMNS: &str = r#"id, course_id, user_id, scheduled_at, duration_minutes, questions,
    status, score, percentage, passed, started_at, completed_at, created_at"#;

fn decode_question_set(questions: JsonValue, duration_minutes: i32) -> Option<StoredQuestionSet> {
    match serde_json::from_value::<Vec<CandidateQuestion>>(questions) {
        Ok(questions) => Some(StoredQuestionSet {
            questions,
            duration_minutes: duration_minutes.max(0) as u32,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed stored question set");
            None
        }
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"SELECT id, title, description, created_at FROM courses WHERE id = $1"#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM enrollments WHERE user_id = $1 AND course_id = $2"#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn topic_progress(&self, user_id: Uuid, course_id: Uuid) -> Result<TopicProgress> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(t.id) AS total,
                COUNT(p.topic_id) FILTER (WHERE p.completed) AS completed
            FROM topics t
            LEFT JOIN topic_progress p ON p.topic_id = t.id AND p.user_id = $1
            WHERE t.course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TopicProgress {
            completed: row.try_get("completed")?,
            total: row.try_get("total")?,
        })
    }

    async fn list_topics(&self, course_id: Uuid) -> Result<Vec<Topic>> {
        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT id, course_id, title, position, transcript, notes, quiz_questions
            FROM topics
            WHERE course_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(topics)
    }

    async fn find_topic(&self, topic_id: Uuid) -> Result<Option<Topic>> {
        let topic = sqlx::query_as::<_, Topic>(
            r#"SELECT id, course_id, title, position, transcript, notes, quiz_questions FROM topics WHERE id = $1"#,
        )
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(topic)
    }

    async fn save_topic_quiz(&self, topic_id: Uuid, questions: &[CandidateQuestion]) -> Result<()> {
        let questions_json = serde_json::to_value(questions)?;
        sqlx::query(r#"UPDATE topics SET quiz_questions = $1, updated_at = NOW() WHERE id = $2"#)
            .bind(questions_json)
            .bind(topic_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_question_set(&self, course_id: Uuid) -> Result<Option<StoredQuestionSet>> {
        let bank = sqlx::query(
            r#"SELECT questions, duration_minutes FROM course_question_banks WHERE course_id = $1"#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = bank {
            match decode_question_set(row.try_get("questions")?, row.try_get("duration_minutes")?) {
                Some(set) => return Ok(Some(set)),
                None => self.discard_question_set(course_id).await?,
            }
        }

        // Exams scheduled before banks existed.
        let rows = sqlx::query(
            r#"
            SELECT questions, duration_minutes FROM exam_schedules
            WHERE course_id = $1
              AND jsonb_typeof(questions) = 'array'
              AND jsonb_array_length(questions) > 0
            ORDER BY created_at ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            if let Some(set) = decode_question_set(row.try_get("questions")?, row.try_get("duration_minutes")?) {
                return Ok(Some(set));
            }
        }
        Ok(None)
    }

    async fn discard_question_set(&self, course_id: Uuid) -> Result<()> {
        sqlx::query(r#"DELETE FROM course_question_banks WHERE course_id = $1"#)
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn claim_question_set(
        &self,
        course_id: Uuid,
        set: &StoredQuestionSet,
    ) -> Result<StoredQuestionSet> {
        let questions_json = serde_json::to_value(&set.questions)?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO course_question_banks (course_id, questions, duration_minutes)
            VALUES ($1, $2, $3)
            ON CONFLICT (course_id) DO NOTHING
            RETURNING course_id
            "#,
        )
        .bind(course_id)
        .bind(questions_json)
        .bind(set.duration_minutes as i32)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(set.clone());
        }

        tracing::info!(%course_id, "Question bank already claimed, adopting stored set");
        let row = sqlx::query(
            r#"SELECT questions, duration_minutes FROM course_question_banks WHERE course_id = $1"#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        let stored = decode_question_set(row.try_get("questions")?, row.try_get("duration_minutes")?);
        Ok(stored.unwrap_or_else(|| set.clone()))
    }

    async fn insert_exam(&self, exam: NewExamSchedule) -> Result<ExamSchedule> {
        let questions_json = serde_json::to_value(&exam.questions)?;
        let row = sqlx::query_as::<_, ExamScheduleRow>(&format!(
            r#"
            INSERT INTO exam_schedules (course_id, user_id, scheduled_at, duration_minutes, questions, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            EXAM_COLUMNS
        ))
        .bind(exam.course_id)
        .bind(exam.user_id)
        .bind(exam.scheduled_at)
        .bind(exam.duration_minutes as i32)
        .bind(questions_json)
        .bind(ExamStatus::Scheduled.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_exam(&self, exam_id: Uuid) -> Result<Option<ExamSchedule>> {
        let row = sqlx::query_as::<_, ExamScheduleRow>(&format!(
            "SELECT {} FROM exam_schedules WHERE id = $1",
            EXAM_COLUMNS
        ))
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ExamSchedule::try_from).transpose()
    }

    async fn transition_exam(
        &self,
        exam_id: Uuid,
        from: ExamStatus,
        to: ExamStatus,
        outcome: Option<ExamOutcome>,
    ) -> Result<Option<ExamSchedule>> {
        let row = sqlx::query_as::<_, ExamScheduleRow>(&format!(
            r#"
            UPDATE exam_schedules
            SET status = $3,
                started_at = CASE WHEN $3 = 'IN_PROGRESS' THEN COALESCE(started_at, NOW()) ELSE started_at END,
                completed_at = CASE WHEN $3 = 'COMPLETED' THEN NOW() ELSE completed_at END,
                score = COALESCE($4, score),
                percentage = COALESCE($5, percentage),
                passed = COALESCE($6, passed)
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            EXAM_COLUMNS
        ))
        .bind(exam_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(outcome.map(|o| o.score))
        .bind(outcome.map(|o| o.percentage))
        .bind(outcome.map(|o| o.passed))
        .fetch_optional(&self.pool)
        .await?;
        row.map(ExamSchedule::try_from).transpose()
    }
}

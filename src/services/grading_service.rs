use crate::dto::exam_dto::ExamAnswer;
use crate::models::exam::ExamOutcome;
use crate::models::question::CandidateQuestion;
use std::collections::HashMap;

pub struct GradingService;

impl GradingService {
    /// One point per correctly answered question; later answers to the same
    /// question replace earlier ones.
    pub fn grade(questions: &[CandidateQuestion], answers: &[ExamAnswer], passing_score: f64) -> ExamOutcome {
        let selected: HashMap<usize, u8> = answers
            .iter()
            .map(|a| (a.question_index, a.selected))
            .collect();

        let score = questions
            .iter()
            .enumerate()
            .filter(|(idx, q)| selected.get(idx) == Some(&q.correct_answer_index))
            .count() as i32;

        let percentage = if questions.is_empty() {
            0.0
        } else {
            (score as f64 / questions.len() as f64) * 100.0
        };

        ExamOutcome {
            score,
            percentage,
            passed: percentage >= passing_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fallback_service::FallbackBank;

    fn answer(question_index: usize, selected: u8) -> ExamAnswer {
        ExamAnswer { question_index, selected }
    }

    #[test]
    fn scores_correct_answers_and_applies_threshold() {
        let questions = FallbackBank.generate("Geometry", 4);
        let answers: Vec<_> = questions
            .iter()
            .enumerate()
            .take(3)
            .map(|(i, q)| answer(i, q.correct_answer_index))
            .collect();

        let outcome = GradingService::grade(&questions, &answers, 70.0);
        assert_eq!(outcome.score, 3);
        assert!((outcome.percentage - 75.0).abs() < f64::EPSILON);
        assert!(outcome.passed);

        let outcome = GradingService::grade(&questions, &answers, 80.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn last_answer_wins_and_out_of_range_is_wrong() {
        let questions = FallbackBank.generate("Geometry", 2);
        let right = questions[0].correct_answer_index;
        let wrong = (right + 1) % 4;
        let answers = vec![answer(0, right), answer(0, wrong), answer(1, 9), answer(7, 0)];

        let outcome = GradingService::grade(&questions, &answers, 50.0);
        assert_eq!(outcome.score, 0);
        assert!(!outcome.passed);
    }

    #[test]
    fn empty_exam_scores_zero() {
        let outcome = GradingService::grade(&[], &[], 70.0);
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.percentage, 0.0);
        assert!(!outcome.passed);
    }
}

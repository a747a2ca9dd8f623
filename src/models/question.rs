use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const OPTION_COUNT: usize = 4;

pub const DEFAULT_EXPLANATION: &str =
    "Based on the academic content presented in the course material.";

/// A multiple-choice question with exactly four options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateQuestion {
    pub question: String,
    #[schema(value_type = Vec<String>)]
    pub options: [String; OPTION_COUNT],
    pub correct_answer_index: u8,
    #[serde(default = "default_explanation")]
    pub explanation: String,
}

fn default_explanation() -> String {
    DEFAULT_EXPLANATION.to_string()
}

impl CandidateQuestion {
    pub fn is_well_formed(&self) -> bool {
        !self.question.trim().is_empty() && (self.correct_answer_index as usize) < OPTION_COUNT
    }

    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_answer_index as usize % OPTION_COUNT]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_and_defaults_explanation() {
        let q: CandidateQuestion = serde_json::from_value(serde_json::json!({
            "question": "Which gas do plants absorb?",
            "options": ["Oxygen", "Carbon dioxide", "Nitrogen", "Helium"],
            "correctAnswerIndex": 1
        }))
        .unwrap();

        assert_eq!(q.correct_option(), "Carbon dioxide");
        assert_eq!(q.explanation, DEFAULT_EXPLANATION);
        assert!(q.is_well_formed());
    }

    #[test]
    fn rejects_wrong_option_count_at_deserialization() {
        let res: Result<CandidateQuestion, _> = serde_json::from_value(serde_json::json!({
            "question": "Q?",
            "options": ["a", "b", "c"],
            "correctAnswerIndex": 0
        }));
        assert!(res.is_err());
    }
}

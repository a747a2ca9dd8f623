use crate::models::question::{CandidateQuestion, DEFAULT_EXPLANATION, OPTION_COUNT};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;

// Near-duplicate thresholds. Empirical, tune freely.
pub const MIN_SIMILARITY_LEN: usize = 20;
pub const MIN_LENGTH_RATIO: f64 = 0.8;
pub const MIN_WORD_OVERLAP: f64 = 0.7;
pub const MIN_SIGNIFICANT_WORD_LEN: usize = 3;
pub const PREFIX_WORDS: usize = 12;
pub const MIN_PREFIX_CHARS: usize = 30;

/// Decides whether question text leaks presentation artifacts.
pub trait ContentFilter: Send + Sync {
    fn is_unsafe_content(&self, text: &str) -> bool;
}

const INSTRUCTOR_TERMS: &[&str] = &[
    "lecturer",
    "instructor",
    "presenter",
    "speaker",
    "narrator",
    "the teacher",
    "the professor",
    "the host",
];

const FIRST_PERSON_TERMS: &[&str] = &[
    "i think",
    "i believe",
    "i feel",
    "my experience",
    "in my opinion",
    "i personally",
    "as i mentioned",
    "as i said",
    "my story",
];

const PLATFORM_TERMS: &[&str] = &[
    "youtube",
    "subscribe",
    "playlist",
    "this channel",
    "my channel",
    "like button",
    "comment below",
    "notification bell",
    "video description",
];

const META_TERMS: &[&str] = &[
    "welcome back",
    "thanks for watching",
    "thank you for watching",
    "in this video",
    "in today's video",
    "in this lecture",
    "in this session",
    "in the next video",
    "see you next time",
    "let's get started",
];

/// Flat keyword list over four categories.
#[derive(Debug, Clone)]
pub struct KeywordContentFilter {
    keywords: Vec<String>,
}

impl Default for KeywordContentFilter {
    fn default() -> Self {
        let keywords = INSTRUCTOR_TERMS
            .iter()
            .chain(FIRST_PERSON_TERMS)
            .chain(PLATFORM_TERMS)
            .chain(META_TERMS)
            .map(|k| k.to_string())
            .collect();
        Self { keywords }
    }
}

impl KeywordContentFilter {
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
        }
    }
}

impl ContentFilter for KeywordContentFilter {
    fn is_unsafe_content(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

#[derive(Clone)]
pub struct QuestionValidator {
    filter: Arc<dyn ContentFilter>,
}

impl Default for QuestionValidator {
    fn default() -> Self {
        Self::new(Arc::new(KeywordContentFilter::default()))
    }
}

impl QuestionValidator {
    pub fn new(filter: Arc<dyn ContentFilter>) -> Self {
        Self { filter }
    }

    /// Keeps candidates that are structurally valid, not duplicates of `existing`
    /// or of earlier survivors, and free of presentation artifacts.
    pub fn filter_candidates(&self, raw: &[JsonValue], existing: &[String]) -> Vec<CandidateQuestion> {
        let mut seen: Vec<String> = existing.to_vec();
        let mut accepted = Vec::new();
        let mut rejected = 0usize;

        for value in raw {
            let Some(candidate) = coerce_candidate(value) else {
                rejected += 1;
                continue;
            };
            if seen.iter().any(|s| is_duplicate(&candidate.question, s)) {
                rejected += 1;
                continue;
            }
            if self.is_unsafe(&candidate) {
                rejected += 1;
                continue;
            }
            seen.push(candidate.question.clone());
            accepted.push(candidate);
        }

        if rejected > 0 {
            tracing::debug!(accepted = accepted.len(), rejected, "Filtered generated questions");
        }
        accepted
    }

    fn is_unsafe(&self, candidate: &CandidateQuestion) -> bool {
        self.filter.is_unsafe_content(&candidate.question)
    }

    /// A stored set is reusable only when it is non-empty and every entry is valid.
    pub fn is_well_formed_set(questions: &[CandidateQuestion]) -> bool {
        !questions.is_empty() && questions.iter().all(CandidateQuestion::is_well_formed)
    }
}

/// Structural gate: non-empty text, four options, integer answer index in range.
pub fn coerce_candidate(value: &JsonValue) -> Option<CandidateQuestion> {
    let question = value.get("question")?.as_str()?.trim();
    if question.is_empty() {
        return None;
    }

    let options = value.get("options")?.as_array()?;
    if options.len() != OPTION_COUNT {
        return None;
    }
    let options: Vec<String> = options
        .iter()
        .map(|o| match o {
            JsonValue::String(s) => Some(s.trim().to_string()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    let options: [String; OPTION_COUNT] = options.try_into().ok()?;

    let index = ["correctAnswer", "correctAnswerIndex", "correct_answer"]
        .iter()
        .find_map(|k| value.get(*k))?
        .as_i64()?;
    if !(0..OPTION_COUNT as i64).contains(&index) {
        return None;
    }

    let explanation = value
        .get("explanation")
        .and_then(|e| e.as_str())
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EXPLANATION)
        .to_string();

    Some(CandidateQuestion {
        question: question.to_string(),
        options,
        correct_answer_index: index as u8,
        explanation,
    })
}

pub fn is_duplicate(a: &str, b: &str) -> bool {
    let na = a.trim().to_lowercase();
    let nb = b.trim().to_lowercase();

    na == nb || is_similar(&na, &nb) || shares_long_prefix(&na, &nb)
}

fn is_similar(a: &str, b: &str) -> bool {
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la <= MIN_SIMILARITY_LEN || lb <= MIN_SIMILARITY_LEN {
        return false;
    }
    let ratio = la.min(lb) as f64 / la.max(lb) as f64;
    if ratio <= MIN_LENGTH_RATIO {
        return false;
    }

    let words_a = significant_words(a);
    let words_b = significant_words(b);
    let smaller = words_a.len().min(words_b.len());
    if smaller == 0 {
        return false;
    }
    let shared = words_a.intersection(&words_b).count();
    shared as f64 / smaller as f64 >= MIN_WORD_OVERLAP
}

fn significant_words(text: &str) -> HashSet<&str> {
    text.split_whitespace()
        .filter(|w| w.chars().count() > MIN_SIGNIFICANT_WORD_LEN)
        .collect()
}

fn shares_long_prefix(a: &str, b: &str) -> bool {
    let prefix_a: Vec<&str> = a.split_whitespace().take(PREFIX_WORDS).collect();
    let prefix_b: Vec<&str> = b.split_whitespace().take(PREFIX_WORDS).collect();
    if prefix_a != prefix_b {
        return false;
    }
    prefix_a.join(" ").chars().count() > MIN_PREFIX_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(question: &str) -> JsonValue {
        json!({
            "question": question,
            "options": ["A", "B", "C", "D"],
            "correctAnswer": 1,
            "explanation": "Because."
        })
    }

    fn texts(qs: &[CandidateQuestion]) -> Vec<&str> {
        qs.iter().map(|q| q.question.as_str()).collect()
    }

    #[test]
    fn rejects_exact_duplicates_ignoring_case_and_whitespace() {
        let v = QuestionValidator::default();
        let out = v.filter_candidates(
            &[raw("What is osmosis?"), raw("  WHAT IS OSMOSIS?  ")],
            &[],
        );
        assert_eq!(texts(&out), vec!["What is osmosis?"]);
    }

    #[test]
    fn rejects_duplicates_of_existing_questions() {
        let v = QuestionValidator::default();
        let out = v.filter_candidates(&[raw("What is osmosis?")], &["what is osmosis?".to_string()]);
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_shared_twelve_word_prefix() {
        let a = "which of the following best explains why enzymes lose activity at very high temperatures in living cells";
        let b = "Which of the following best explains why enzymes lose activity at very high pH values, according to experiments?";
        assert!(shares_long_prefix(&a.to_lowercase(), &b.to_lowercase()));

        let v = QuestionValidator::default();
        let out = v.filter_candidates(&[raw(a), raw(b)], &[]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn short_shared_prefix_is_not_a_duplicate() {
        // Identical 12-token prefix, but only 23 characters long.
        let a = "a b c d e f g h i j k l m n";
        let b = "a b c d e f g h i j k l x y";
        assert!(!is_duplicate(a, b));
    }

    #[test]
    fn rejects_high_word_overlap_with_similar_length() {
        let a = "Explain how photosynthesis converts sunlight energy into chemical energy";
        let b = "Describe how photosynthesis converts sunlight energy into chemical energy";
        assert!(is_duplicate(a, b));
    }

    #[test]
    fn keeps_distinct_questions_with_different_lengths() {
        let a = "Explain how photosynthesis converts sunlight energy into chemical energy";
        let b = "Why photosynthesis matters for chemical energy";
        assert!(!is_duplicate(a, b));
    }

    #[test]
    fn rejects_presentation_artifacts_in_any_case() {
        let v = QuestionValidator::default();
        let out = v.filter_candidates(
            &[
                raw("In This Video, which process was described first?"),
                raw("What did the lecturer emphasise about mitosis?"),
                raw("Which YouTube feature was mentioned?"),
                raw("In my opinion, which theory is strongest?"),
                raw("Which organelle produces ATP?"),
            ],
            &[],
        );
        assert_eq!(texts(&out), vec!["Which organelle produces ATP?"]);
    }

    #[test]
    fn rejects_structurally_invalid_candidates() {
        let v = QuestionValidator::default();
        let candidates = vec![
            json!({"question": "Three options?", "options": ["a", "b", "c"], "correctAnswer": 0}),
            json!({"question": "Index four?", "options": ["a", "b", "c", "d"], "correctAnswer": 4}),
            json!({"question": "Negative?", "options": ["a", "b", "c", "d"], "correctAnswer": -1}),
            json!({"question": "Fractional?", "options": ["a", "b", "c", "d"], "correctAnswer": 1.5}),
            json!({"question": "   ", "options": ["a", "b", "c", "d"], "correctAnswer": 0}),
            json!({"options": ["a", "b", "c", "d"], "correctAnswer": 0}),
            json!({"question": "Missing index?", "options": ["a", "b", "c", "d"]}),
        ];
        assert!(v.filter_candidates(&candidates, &[]).is_empty());
    }

    #[test]
    fn fills_in_missing_explanation() {
        let v = QuestionValidator::default();
        let out = v.filter_candidates(
            &[json!({"question": "Q?", "options": ["a", "b", "c", "d"], "correctAnswerIndex": 3})],
            &[],
        );
        assert_eq!(out[0].explanation, DEFAULT_EXPLANATION);
        assert_eq!(out[0].correct_answer_index, 3);
    }

    #[test]
    fn content_filter_is_pluggable() {
        let v = QuestionValidator::new(Arc::new(KeywordContentFilter::with_keywords(["Banana"])));
        let out = v.filter_candidates(&[raw("Is a banana a berry?"), raw("In this video, what?")], &[]);
        assert_eq!(texts(&out), vec!["In this video, what?"]);
    }

    #[test]
    fn well_formed_set_requires_entries() {
        assert!(!QuestionValidator::is_well_formed_set(&[]));
        let q = coerce_candidate(&raw("Q?")).unwrap();
        assert!(QuestionValidator::is_well_formed_set(&[q]));
    }
}

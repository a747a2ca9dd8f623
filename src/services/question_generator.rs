use crate::error::GenerationError;
use crate::models::topic::ContentUnit;
use crate::services::ai_service::GenerativeClient;
use std::sync::Arc;

/// Per-topic content beyond this many characters is cut before prompting.
pub const MAX_TOPIC_CONTENT_CHARS: usize = 12_000;

/// Combined top-up prompts are cut at this many characters in total.
pub const MAX_COMBINED_CONTENT_CHARS: usize = 40_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Questions must cite facts stated in the supplied text. Topic quizzes.
    TranscriptGrounded,
    /// Academic, higher-order questions with no presentation artifacts. Final exams.
    ExamGrade,
}

const RESPONSE_SCHEMA: &str = r#"Respond with ONLY a JSON object of this exact shape, no markdown and no commentary:
{
  "questions": [
    {
      "question": "Question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 2,
      "explanation": "Why the option at index 2 is correct"
    }
  ],
  "passingScore": 70
}"#;

const TRANSCRIPT_RULES: &str = r#"You are an educational assessment writer creating a short quiz for one course topic.

Rules:
1. Every question MUST be answerable from facts explicitly stated in the material below. Do not use outside knowledge.
2. Each question has exactly 4 options and exactly one correct option.
3. "correctAnswer" is the zero-based index (0-3) of the correct option. Vary its position across questions.
4. Distractors must be plausible and drawn from the same subject area.
5. Avoid "All of the above" and "None of the above".
6. Keep each question self-contained and unambiguous."#;

const EXAM_RULES: &str = r#"You are a university examiner writing a rigorous final examination.

Rules:
1. Test subject knowledge only. NEVER mention or allude to the instructor, lecturer, presenter, speaker, the video, the channel, the platform, or any personal story, opinion or anecdote from the material.
2. Never write phrases like "in this video", "the lecturer said", "according to the presenter", "welcome back" or "subscribe".
3. Prefer higher-order reasoning: analysis, application, synthesis and evaluation. At most one in five questions may be pure recall.
4. Each question has exactly 4 options and exactly one correct option; distractors must be plausible to a student who has only partially mastered the topic.
5. "correctAnswer" is the zero-based index (0-3) of the correct option. Distribute it evenly across positions.
6. Do not repeat or lightly rephrase any question listed under "Existing questions".
7. Write in formal academic language. Each question must stand alone without reference to "the material"."#;

/// Builds prompts and forwards them to the injected generative backend.
///
/// Returns raw text only; parsing and validation happen downstream.
#[derive(Clone)]
pub struct QuestionGenerator {
    client: Arc<dyn GenerativeClient>,
}

impl QuestionGenerator {
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self { client }
    }

    pub async fn generate_for_topic(
        &self,
        unit: &ContentUnit,
        count: usize,
        kind: PromptKind,
    ) -> Result<String, GenerationError> {
        let prompt = build_topic_prompt(unit, count, kind);
        tracing::debug!(topic = %unit.topic_title, count, ?kind, "Requesting questions");
        self.client.generate(&prompt).await
    }

    pub async fn generate_combined(
        &self,
        course_title: &str,
        units: &[ContentUnit],
        existing: &[String],
        count: usize,
    ) -> Result<String, GenerationError> {
        let prompt = build_combined_prompt(course_title, units, existing, count);
        tracing::debug!(course = %course_title, count, "Requesting combined top-up questions");
        self.client.generate(&prompt).await
    }
}

pub fn build_topic_prompt(unit: &ContentUnit, count: usize, kind: PromptKind) -> String {
    let rules = match kind {
        PromptKind::TranscriptGrounded => TRANSCRIPT_RULES,
        PromptKind::ExamGrade => EXAM_RULES,
    };

    let mut prompt = format!(
        "{}\n\nGenerate exactly {} multiple-choice questions for the topic \"{}\".\n\n",
        rules, count, unit.topic_title
    );
    push_existing(&mut prompt, &unit.existing_question_texts);
    prompt.push_str("Material:\n\"\"\"\n");
    prompt.push_str(truncate_chars(&unit.content, MAX_TOPIC_CONTENT_CHARS));
    prompt.push_str("\n\"\"\"\n\n");
    prompt.push_str(RESPONSE_SCHEMA);
    prompt
}

pub fn build_combined_prompt(
    course_title: &str,
    units: &[ContentUnit],
    existing: &[String],
    count: usize,
) -> String {
    let mut prompt = format!(
        "{}\n\nGenerate exactly {} NEW multiple-choice questions for the final exam of the course \"{}\". Spread them across the topics below.\n\n",
        EXAM_RULES, count, course_title
    );
    push_existing(&mut prompt, existing);

    let per_topic_budget = MAX_COMBINED_CONTENT_CHARS / units.len().max(1);
    prompt.push_str("Material:\n");
    for (idx, unit) in units.iter().enumerate() {
        prompt.push_str(&format!(
            "\n### Topic {}: {}\n{}\n",
            idx + 1,
            unit.topic_title,
            truncate_chars(&unit.content, per_topic_budget.min(MAX_TOPIC_CONTENT_CHARS))
        ));
    }
    prompt.push('\n');
    prompt.push_str(RESPONSE_SCHEMA);
    prompt
}

fn push_existing(prompt: &mut String, existing: &[String]) {
    if existing.is_empty() {
        return;
    }
    prompt.push_str("Existing questions (do not duplicate):\n");
    for q in existing {
        prompt.push_str("- ");
        prompt.push_str(q);
        prompt.push('\n');
    }
    prompt.push('\n');
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

use crate::error::{Error, Result};
use crate::models::topic::{ContentUnit, Topic};

/// Transcript and notes of one topic joined into grounding text.
/// Empty when the topic has neither.
pub fn topic_content(topic: &Topic) -> String {
    let parts: Vec<&str> = [topic.transcript.as_deref(), topic.notes.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    parts.join("\n\n")
}

/// One content unit per topic that has something to ground questions on.
pub fn build_content_units(topics: &[Topic]) -> Vec<ContentUnit> {
    topics
        .iter()
        .filter_map(|topic| {
            let content = topic_content(topic);
            if content.is_empty() {
                tracing::debug!(topic = %topic.title, "Skipping topic without transcript or notes");
                return None;
            }
            Some(ContentUnit {
                topic_id: topic.id,
                topic_title: topic.title.clone(),
                content,
                existing_question_texts: topic.existing_question_texts(),
            })
        })
        .collect()
}

/// Like [`build_content_units`], but an empty result is a hard failure.
pub fn require_content_units(topics: &[Topic], scope: &str) -> Result<Vec<ContentUnit>> {
    let units = build_content_units(topics);
    if units.is_empty() {
        return Err(Error::NoContentAvailable(format!(
            "{} has no transcripts or notes to generate questions from",
            scope
        )));
    }
    Ok(units)
}

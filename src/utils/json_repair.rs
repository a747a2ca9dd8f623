use crate::error::ParseError;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

/// Questions payload recovered from a model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedPayload {
    pub questions: Vec<JsonValue>,
    pub passing_score: Option<f64>,
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([\]}])").expect("trailing comma pattern is valid"))
}

/// Best-effort cleanup of a free-text model response into a JSON object string.
///
/// Order matters: fences go first, then everything outside the outermost
/// braces, then trailing commas.
pub fn extract_json_payload(raw: &str) -> String {
    let unfenced = raw.replace("```json", "").replace("```", "");

    let sliced = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced.as_str(),
    };

    trailing_comma_re()
        .replace_all(sliced.trim(), "$1")
        .into_owned()
}

pub fn parse_generated_payload(raw: &str) -> Result<GeneratedPayload, ParseError> {
    let cleaned = extract_json_payload(raw);
    let value: JsonValue = serde_json::from_str(&cleaned)?;

    let obj = value.as_object().ok_or(ParseError::NotAnObject)?;
    let questions = obj
        .get("questions")
        .and_then(|q| q.as_array())
        .cloned()
        .ok_or(ParseError::MissingQuestions)?;
    let passing_score = obj.get("passingScore").and_then(|v| v.as_f64());

    Ok(GeneratedPayload {
        questions,
        passing_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{"questions":[{"question":"Q1","options":["a","b","c","d"],"correctAnswer":0}]}"#;

    #[test]
    fn malformed_fixtures_recover_one_question() {
        let fixtures: &[(&str, String)] = &[
            ("plain", CLEAN.to_string()),
            ("json fence", format!("```json\n{}\n```", CLEAN)),
            ("bare fence", format!("```\n{}\n```", CLEAN)),
            ("leading prose", format!("Here are your questions:\n{}", CLEAN)),
            ("trailing prose", format!("{}\nLet me know if you need more.", CLEAN)),
            ("prose and fence", format!("Sure!\n```json\n{}\n```\nDone.", CLEAN)),
            (
                "trailing comma in array",
                r#"{"questions":[{"question":"Q1","options":["a","b","c","d",],"correctAnswer":0}]}"#
                    .to_string(),
            ),
            (
                "trailing comma in object",
                r#"{"questions":[{"question":"Q1","options":["a","b","c","d"],"correctAnswer":0,},]}"#
                    .to_string(),
            ),
            (
                "trailing comma with whitespace",
                "{\"questions\":[{\"question\":\"Q1\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"correctAnswer\":0}\n ,\n ]\n}"
                    .to_string(),
            ),
        ];

        for (name, input) in fixtures {
            let payload = parse_generated_payload(input)
                .unwrap_or_else(|e| panic!("fixture '{}' failed: {}", name, e));
            assert_eq!(payload.questions.len(), 1, "fixture '{}'", name);
            assert_eq!(payload.questions[0]["question"], "Q1", "fixture '{}'", name);
        }
    }

    #[test]
    fn reads_optional_passing_score() {
        let payload =
            parse_generated_payload(r#"{"questions": [], "passingScore": 80}"#).unwrap();
        assert_eq!(payload.passing_score, Some(80.0));
        assert!(payload.questions.is_empty());

        let payload = parse_generated_payload(r#"{"questions": []}"#).unwrap();
        assert_eq!(payload.passing_score, None);
    }

    #[test]
    fn unrecoverable_inputs_fail() {
        assert!(matches!(
            parse_generated_payload("I could not generate questions."),
            Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_generated_payload(r#"{"questions": [ {"question": "Q1" "#),
            Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_generated_payload(r#"{"items": []}"#),
            Err(ParseError::MissingQuestions)
        ));
        assert!(matches!(
            parse_generated_payload("[1, 2, 3]"),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn slices_to_outermost_braces() {
        let cleaned = extract_json_payload("noise {\"a\": {\"b\": 1}} more noise");
        assert_eq!(cleaned, "{\"a\": {\"b\": 1}}");
    }
}

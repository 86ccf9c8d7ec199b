//! Report generation: prompt assembly, response extraction, normalization.
//!
//! The generative provider returns free-form text expected to contain a JSON
//! object. The payload is located with a balanced-bracket scan, parsed into
//! a raw wire shape, and normalized into a `GeneratedReport` with the derived
//! metrics recomputed locally. Provider-supplied counts are never trusted.

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{
    activated_areas, clamp_curiosity_index, overall_score_label, GeneratedReport, GrowthAreaKind,
    GrowthAreaObservation, GrowthRating, ReportGenerationInput,
};

/// Curiosity index used when the provider omits one.
const DEFAULT_CURIOSITY_INDEX: f64 = 5.0;

/// Build the generation prompt from the collected session input.
pub fn build_prompt(input: &ReportGenerationInput) -> String {
    let mut prompt = format!(
        "You are an early-childhood development observer writing a daily growth report.\n\
         Child: {} (age {})\nDate: {}\nTheme of the day: {}\n",
        input.child_name, input.child_age, input.date, input.theme
    );

    if let Some(seed) = &input.curiosity_seed {
        prompt.push_str(&format!("Curiosity seed explored: {}\n", seed));
    }
    if let Some(notes) = &input.observer_notes {
        prompt.push_str(&format!("\nObserver notes:\n{}\n", notes));
    }
    if let Some(ocr) = &input.ocr_text {
        prompt.push_str(&format!("\nText extracted from the child's work:\n{}\n", ocr));
    }
    if let Some(transcript) = &input.transcription {
        prompt.push_str(&format!("\nSession audio transcript:\n{}\n", transcript));
    }

    prompt.push_str(
        "\nAssess the child across these seven growth areas: Intellectual, Emotional, Social, \
         Creativity, Physical, Values, Independence.\n\
         Respond with a single JSON object, no surrounding prose, shaped exactly like:\n\
         {\n  \"growth_areas\": [\n    {\"area\": \"Intellectual\", \"rating\": \"excellent\", \
         \"observation\": \"...\", \"emoji\": \"\u{1F9E0}\"}\n  ],\n\
         \"curiosity_response_index\": 7.5,\n  \"parent_note\": \"...\"\n}\n\
         Ratings must be one of: excellent, good, fair, needs-work. \
         curiosity_response_index is a number from 1 to 10.",
    );

    prompt
}

/// Locate the first balanced `{...}` span in the provider's response text.
///
/// A greedy bracket scan, not a JSON parser; serde does the real validation
/// afterwards. No span at all means the response is unusable.
pub fn extract_json_span(text: &str) -> AppResult<&str> {
    let start = text.find('{').ok_or_else(|| {
        AppError::MalformedResponse("response contains no JSON object".to_string())
    })?;

    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Err(AppError::MalformedResponse(
        "response JSON object is unbalanced".to_string(),
    ))
}

/// Raw wire shape of the generated report payload, before validation.
#[derive(Debug, Deserialize)]
pub struct RawGeneratedReport {
    #[serde(default, alias = "growthAreas")]
    pub growth_areas: Vec<RawGrowthArea>,
    #[serde(default, alias = "curiosityResponseIndex")]
    pub curiosity_response_index: Option<f64>,
    #[serde(default, alias = "parentNote")]
    pub parent_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawGrowthArea {
    pub area: String,
    pub rating: String,
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// Parse the JSON span of a provider response into the raw wire shape.
pub fn parse_generated_report(response_text: &str) -> AppResult<RawGeneratedReport> {
    let span = extract_json_span(response_text)?;
    serde_json::from_str(span)
        .map_err(|e| AppError::MalformedResponse(format!("report payload did not parse: {}", e)))
}

/// Validate and normalize a raw payload into a `GeneratedReport`.
///
/// Rules:
/// - the observation set must be non-empty
/// - area and rating strings must match the known enumerations
/// - duplicate areas keep the first occurrence
/// - a missing emoji falls back to the area's default glyph
/// - with `strict_seven_areas`, all seven areas must be present
/// - `activated_areas`, `total_areas`, and `overall_score` are recomputed
/// - the curiosity index is clamped to [1, 10]
pub fn normalize_report(
    raw: RawGeneratedReport,
    input: &ReportGenerationInput,
    strict_seven_areas: bool,
) -> AppResult<GeneratedReport> {
    if raw.growth_areas.is_empty() {
        return Err(AppError::MalformedResponse(
            "report payload contains no growth areas".to_string(),
        ));
    }

    let mut seen: Vec<GrowthAreaKind> = Vec::new();
    let mut observations: Vec<GrowthAreaObservation> = Vec::new();

    for raw_area in raw.growth_areas {
        let area = GrowthAreaKind::parse(raw_area.area.trim()).ok_or_else(|| {
            AppError::MalformedResponse(format!("unknown growth area '{}'", raw_area.area))
        })?;
        let rating = parse_rating(&raw_area.rating).ok_or_else(|| {
            AppError::MalformedResponse(format!("unknown rating '{}'", raw_area.rating))
        })?;

        if seen.contains(&area) {
            tracing::debug!(area = %area, "Dropping duplicate growth area from provider");
            continue;
        }
        seen.push(area);

        let emoji = match raw_area.emoji {
            Some(e) if !e.trim().is_empty() => e,
            _ => area.default_emoji().to_string(),
        };

        observations.push(GrowthAreaObservation {
            area,
            rating,
            observation: raw_area.observation,
            emoji,
        });
    }

    if strict_seven_areas {
        let missing: Vec<&str> = GrowthAreaKind::ALL
            .iter()
            .filter(|a| !seen.contains(a))
            .map(|a| a.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MalformedResponse(format!(
                "report payload is missing growth areas: {}",
                missing.join(", ")
            )));
        }
    }

    let activated = activated_areas(&observations);
    let total = observations.len() as i32;
    let curiosity = clamp_curiosity_index(
        raw.curiosity_response_index
            .unwrap_or(DEFAULT_CURIOSITY_INDEX),
    );
    let parent_note = match raw.parent_note {
        Some(note) if !note.trim().is_empty() => note,
        _ => format!(
            "{} explored \"{}\" today and engaged across {} growth areas.",
            input.child_name, input.theme, activated
        ),
    };

    Ok(GeneratedReport {
        growth_areas: observations,
        curiosity_response_index: curiosity,
        activated_areas: activated,
        total_areas: total,
        parent_note,
        overall_score: overall_score_label(activated, total),
    })
}

/// Lenient rating parse: tolerates case and space/underscore separators.
fn parse_rating(s: &str) -> Option<GrowthRating> {
    let canonical = s.trim().to_lowercase().replace([' ', '_'], "-");
    GrowthRating::parse(&canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_input() -> ReportGenerationInput {
        ReportGenerationInput {
            child_name: "Maya".to_string(),
            child_age: "6".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
            theme: "Gardening".to_string(),
            curiosity_seed: Some("Why do leaves turn yellow?".to_string()),
            ocr_text: Some("I planted a seed".to_string()),
            transcription: None,
            observer_notes: Some("Very engaged outdoors".to_string()),
        }
    }

    fn raw(json: &str) -> RawGeneratedReport {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_prompt_includes_all_available_fields() {
        let prompt = build_prompt(&sample_input());
        assert!(prompt.contains("Maya"));
        assert!(prompt.contains("Gardening"));
        assert!(prompt.contains("Why do leaves turn yellow?"));
        assert!(prompt.contains("I planted a seed"));
        assert!(prompt.contains("Very engaged outdoors"));
        assert!(!prompt.contains("transcript:\n"));
    }

    #[test]
    fn test_extract_json_span_from_prose() {
        let text = "Here is the report:\n{\"a\": {\"b\": 1}} hope this helps";
        assert_eq!(extract_json_span(text).unwrap(), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_no_span_is_malformed_response() {
        assert!(matches!(
            extract_json_span("no json here"),
            Err(AppError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_json_span("unbalanced {\"a\": 1"),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_normalize_recomputes_metrics_and_fills_emoji() {
        let payload = raw(
            r#"{"growth_areas":[
                {"area":"Intellectual","rating":"excellent","observation":"counts to 100"},
                {"area":"Social","rating":"needs-work","observation":"kept to himself","emoji":"X"}
            ],"curiosity_response_index":42.0}"#,
        );
        let report = normalize_report(payload, &sample_input(), false).unwrap();

        assert_eq!(report.total_areas, 2);
        assert_eq!(report.activated_areas, 1);
        assert_eq!(report.curiosity_response_index, 10.0);
        assert_eq!(
            report.growth_areas[0].emoji,
            GrowthAreaKind::Intellectual.default_emoji()
        );
        assert_eq!(report.growth_areas[1].emoji, "X");
        // Parent note fallback mentions the child and theme
        assert!(report.parent_note.contains("Maya"));
        assert!(report.parent_note.contains("Gardening"));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let json = r#"{"growth_areas":[
            {"area":"Creativity","rating":"good","observation":"painted"},
            {"area":"Physical","rating":"needs-work","observation":"tired"}
        ]}"#;
        let a = normalize_report(raw(json), &sample_input(), false).unwrap();
        let b = normalize_report(raw(json), &sample_input(), false).unwrap();
        assert_eq!(a.total_areas, b.total_areas);
        assert_eq!(a.activated_areas, b.activated_areas);
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_areas_keep_first() {
        let payload = raw(
            r#"{"growth_areas":[
                {"area":"Values","rating":"good","observation":"shared toys"},
                {"area":"Values","rating":"needs-work","observation":"second copy"}
            ]}"#,
        );
        let report = normalize_report(payload, &sample_input(), false).unwrap();
        assert_eq!(report.total_areas, 1);
        assert_eq!(report.growth_areas[0].observation, "shared toys");
    }

    #[test]
    fn test_empty_observation_set_is_malformed() {
        let payload = raw(r#"{"growth_areas":[]}"#);
        assert!(matches!(
            normalize_report(payload, &sample_input(), false),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_unknown_area_and_rating_rejected() {
        let bad_area = raw(r#"{"growth_areas":[{"area":"Curiosity","rating":"good"}]}"#);
        assert!(matches!(
            normalize_report(bad_area, &sample_input(), false),
            Err(AppError::MalformedResponse(_))
        ));

        let bad_rating = raw(r#"{"growth_areas":[{"area":"Social","rating":"superb"}]}"#);
        assert!(matches!(
            normalize_report(bad_rating, &sample_input(), false),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_lenient_rating_spellings() {
        let payload = raw(
            r#"{"growth_areas":[
                {"area":"Emotional","rating":"Needs Work","observation":"upset at naptime"}
            ]}"#,
        );
        let report = normalize_report(payload, &sample_input(), false).unwrap();
        assert_eq!(report.growth_areas[0].rating, GrowthRating::NeedsWork);
        assert_eq!(report.activated_areas, 0);
    }

    #[test]
    fn test_strict_seven_areas_requires_full_set() {
        let payload = raw(r#"{"growth_areas":[{"area":"Social","rating":"good"}]}"#);
        let err = normalize_report(payload, &sample_input(), true).unwrap_err();
        match err {
            AppError::MalformedResponse(msg) => {
                assert!(msg.contains("Intellectual"));
                assert!(!msg.contains("Social,"));
            }
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }
}

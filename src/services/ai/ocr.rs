//! OCR provider response handling.
//!
//! The provider takes a multipart form and answers with a list of parsed
//! results plus an error flag. Response parsing lives here so it can be
//! exercised without a network.

use serde::Deserialize;

use super::NO_TEXT_EXTRACTED;
use crate::error::{AppError, AppResult};

/// Wire shape of the OCR provider response.
#[derive(Debug, Deserialize)]
pub struct OcrResponse {
    #[serde(rename = "ParsedResults", default)]
    pub parsed_results: Vec<OcrParsedResult>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    pub is_errored_on_processing: bool,
    #[serde(rename = "OCRExitCode", default)]
    pub exit_code: i32,
    #[serde(rename = "ErrorMessage", default)]
    pub error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct OcrParsedResult {
    #[serde(rename = "ParsedText", default)]
    pub parsed_text: String,
}

/// Turn a provider response into extracted text.
///
/// A success with no legible text yields the fixed placeholder, never an
/// empty string. Any provider-reported error is a `Processing` failure.
pub fn parse_ocr_response(response: OcrResponse) -> AppResult<String> {
    if response.is_errored_on_processing {
        let detail = response
            .error_message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "provider reported a processing error".to_string());
        tracing::warn!("OCR provider error: {}", detail);
        return Err(AppError::Processing("OCR failed".to_string()));
    }

    let text = response
        .parsed_results
        .iter()
        .map(|r| r.parsed_text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        Ok(NO_TEXT_EXTRACTED.to_string())
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> OcrResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_success_with_text() {
        let text = parse_ocr_response(response(
            r#"{"ParsedResults":[{"ParsedText":"hello world"}],"OCRExitCode":1}"#,
        ))
        .unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_success_with_empty_text_gets_placeholder() {
        let text = parse_ocr_response(response(
            r#"{"ParsedResults":[{"ParsedText":"  "}],"OCRExitCode":1}"#,
        ))
        .unwrap();
        assert_eq!(text, NO_TEXT_EXTRACTED);

        let text = parse_ocr_response(response(r#"{"ParsedResults":[],"OCRExitCode":1}"#)).unwrap();
        assert_eq!(text, NO_TEXT_EXTRACTED);
    }

    #[test]
    fn test_provider_error_is_processing_failure() {
        let result = parse_ocr_response(response(
            r#"{"IsErroredOnProcessing":true,"ErrorMessage":["bad image"]}"#,
        ));
        assert!(matches!(result, Err(AppError::Processing(_))));
    }

    #[test]
    fn test_multiple_pages_joined() {
        let text = parse_ocr_response(response(
            r#"{"ParsedResults":[{"ParsedText":"page one"},{"ParsedText":"page two"}],"OCRExitCode":1}"#,
        ))
        .unwrap();
        assert_eq!(text, "page one\npage two");
    }
}

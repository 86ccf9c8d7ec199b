//! Transcription provider protocol: upload, submit, bounded poll.
//!
//! The provider is asynchronous on its side; the caller sees one suspended
//! operation. The poll loop is bounded and fails with a timeout beyond the
//! configured attempt count. Dropping the owning request future cancels the
//! loop at the next await point, so a discarded capture never receives a
//! late result.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Wire shape of the upload response.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub upload_url: String,
}

/// Wire shape of the job submission response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

/// Wire shape of a transcript status poll.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptStatus {
    pub status: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub utterances: Option<Vec<Utterance>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
}

/// Poll a transcript job until it reaches a terminal status.
///
/// `fetch` is called once per attempt; the first attempt happens immediately
/// and later attempts wait `interval` beforehand. A provider `error` status
/// is a `Processing` failure; exhausting `max_polls` is a `Timeout`.
pub async fn poll_until_complete<F, Fut>(
    mut fetch: F,
    interval: Duration,
    max_polls: u32,
) -> AppResult<TranscriptStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<TranscriptStatus>>,
{
    for attempt in 1..=max_polls {
        if attempt > 1 {
            tokio::time::sleep(interval).await;
        }

        let status = fetch().await?;
        match status.status.as_str() {
            "completed" => return Ok(status),
            "error" => {
                let detail = status
                    .error
                    .unwrap_or_else(|| "provider reported an error status".to_string());
                tracing::warn!("Transcription job failed: {}", detail);
                return Err(AppError::Processing("transcription failed".to_string()));
            }
            other => {
                tracing::debug!(attempt, status = other, "Transcription still in progress");
            }
        }
    }

    Err(AppError::Timeout(format!(
        "Transcription did not complete within {} polls",
        max_polls
    )))
}

/// Flatten a completed transcript to text.
///
/// With per-speaker utterances each becomes a `SPEAKER: "text"` line in
/// chronological order; otherwise the flat transcript is used verbatim.
pub fn flatten_transcript(status: &TranscriptStatus) -> String {
    match &status.utterances {
        Some(utterances) if !utterances.is_empty() => utterances
            .iter()
            .map(|u| format!("{}: \"{}\"", u.speaker, u.text))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => status.text.clone().unwrap_or_default(),
    }
}

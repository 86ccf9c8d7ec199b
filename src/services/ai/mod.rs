//! AI provider strategies for the media-to-report pipeline.
//!
//! One trait, two implementations: `LiveProvider` calls the real OCR,
//! transcription, and generative endpoints over HTTP; `DeterministicStub`
//! produces fixed output in-process with no network traffic. Selection is a
//! configuration choice so both paths share every caller.

pub mod generation;
pub mod live;
pub mod ocr;
pub mod stub;
pub mod transcription;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AiSettings, ProviderMode};
use crate::error::AppResult;
use crate::models::{GeneratedReport, ReportGenerationInput};

pub use live::LiveProvider;
pub use stub::DeterministicStub;

/// Placeholder returned when OCR succeeds but finds nothing legible.
/// Distinguishes "nothing to read" from a hard failure.
pub const NO_TEXT_EXTRACTED: &str = "no text extracted";

/// Strategy interface for the three external AI operations.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Extract text from an image. Never returns an empty string on success.
    async fn perform_ocr(&self, image: &[u8]) -> AppResult<String>;

    /// Transcribe an audio sample. Speaker-labelled transcripts are flattened
    /// into one `SPEAKER: "text"` line per utterance.
    async fn transcribe_audio(&self, audio: Vec<u8>) -> AppResult<String>;

    /// Synthesize a growth report from the collected session input.
    async fn generate_report(&self, input: &ReportGenerationInput)
        -> AppResult<GeneratedReport>;
}

/// Build the configured provider strategy.
pub fn build_provider(settings: &AiSettings) -> AppResult<Arc<dyn AiProvider>> {
    match settings.mode {
        ProviderMode::Live => Ok(Arc::new(LiveProvider::new(settings.clone())?)),
        ProviderMode::Deterministic => Ok(Arc::new(DeterministicStub::new(
            settings.strict_seven_areas,
        ))),
    }
}

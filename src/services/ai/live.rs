//! Live provider strategy calling the real OCR, transcription, and
//! generation endpoints over HTTP.
//!
//! Provider and network failures are logged with detail and surfaced as the
//! pipeline's own error kinds; raw provider errors never reach the caller.

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::json;
use tracing::{debug, info};

use super::generation::{build_prompt, normalize_report, parse_generated_report};
use super::ocr::{parse_ocr_response, OcrResponse};
use super::transcription::{
    flatten_transcript, poll_until_complete, SubmitResponse, TranscriptStatus, UploadResponse,
};
use super::AiProvider;
use crate::config::AiSettings;
use crate::error::{AppError, AppResult};
use crate::models::{GeneratedReport, ReportGenerationInput};

/// Strategy backed by the configured third-party endpoints.
pub struct LiveProvider {
    client: reqwest::Client,
    settings: AiSettings,
}

impl LiveProvider {
    pub fn new(settings: AiSettings) -> AppResult<Self> {
        // A stalled provider socket must fail the request, not hang the
        // handler past the poll bound
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    fn ocr_api_key(&self) -> &str {
        self.settings.ocr_api_key.as_deref().unwrap_or("helloworld")
    }

    async fn fetch_transcript_status(&self, job_id: &str) -> AppResult<TranscriptStatus> {
        let url = format!("{}/transcript/{}", self.settings.transcribe_endpoint, job_id);
        let response = self
            .client
            .get(&url)
            .header(
                "authorization",
                self.settings.transcribe_api_key.as_deref().unwrap_or(""),
            )
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Transcript poll request failed: {}", e);
                AppError::Processing("transcription failed".to_string())
            })?;

        response.json::<TranscriptStatus>().await.map_err(|e| {
            tracing::warn!("Transcript poll response did not parse: {}", e);
            AppError::Processing("transcription failed".to_string())
        })
    }
}

#[async_trait]
impl AiProvider for LiveProvider {
    async fn perform_ocr(&self, image: &[u8]) -> AppResult<String> {
        let part = multipart::Part::bytes(image.to_vec())
            .file_name("capture.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| AppError::Internal(format!("Failed to build multipart: {}", e)))?;

        let form = multipart::Form::new()
            .text("apikey", self.ocr_api_key().to_string())
            .text("language", "eng")
            .text("OCREngine", self.settings.ocr_engine.clone())
            .part("file", part);

        debug!("Sending OCR request ({} bytes)", image.len());

        let response = self
            .client
            .post(&self.settings.ocr_endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("OCR request failed: {}", e);
                AppError::Processing("OCR failed".to_string())
            })?;

        if !response.status().is_success() {
            tracing::warn!("OCR provider returned HTTP {}", response.status());
            return Err(AppError::Processing("OCR failed".to_string()));
        }

        let body: OcrResponse = response.json().await.map_err(|e| {
            tracing::warn!("OCR response did not parse: {}", e);
            AppError::Processing("OCR failed".to_string())
        })?;

        parse_ocr_response(body)
    }

    async fn transcribe_audio(&self, audio: Vec<u8>) -> AppResult<String> {
        let auth = self.settings.transcribe_api_key.as_deref().unwrap_or("");

        // 1. Upload raw bytes, obtaining an opaque URL
        debug!("Uploading audio for transcription ({} bytes)", audio.len());
        let upload: UploadResponse = self
            .client
            .post(format!("{}/upload", self.settings.transcribe_endpoint))
            .header("authorization", auth)
            .body(audio)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Audio upload failed: {}", e);
                AppError::Processing("transcription failed".to_string())
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::warn!("Upload response did not parse: {}", e);
                AppError::Processing("transcription failed".to_string())
            })?;

        // 2. Submit the transcription job
        let submit: SubmitResponse = self
            .client
            .post(format!("{}/transcript", self.settings.transcribe_endpoint))
            .header("authorization", auth)
            .json(&json!({
                "audio_url": upload.upload_url,
                "speaker_labels": self.settings.speaker_labels,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Transcription job submission failed: {}", e);
                AppError::Processing("transcription failed".to_string())
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::warn!("Job submission response did not parse: {}", e);
                AppError::Processing("transcription failed".to_string())
            })?;

        info!("Transcription job {} submitted", submit.id);

        // 3. Bounded status poll
        let status = poll_until_complete(
            || self.fetch_transcript_status(&submit.id),
            self.settings.transcribe_poll_interval,
            self.settings.transcribe_max_polls,
        )
        .await?;

        Ok(flatten_transcript(&status))
    }

    async fn generate_report(
        &self,
        input: &ReportGenerationInput,
    ) -> AppResult<GeneratedReport> {
        let prompt = build_prompt(input);

        let mut request = self.client.post(&self.settings.generation_endpoint);
        if let Some(key) = &self.settings.generation_api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request
            .json(&json!({
                "contents": [{"parts": [{"text": prompt}]}],
                "generationConfig": {
                    "temperature": self.settings.generation_temperature,
                    "maxOutputTokens": self.settings.generation_max_tokens,
                },
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Generation request failed: {}", e);
                AppError::Generation("provider call failed".to_string())
            })?;

        if !response.status().is_success() {
            tracing::warn!("Generation provider returned HTTP {}", response.status());
            return Err(AppError::Generation("provider call failed".to_string()));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            tracing::warn!("Generation response did not parse: {}", e);
            AppError::Generation("provider call failed".to_string())
        })?;

        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                AppError::MalformedResponse("response has no candidate text".to_string())
            })?;

        let raw = parse_generated_report(text)?;
        normalize_report(raw, input, self.settings.strict_seven_areas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderMode;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn settings(ocr_endpoint: String) -> AiSettings {
        AiSettings {
            mode: ProviderMode::Live,
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(200),
            ocr_endpoint,
            ocr_api_key: None,
            ocr_engine: "2".to_string(),
            transcribe_endpoint: "http://127.0.0.1:1".to_string(),
            transcribe_api_key: None,
            speaker_labels: true,
            transcribe_poll_interval: Duration::from_millis(10),
            transcribe_max_polls: 2,
            generation_endpoint: "http://127.0.0.1:1".to_string(),
            generation_api_key: None,
            generation_temperature: 0.7,
            generation_max_tokens: 1024,
            strict_seven_areas: false,
        }
    }

    /// A provider that accepts the connection but never answers must surface
    /// as a processing error within the configured request timeout.
    #[tokio::test]
    async fn test_ocr_fails_fast_when_provider_stalls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = LiveProvider::new(settings(format!("http://{}", addr))).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            provider.perform_ocr(b"image bytes"),
        )
        .await
        .expect("request hung past its timeout");

        assert!(matches!(result, Err(AppError::Processing(_))));
    }
}

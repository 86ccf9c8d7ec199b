//! Media capture pipeline: process first, persist second.
//!
//! Order matters: the AI call runs before any write so a provider failure
//! leaves no orphaned rows or blobs. A persistence failure after a
//! successful AI call keeps the extracted text in the response instead of
//! discarding it; the caller sees `saved: false` plus the error.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{CaptureResponse, MediaArtifact, MediaKind};
use crate::services::ai::AiProvider;
use crate::services::storage::{BlobStore, Storage};

/// Validated capture submission.
pub struct CaptureRequest {
    pub child_id: Uuid,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
    /// File extension of the original upload, used for the blob key.
    pub extension: Option<String>,
}

/// Run the full capture pipeline for one media sample.
///
/// Steps, in order: check preconditions, invoke the AI client, upload the
/// bytes, insert the artifact row, attach the extracted text.
pub async fn process_capture(
    pool: &DbPool,
    store: &dyn BlobStore,
    provider: &dyn AiProvider,
    request: CaptureRequest,
) -> AppResult<CaptureResponse> {
    if request.bytes.is_empty() {
        return Err(AppError::Precondition(
            "no media payload attached".to_string(),
        ));
    }

    {
        let conn = pool.connection();
        if db::children::get_child_by_id(&conn, request.child_id)?.is_none() {
            return Err(AppError::Precondition(format!(
                "no such child: {}",
                request.child_id
            )));
        }
    }

    // AI first; a provider failure aborts before anything is written
    let processed_text = match request.kind {
        MediaKind::Image => provider.perform_ocr(&request.bytes).await?,
        MediaKind::Audio => provider.transcribe_audio(request.bytes.clone()).await?,
    };

    let media_id = Uuid::new_v4();
    let ext = request
        .extension
        .as_deref()
        .unwrap_or_else(|| Storage::extension_for_kind(request.kind));
    let key = Storage::media_key(request.child_id, request.kind, media_id, ext);

    let artifact = MediaArtifact {
        id: media_id,
        child_id: request.child_id,
        kind: request.kind,
        url: key.clone(),
        description: request.description,
        processed_text: None,
        created_at: Utc::now(),
    };

    match persist_artifact(pool, store, &artifact, request.bytes, ext, &processed_text).await {
        Ok(saved) => {
            info!(media_id = %media_id, kind = %request.kind, "Media capture processed and saved");
            Ok(CaptureResponse {
                media: Some(saved),
                processed_text,
                saved: true,
                persistence_error: None,
            })
        }
        Err(e) => {
            // The AI call already succeeded; surface the text anyway
            warn!(media_id = %media_id, "Capture persistence failed: {}", e);
            Ok(CaptureResponse {
                media: None,
                processed_text,
                saved: false,
                persistence_error: Some(e.to_string()),
            })
        }
    }
}

async fn persist_artifact(
    pool: &DbPool,
    store: &dyn BlobStore,
    artifact: &MediaArtifact,
    bytes: Vec<u8>,
    ext: &str,
    processed_text: &str,
) -> AppResult<MediaArtifact> {
    store
        .put(
            &artifact.url,
            bytes,
            Some(Storage::content_type_for_extension(ext)),
        )
        .await?;

    let conn = pool.connection();
    db::media::insert_media(&conn, artifact)?;

    // The row exists now, so any later failure is a partial write
    db::media::attach_processed_text(&conn, artifact.id, processed_text).map_err(|e| {
        AppError::PartialPersistence(format!(
            "media row {} saved but text attachment failed: {}",
            artifact.id, e
        ))
    })?;

    db::media::get_media_by_id(&conn, artifact.id)?
        .ok_or_else(|| AppError::Database("Media vanished after insert".to_string()))
}

/// Delete a media artifact and its stored blob. Explicit user action only.
pub async fn delete_capture(pool: &DbPool, store: &dyn BlobStore, id: Uuid) -> AppResult<()> {
    let artifact = {
        let conn = pool.connection();
        db::media::get_media_by_id(&conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("Media {}", id)))?
    };

    store.delete(&artifact.url).await?;

    let conn = pool.connection();
    db::media::delete_media(&conn, id)?;
    info!(media_id = %id, "Media artifact deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::models::Child;
    use crate::services::ai::DeterministicStub;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory blob store so the pipeline runs without a bucket.
    #[derive(Default)]
    struct MemoryStore {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
        fail_puts: bool,
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn put(
            &self,
            key: &str,
            data: Vec<u8>,
            _content_type: Option<&str>,
        ) -> AppResult<()> {
            if self.fail_puts {
                return Err(AppError::Storage("simulated outage".to_string()));
            }
            self.blobs.lock().unwrap().insert(key.to_string(), data);
            Ok(())
        }

        async fn get(&self, key: &str) -> AppResult<(Vec<u8>, Option<String>)> {
            self.blobs
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .map(|data| (data, None))
                .ok_or_else(|| AppError::NotFound(format!("File not found: {}", key)))
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.blobs.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn seeded_pool() -> (DbPool, Uuid) {
        let pool = DbPool::open_in_memory().unwrap();
        migrations::run_migrations(&pool).unwrap();
        let child = Child {
            id: Uuid::new_v4(),
            name: "Maya".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2019, 3, 1).unwrap(),
            class: None,
            profile_image_url: None,
            created_at: Utc::now(),
        };
        {
            let conn = pool.connection();
            db::children::insert_child(&conn, &child).unwrap();
        }
        (pool, child.id)
    }

    fn image_request(child_id: Uuid) -> CaptureRequest {
        CaptureRequest {
            child_id,
            kind: MediaKind::Image,
            bytes: b"jpeg bytes".to_vec(),
            description: Some("worksheet".to_string()),
            extension: Some("jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_successful_capture_persists_artifact_and_text() {
        let (pool, child_id) = seeded_pool();
        let store = MemoryStore::default();
        let provider = DeterministicStub::new(false);

        let response = process_capture(&pool, &store, &provider, image_request(child_id))
            .await
            .unwrap();

        assert!(response.saved);
        assert!(response.persistence_error.is_none());
        let media = response.media.unwrap();
        assert_eq!(media.processed_text.as_deref(), Some(response.processed_text.as_str()));
        assert!(store.blobs.lock().unwrap().contains_key(&media.url));

        let conn = pool.connection();
        let stored = db::media::get_media_by_id(&conn, media.id).unwrap().unwrap();
        assert_eq!(stored.processed_text, media.processed_text);
    }

    #[tokio::test]
    async fn test_empty_payload_is_precondition_error() {
        let (pool, child_id) = seeded_pool();
        let store = MemoryStore::default();
        let provider = DeterministicStub::new(false);

        let mut request = image_request(child_id);
        request.bytes.clear();
        let result = process_capture(&pool, &store, &provider, request).await;
        assert!(matches!(result, Err(AppError::Precondition(_))));
    }

    #[tokio::test]
    async fn test_unknown_child_is_precondition_error() {
        let (pool, _) = seeded_pool();
        let store = MemoryStore::default();
        let provider = DeterministicStub::new(false);

        let result =
            process_capture(&pool, &store, &provider, image_request(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::Precondition(_))));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_extracted_text() {
        let (pool, child_id) = seeded_pool();
        let store = MemoryStore {
            fail_puts: true,
            ..Default::default()
        };
        let provider = DeterministicStub::new(false);

        let response = process_capture(&pool, &store, &provider, image_request(child_id))
            .await
            .unwrap();

        assert!(!response.saved);
        assert!(response.media.is_none());
        assert!(!response.processed_text.is_empty());
        assert!(response.persistence_error.is_some());

        // No partial row exists
        let conn = pool.connection();
        assert!(db::media::list_media(&conn, child_id, None, None)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_audio_capture_uses_transcription() {
        let (pool, child_id) = seeded_pool();
        let store = MemoryStore::default();
        let provider = DeterministicStub::new(false);

        let request = CaptureRequest {
            child_id,
            kind: MediaKind::Audio,
            bytes: vec![1, 2, 3],
            description: None,
            extension: None,
        };
        let response = process_capture(&pool, &store, &provider, request)
            .await
            .unwrap();

        assert!(response.saved);
        assert!(response.processed_text.contains(": \""));
        let media = response.media.unwrap();
        assert!(media.url.ends_with(".mp3"));
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_blob() {
        let (pool, child_id) = seeded_pool();
        let store = MemoryStore::default();
        let provider = DeterministicStub::new(false);

        let response = process_capture(&pool, &store, &provider, image_request(child_id))
            .await
            .unwrap();
        let media = response.media.unwrap();

        delete_capture(&pool, &store, media.id).await.unwrap();

        assert!(store.blobs.lock().unwrap().is_empty());
        let conn = pool.connection();
        assert!(db::media::get_media_by_id(&conn, media.id).unwrap().is_none());
    }
}

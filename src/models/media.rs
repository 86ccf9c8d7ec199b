//! Media artifact models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of captured media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Content type used when serving the stored bytes back.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Image => "image/jpeg",
            Self::Audio => "audio/mpeg",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A captured media artifact.
///
/// `processed_text` is absent until the AI call succeeds and is then set
/// exactly once; new captures create new artifacts, never overwrite.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MediaArtifact {
    pub id: Uuid,
    pub child_id: Uuid,
    pub kind: MediaKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a capture-and-process request.
///
/// The extracted text is always present on success; `saved` is false when the
/// AI call succeeded but persistence failed, in which case
/// `persistence_error` explains what went wrong without discarding the text.
#[derive(Debug, Serialize, ToSchema)]
pub struct CaptureResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaArtifact>,
    pub processed_text: String,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

/// Query parameters for the media library.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListMediaQuery {
    pub child_id: Uuid,
    #[serde(default)]
    pub kind: Option<MediaKind>,
    /// Matches against description and processed text.
    #[serde(default)]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(MediaKind::parse("image"), Some(MediaKind::Image));
        assert_eq!(MediaKind::parse("audio"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::parse("video"), None);
        assert_eq!(MediaKind::Image.as_str(), "image");
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&MediaKind::Audio).unwrap();
        assert_eq!(json, "\"audio\"");
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::ValidationError;

/// Display data for the signed-in user. Opaque to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Wire shape of the auth status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// External authorization page the presentation layer should navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget(pub Url);

impl RedirectTarget {
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-selected lineup image, consumed exactly once by the extraction call.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadAttempt {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_hint: Option<String>,
}

impl UploadAttempt {
    pub fn new(
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        mime_hint: Option<String>,
    ) -> Self {
        let file_name = file_name.into();
        let file_name = if file_name.trim().is_empty() {
            "upload".to_string()
        } else {
            file_name
        };
        Self {
            file_name,
            bytes: bytes.into(),
            mime_hint,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// An absent hint is accepted; the extraction service has the final say.
    pub fn looks_like_image(&self) -> bool {
        self.mime_hint
            .as_deref()
            .is_none_or(|mime| mime.trim().to_ascii_lowercase().starts_with("image/"))
    }
}

impl fmt::Debug for UploadAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadAttempt")
            .field("file_name", &self.file_name)
            .field("size_bytes", &self.bytes.len())
            .field("mime_hint", &self.mime_hint)
            .finish()
    }
}

/// Event name and artist list produced by the extraction service.
/// Order is extraction order; duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub event_name: String,
    pub artists: Vec<String>,
}

/// Sanitized review payload sent to the playlist service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRequest {
    pub artists: Vec<String>,
    pub event_name: String,
}

impl PlaylistRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_name.trim().is_empty() {
            return Err(ValidationError::BlankEventName);
        }
        if self.artists.is_empty() {
            return Err(ValidationError::NoArtists);
        }
        Ok(())
    }
}

/// Terminal artifact of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistResult {
    pub playlist_name: String,
    pub playlist_url: Url,
    pub tracks_added: u32,
    #[serde(default)]
    pub artists_found: Vec<String>,
}

impl PlaylistResult {
    pub fn summary(&self) -> String {
        format!(
            "Found {} artists and added {} tracks to your playlist.",
            self.artists_found.len(),
            self.tracks_added
        )
    }
}

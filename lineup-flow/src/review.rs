use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ExtractionResult, PlaylistRequest};

/// User-editable copy of an extraction, alive only while reviewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pub event_name: String,
    pub artists: Vec<String>,
}

/// Working buffer for the review stage.
///
/// Entries may be edited or removed but never inserted, so the list can only
/// shrink relative to the extraction it was seeded from.
#[derive(Debug, Clone)]
pub struct ReviewEditor {
    state: ReviewState,
    extracted_count: usize,
}

impl ReviewEditor {
    pub fn from_extraction(extraction: &ExtractionResult) -> Self {
        Self {
            state: ReviewState {
                event_name: extraction.event_name.clone(),
                artists: extraction.artists.clone(),
            },
            extracted_count: extraction.artists.len(),
        }
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    pub fn extracted_count(&self) -> usize {
        self.extracted_count
    }

    /// Stored verbatim; trimming happens at confirmation.
    pub fn set_event_name(&mut self, text: impl Into<String>) {
        self.state.event_name = text.into();
    }

    /// Returns `false` when `index` is out of bounds; nothing changes then.
    pub fn update_artist(&mut self, index: usize, text: impl Into<String>) -> bool {
        match self.state.artists.get_mut(index) {
            Some(slot) => {
                *slot = text.into();
                true
            }
            None => {
                debug!(
                    index,
                    len = self.state.artists.len(),
                    "Ignoring artist update out of bounds"
                );
                false
            }
        }
    }

    /// Removes the entry at `index`, shifting later entries down by one.
    pub fn remove_artist(&mut self, index: usize) -> Option<String> {
        if index < self.state.artists.len() {
            Some(self.state.artists.remove(index))
        } else {
            debug!(
                index,
                len = self.state.artists.len(),
                "Ignoring artist removal out of bounds"
            );
            None
        }
    }

    /// Trimmed event name plus the trimmed, non-blank artists.
    /// The only place blank entries are dropped.
    pub fn sanitize_for_confirm(&self) -> PlaylistRequest {
        PlaylistRequest {
            event_name: self.state.event_name.trim().to_string(),
            artists: self
                .state
                .artists
                .iter()
                .map(|artist| artist.trim())
                .filter(|artist| !artist.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn can_confirm(&self) -> bool {
        self.sanitize_for_confirm().validate().is_ok()
    }
}

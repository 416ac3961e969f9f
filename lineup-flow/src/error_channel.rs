use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::stage::StageTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Session, login and logout failures.
    Auth,
    /// No response was received for the upload, or it was rejected locally.
    Upload,
    /// The extraction service reported a failure or sent a malformed payload.
    Extraction,
    PlaylistCreation,
}

/// The user-visible failure banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowError {
    pub message: String,
    pub stage: StageTag,
    pub kind: ErrorKind,
    pub occurred_at: DateTime<Utc>,
}

impl WorkflowError {
    pub fn new(kind: ErrorKind, stage: StageTag, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage,
            kind,
            occurred_at: Utc::now(),
        }
    }
}

/// Single slot holding the last failure. A new error replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct ErrorChannel {
    slot: Option<WorkflowError>,
}

impl ErrorChannel {
    pub fn set(&mut self, error: WorkflowError) {
        warn!(
            stage = %error.stage,
            kind = ?error.kind,
            "Workflow error: {}",
            error.message
        );
        self.slot = Some(error);
    }

    pub fn clear(&mut self) -> Option<WorkflowError> {
        let previous = self.slot.take();
        if previous.is_some() {
            debug!("Cleared error channel");
        }
        previous
    }

    pub fn current(&self) -> Option<&WorkflowError> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

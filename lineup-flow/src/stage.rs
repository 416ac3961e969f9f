use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    model::{ExtractionResult, PlaylistResult, UploadAttempt},
    review::ReviewEditor,
};

/// Monotonically increasing token identifying a workflow attempt.
///
/// Every remote call is tagged with the attempt that issued it; a response is
/// only applied while its attempt is still the machine's current one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct AttemptId(u64);

impl AttemptId {
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        AttemptId(self.0 + 1)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload-free name of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageTag {
    Idle,
    Uploading,
    Extracting,
    Reviewing,
    CreatingPlaylist,
    Completed,
    Failed,
}

impl StageTag {
    /// Stages with a remote call (or the upload delay) outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            StageTag::Uploading | StageTag::Extracting | StageTag::CreatingPlaylist
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageTag::Idle => "idle",
            StageTag::Uploading => "uploading",
            StageTag::Extracting => "extracting",
            StageTag::Reviewing => "reviewing",
            StageTag::CreatingPlaylist => "creating_playlist",
            StageTag::Completed => "completed",
            StageTag::Failed => "failed",
        }
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The workflow stage together with the payload it carries.
#[derive(Debug, Clone)]
pub enum Stage {
    Idle,
    /// Holds the upload until it is handed to the extraction call.
    Uploading { upload: UploadAttempt },
    Extracting,
    Reviewing {
        extraction: ExtractionResult,
        editor: ReviewEditor,
    },
    CreatingPlaylist,
    Completed { result: PlaylistResult },
    Failed { during: StageTag },
}

impl Stage {
    pub fn tag(&self) -> StageTag {
        match self {
            Stage::Idle => StageTag::Idle,
            Stage::Uploading { .. } => StageTag::Uploading,
            Stage::Extracting => StageTag::Extracting,
            Stage::Reviewing { .. } => StageTag::Reviewing,
            Stage::CreatingPlaylist => StageTag::CreatingPlaylist,
            Stage::Completed { .. } => StageTag::Completed,
            Stage::Failed { .. } => StageTag::Failed,
        }
    }
}

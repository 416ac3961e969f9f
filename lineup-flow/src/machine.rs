use tracing::{debug, info, warn};

use crate::{
    error::{FlowError, Result},
    error_channel::{ErrorChannel, ErrorKind, WorkflowError},
    model::{ExtractionResult, PlaylistRequest, PlaylistResult, UploadAttempt},
    review::{ReviewEditor, ReviewState},
    stage::{AttemptId, Stage, StageTag},
};

/// Matches the extraction backend's request body limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Outcome of handing a remote response to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The response was applied; the machine is now in this stage.
    Accepted(StageTag),
    /// The response belonged to an attempt that is no longer current.
    Superseded,
}

/// The one thing, besides the stage itself, the user currently sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveArtifact<'a> {
    None,
    Review(&'a ReviewState),
    Playlist(&'a PlaylistResult),
    Error(&'a WorkflowError),
}

/// Single source of truth for the workflow stage and its payload.
///
/// All transitions are synchronous. Remote calls happen outside the machine;
/// their responses come back through `finish_*` together with the attempt id
/// they were issued under, and are dropped when that attempt is stale.
#[derive(Debug)]
pub struct WorkflowStateMachine {
    stage: Stage,
    attempt: AttemptId,
    errors: ErrorChannel,
    max_upload_bytes: usize,
}

impl WorkflowStateMachine {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self {
            stage: Stage::Idle,
            attempt: AttemptId::default(),
            errors: ErrorChannel::default(),
            max_upload_bytes,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn tag(&self) -> StageTag {
        self.stage.tag()
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.errors.current()
    }

    pub fn review(&self) -> Option<&ReviewState> {
        match &self.stage {
            Stage::Reviewing { editor, .. } => Some(editor.state()),
            _ => None,
        }
    }

    /// The extraction the current review was seeded from.
    pub fn extraction(&self) -> Option<&ExtractionResult> {
        match &self.stage {
            Stage::Reviewing { extraction, .. } => Some(extraction),
            _ => None,
        }
    }

    pub fn playlist(&self) -> Option<&PlaylistResult> {
        match &self.stage {
            Stage::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn can_confirm(&self) -> bool {
        match &self.stage {
            Stage::Reviewing { editor, .. } => editor.can_confirm(),
            _ => false,
        }
    }

    pub fn active_artifact(&self) -> ActiveArtifact<'_> {
        match &self.stage {
            Stage::Reviewing { editor, .. } => ActiveArtifact::Review(editor.state()),
            Stage::Completed { result } => ActiveArtifact::Playlist(result),
            _ => match self.errors.current() {
                Some(error) => ActiveArtifact::Error(error),
                None => ActiveArtifact::None,
            },
        }
    }

    /// `Idle --select(file)--> Uploading`. Starts a new attempt.
    pub fn select_file(
        &mut self,
        authenticated: bool,
        file: Option<UploadAttempt>,
    ) -> Result<AttemptId> {
        if !authenticated {
            return Err(FlowError::NotAuthenticated);
        }
        if self.tag() != StageTag::Idle {
            return Err(self.reject("submit_file"));
        }
        let upload = match file {
            Some(upload) if !upload.is_empty() => upload,
            _ => {
                debug!("No file selected, ignoring");
                return Err(FlowError::MissingFile);
            }
        };

        self.errors.clear();

        if upload.size_bytes() > self.max_upload_bytes {
            return Err(self.reject_upload(format!(
                "File is too large ({} bytes, limit is {} bytes)",
                upload.size_bytes(),
                self.max_upload_bytes
            )));
        }
        if !upload.looks_like_image() {
            return Err(self.reject_upload("Only image files can be uploaded".to_string()));
        }

        self.attempt = self.attempt.next();
        info!(
            attempt = %self.attempt,
            file = %upload.file_name,
            "Upload started"
        );
        self.stage = Stage::Uploading { upload };
        Ok(self.attempt)
    }

    /// `Uploading --> Extracting`. Hands out the upload exactly once.
    pub fn begin_extraction(&mut self, attempt: AttemptId) -> Option<UploadAttempt> {
        if !self.is_current(attempt, StageTag::Uploading) {
            self.log_superseded(attempt, "upload dispatch");
            return None;
        }
        match std::mem::replace(&mut self.stage, Stage::Extracting) {
            Stage::Uploading { upload } => {
                info!(attempt = %attempt, "Extraction dispatched");
                Some(upload)
            }
            other => {
                self.stage = other;
                None
            }
        }
    }

    /// `Extracting --> Reviewing | Failed`.
    pub fn finish_extraction(
        &mut self,
        attempt: AttemptId,
        outcome: std::result::Result<ExtractionResult, WorkflowError>,
    ) -> Applied {
        if !self.is_current(attempt, StageTag::Extracting) {
            self.log_superseded(attempt, "extraction response");
            return Applied::Superseded;
        }
        match outcome {
            Ok(extraction) => {
                let editor = ReviewEditor::from_extraction(&extraction);
                info!(
                    attempt = %attempt,
                    artists = extraction.artists.len(),
                    "Review started"
                );
                self.stage = Stage::Reviewing { extraction, editor };
            }
            Err(error) => self.fail(error),
        }
        Applied::Accepted(self.tag())
    }

    pub fn editor_mut(&mut self) -> Result<&mut ReviewEditor> {
        match &mut self.stage {
            Stage::Reviewing { editor, .. } => Ok(editor),
            other => Err(FlowError::InvalidCommand {
                command: "edit_review",
                stage: other.tag(),
            }),
        }
    }

    /// `Reviewing --confirm--> CreatingPlaylist`. On validation failure the
    /// machine stays in review and the error channel is untouched.
    pub fn confirm_review(&mut self) -> Result<(AttemptId, PlaylistRequest)> {
        let request = match &self.stage {
            Stage::Reviewing { editor, .. } => editor.sanitize_for_confirm(),
            _ => return Err(self.reject("confirm_review")),
        };
        request.validate()?;

        self.errors.clear();
        self.stage = Stage::CreatingPlaylist;
        info!(
            attempt = %self.attempt,
            artists = request.artists.len(),
            "Review confirmed"
        );
        Ok((self.attempt, request))
    }

    /// `Reviewing --cancel--> Idle`. Local only.
    pub fn cancel_review(&mut self) -> Result<()> {
        if self.tag() != StageTag::Reviewing {
            return Err(self.reject("cancel_review"));
        }
        self.attempt = self.attempt.next();
        self.stage = Stage::Idle;
        info!("Review cancelled");
        Ok(())
    }

    /// `CreatingPlaylist --> Completed | Failed`.
    pub fn finish_playlist(
        &mut self,
        attempt: AttemptId,
        outcome: std::result::Result<PlaylistResult, WorkflowError>,
    ) -> Applied {
        if !self.is_current(attempt, StageTag::CreatingPlaylist) {
            self.log_superseded(attempt, "playlist response");
            return Applied::Superseded;
        }
        match outcome {
            Ok(result) => {
                info!(attempt = %attempt, playlist = %result.playlist_name, "Workflow completed");
                self.stage = Stage::Completed { result };
            }
            Err(error) => self.fail(error),
        }
        Applied::Accepted(self.tag())
    }

    /// Back to `Idle` from anywhere. An outstanding call loses its right to
    /// mutate state because the attempt id moves on.
    pub fn reset(&mut self) {
        let from = self.tag();
        self.restart();
        if from.is_in_flight() {
            warn!(from = %from, attempt = %self.attempt, "Abandoned in-flight attempt");
        } else {
            info!(from = %from, "Workflow reset");
        }
    }

    /// Session ended or was never established: nothing survives.
    pub fn end_session(&mut self) {
        if self.tag() != StageTag::Idle || !self.errors.is_empty() {
            info!(from = %self.tag(), "Discarding workflow state at session boundary");
        }
        self.restart();
    }

    pub(crate) fn record_error(&mut self, error: WorkflowError) {
        self.errors.set(error);
    }

    pub(crate) fn clear_error(&mut self) {
        self.errors.clear();
    }

    fn restart(&mut self) {
        self.errors.clear();
        self.stage = Stage::Idle;
        self.attempt = self.attempt.next();
    }

    fn is_current(&self, attempt: AttemptId, expected: StageTag) -> bool {
        attempt == self.attempt && self.tag() == expected
    }

    fn fail(&mut self, error: WorkflowError) {
        let during = self.tag();
        self.errors.set(error);
        self.stage = Stage::Failed { during };
    }

    fn reject(&self, command: &'static str) -> FlowError {
        debug!(command, stage = %self.tag(), "Command rejected");
        FlowError::InvalidCommand {
            command,
            stage: self.tag(),
        }
    }

    fn reject_upload(&mut self, message: String) -> FlowError {
        self.errors.set(WorkflowError::new(
            ErrorKind::Upload,
            StageTag::Idle,
            message.clone(),
        ));
        FlowError::UploadRejected(message)
    }

    fn log_superseded(&self, attempt: AttemptId, what: &str) {
        info!(
            stale = %attempt,
            current = %self.attempt,
            stage = %self.tag(),
            "Discarding {} from superseded attempt",
            what
        );
    }
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn lineup() -> UploadAttempt {
        UploadAttempt::new("lineup.png", vec![1, 2, 3], Some("image/png".to_string()))
    }

    fn field_day() -> ExtractionResult {
        ExtractionResult {
            event_name: "Field Day".to_string(),
            artists: vec!["Radiohead".to_string(), "Air".to_string()],
        }
    }

    fn playlist() -> PlaylistResult {
        PlaylistResult {
            playlist_name: "Field Day".to_string(),
            playlist_url: "https://open.spotify.com/playlist/abc".parse().unwrap(),
            tracks_added: 3,
            artists_found: vec!["Radiohead".to_string()],
        }
    }

    fn reviewing() -> (WorkflowStateMachine, AttemptId) {
        let mut machine = WorkflowStateMachine::default();
        let attempt = machine.select_file(true, Some(lineup())).unwrap();
        assert!(machine.begin_extraction(attempt).is_some());
        assert_eq!(
            machine.finish_extraction(attempt, Ok(field_day())),
            Applied::Accepted(StageTag::Reviewing)
        );
        (machine, attempt)
    }

    #[test]
    fn test_select_requires_authentication() {
        let mut machine = WorkflowStateMachine::default();
        assert!(matches!(
            machine.select_file(false, Some(lineup())),
            Err(FlowError::NotAuthenticated)
        ));
        assert_eq!(machine.tag(), StageTag::Idle);
    }

    #[test]
    fn test_select_without_file_is_noop() {
        let mut machine = WorkflowStateMachine::default();
        machine.record_error(WorkflowError::new(ErrorKind::Auth, StageTag::Idle, "old"));

        assert!(matches!(
            machine.select_file(true, None),
            Err(FlowError::MissingFile)
        ));
        let empty = UploadAttempt::new("empty.png", Vec::new(), None);
        assert!(matches!(
            machine.select_file(true, Some(empty)),
            Err(FlowError::MissingFile)
        ));

        assert_eq!(machine.tag(), StageTag::Idle);
        assert_eq!(machine.attempt(), AttemptId::default());
        assert_eq!(machine.error().map(|e| e.message.as_str()), Some("old"));
    }

    #[test]
    fn test_select_clears_previous_error() {
        let mut machine = WorkflowStateMachine::default();
        machine.record_error(WorkflowError::new(ErrorKind::Auth, StageTag::Idle, "old"));
        machine.select_file(true, Some(lineup())).unwrap();
        assert!(machine.error().is_none());
        assert_eq!(machine.tag(), StageTag::Uploading);
    }

    #[test]
    fn test_oversized_upload_is_rejected_locally() {
        let mut machine = WorkflowStateMachine::new(2);
        let result = machine.select_file(true, Some(lineup()));
        assert!(matches!(result, Err(FlowError::UploadRejected(_))));
        assert_eq!(machine.tag(), StageTag::Idle);

        let error = machine.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Upload);
        assert!(error.message.contains("too large"));
    }

    #[test]
    fn test_non_image_upload_is_rejected_locally() {
        let mut machine = WorkflowStateMachine::default();
        let pdf = UploadAttempt::new("lineup.pdf", vec![1], Some("application/pdf".to_string()));
        assert!(matches!(
            machine.select_file(true, Some(pdf)),
            Err(FlowError::UploadRejected(_))
        ));
        assert_eq!(
            machine.error().map(|e| e.message.as_str()),
            Some("Only image files can be uploaded")
        );
    }

    #[test]
    fn test_second_select_while_busy_is_rejected() {
        let mut machine = WorkflowStateMachine::default();
        machine.select_file(true, Some(lineup())).unwrap();
        assert!(matches!(
            machine.select_file(true, Some(lineup())),
            Err(FlowError::InvalidCommand {
                command: "submit_file",
                stage: StageTag::Uploading
            })
        ));
    }

    #[test]
    fn test_upload_is_handed_out_once() {
        let mut machine = WorkflowStateMachine::default();
        let attempt = machine.select_file(true, Some(lineup())).unwrap();
        assert_eq!(machine.begin_extraction(attempt), Some(lineup()));
        assert_eq!(machine.begin_extraction(attempt), None);
        assert_eq!(machine.tag(), StageTag::Extracting);
    }

    #[test]
    fn test_stale_dispatch_after_reset_hands_out_nothing() {
        let mut machine = WorkflowStateMachine::default();
        let first = machine.select_file(true, Some(lineup())).unwrap();
        machine.reset();
        assert_eq!(machine.begin_extraction(first), None);
        assert_eq!(machine.tag(), StageTag::Idle);

        let second = machine.select_file(true, Some(lineup())).unwrap();
        assert_eq!(machine.begin_extraction(first), None);
        assert_eq!(machine.tag(), StageTag::Uploading);
        assert_eq!(machine.begin_extraction(second), Some(lineup()));
    }

    #[test]
    fn test_extraction_seeds_review() {
        let (machine, _) = reviewing();
        let review = machine.review().unwrap();
        assert_eq!(review.artists, vec!["Radiohead", "Air"]);
        assert_eq!(review.event_name, "Field Day");
        assert_eq!(machine.extraction(), Some(&field_day()));
        assert!(machine.can_confirm());
    }

    #[test]
    fn test_extraction_failure_sets_error() {
        let mut machine = WorkflowStateMachine::default();
        let attempt = machine.select_file(true, Some(lineup())).unwrap();
        machine.begin_extraction(attempt);

        let error = WorkflowError::new(
            ErrorKind::Extraction,
            StageTag::Extracting,
            "image too large",
        );
        assert_eq!(
            machine.finish_extraction(attempt, Err(error)),
            Applied::Accepted(StageTag::Failed)
        );
        assert!(matches!(
            machine.stage(),
            Stage::Failed {
                during: StageTag::Extracting
            }
        ));
        assert_eq!(machine.error().unwrap().message, "image too large");
    }

    #[test]
    fn test_stale_extraction_is_discarded() {
        let mut machine = WorkflowStateMachine::default();
        let first = machine.select_file(true, Some(lineup())).unwrap();
        machine.begin_extraction(first);

        machine.reset();
        let second = machine.select_file(true, Some(lineup())).unwrap();
        machine.begin_extraction(second);
        assert!(second > first);

        assert_eq!(
            machine.finish_extraction(first, Ok(field_day())),
            Applied::Superseded
        );
        assert_eq!(machine.tag(), StageTag::Extracting);
        assert_eq!(machine.attempt(), second);
    }

    #[test]
    fn test_blank_event_name_blocks_confirm() {
        let (mut machine, _) = reviewing();
        machine.editor_mut().unwrap().set_event_name("   ");

        assert!(!machine.can_confirm());
        assert!(matches!(
            machine.confirm_review(),
            Err(FlowError::Validation(ValidationError::BlankEventName))
        ));
        assert_eq!(machine.tag(), StageTag::Reviewing);
        assert!(machine.error().is_none());
    }

    #[test]
    fn test_all_blank_artists_block_confirm() {
        let (mut machine, _) = reviewing();
        let editor = machine.editor_mut().unwrap();
        editor.update_artist(0, " ");
        editor.update_artist(1, "");

        assert!(matches!(
            machine.confirm_review(),
            Err(FlowError::Validation(ValidationError::NoArtists))
        ));
        assert_eq!(machine.tag(), StageTag::Reviewing);
    }

    #[test]
    fn test_confirm_carries_sanitized_request() {
        let (mut machine, attempt) = reviewing();
        machine.editor_mut().unwrap().remove_artist(1);

        let (confirmed, request) = machine.confirm_review().unwrap();
        assert_eq!(confirmed, attempt);
        assert_eq!(request.event_name, "Field Day");
        assert_eq!(request.artists, vec!["Radiohead"]);
        assert_eq!(machine.tag(), StageTag::CreatingPlaylist);
        assert!(machine.review().is_none());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let (mut machine, attempt) = reviewing();
        machine.cancel_review().unwrap();
        assert_eq!(machine.tag(), StageTag::Idle);
        assert!(machine.attempt() > attempt);
        assert_eq!(machine.active_artifact(), ActiveArtifact::None);
        assert!(machine.cancel_review().is_err());
    }

    #[test]
    fn test_editing_outside_review_is_rejected() {
        let mut machine = WorkflowStateMachine::default();
        assert!(matches!(
            machine.editor_mut(),
            Err(FlowError::InvalidCommand {
                command: "edit_review",
                stage: StageTag::Idle
            })
        ));
    }

    #[test]
    fn test_terminal_artifacts_are_exclusive() {
        let (mut machine, attempt) = reviewing();
        machine.confirm_review().unwrap();
        machine.finish_playlist(attempt, Ok(playlist()));
        assert_eq!(machine.tag(), StageTag::Completed);
        assert!(matches!(machine.active_artifact(), ActiveArtifact::Playlist(_)));
        assert!(machine.error().is_none());

        machine.reset();
        assert_eq!(machine.active_artifact(), ActiveArtifact::None);

        let attempt = machine.select_file(true, Some(lineup())).unwrap();
        machine.begin_extraction(attempt);
        machine.finish_extraction(attempt, Ok(field_day()));
        machine.confirm_review().unwrap();
        let error = WorkflowError::new(
            ErrorKind::PlaylistCreation,
            StageTag::CreatingPlaylist,
            "Failed to create playlist",
        );
        machine.finish_playlist(attempt, Err(error));
        assert!(matches!(machine.active_artifact(), ActiveArtifact::Error(_)));
        assert!(machine.playlist().is_none());
    }

    #[test]
    fn test_stale_playlist_response_after_reset() {
        let (mut machine, attempt) = reviewing();
        machine.confirm_review().unwrap();
        machine.reset();

        assert_eq!(
            machine.finish_playlist(attempt, Ok(playlist())),
            Applied::Superseded
        );
        assert_eq!(machine.tag(), StageTag::Idle);
        assert!(machine.playlist().is_none());
    }

    #[test]
    fn test_end_session_discards_everything() {
        let (mut machine, _) = reviewing();
        machine.end_session();
        assert_eq!(machine.tag(), StageTag::Idle);
        assert!(machine.review().is_none());
        assert!(machine.error().is_none());
    }
}

//! FlowRunner – drives the workflow state machine through its remote calls.
//!
//! The presentation layer talks to the orchestrator through a small command set:
//! [`FlowRunner::submit_file`], [`FlowRunner::confirm_review`],
//! [`FlowRunner::cancel_review`] and [`FlowRunner::retry_or_reset`], plus the
//! session commands and the review edits. It reads state only through
//! [`FlowRunner::snapshot`].
//!
//! ## Attempts and stale responses
//! Every command that starts work records the [`AttemptId`] it was issued under.
//! The state lock is never held across a remote call, so the user can reset
//! (or log out) while a call is outstanding. When the response finally
//! arrives it is handed back together with its attempt id, and the machine
//! drops it if a newer attempt has started in the meantime:
//!
//! ```text
//! submit_file (#1) ──► extract … … … … … … … ► response #1 ─► discarded
//!        retry_or_reset ─► submit_file (#2) ──► extract ─► response #2 ─► Reviewing
//! ```
//!
//! `FlowRunner` is cheap to clone; clones share the same state.

use serde::Serialize;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{FlowError, Result},
    error_channel::{ErrorKind, WorkflowError},
    gateway::RequestGateway,
    launch::{AUTH_FAILED_MESSAGE, RedirectSignal},
    machine::{Applied, DEFAULT_MAX_UPLOAD_BYTES, WorkflowStateMachine},
    model::{PlaylistResult, RedirectTarget, UploadAttempt},
    review::ReviewState,
    session::{Session, SessionGate},
    stage::{AttemptId, StageTag},
    tasks::{AuthClient, LineupExtractor, PlaylistCreator},
};

/// Orchestrator-side settings.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Pause between accepting a file and dispatching the extraction call.
    /// Purely cosmetic; zero disables it.
    pub upload_delay: Duration,
    pub max_upload_bytes: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            upload_delay: Duration::from_millis(800),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Result of a command that went through a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub attempt: AttemptId,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Extraction landed; the review waits for the user.
    WaitingForInput,
    /// Playlist created.
    Completed,
    /// The remote call failed. The message is also in the error channel.
    Failed(String),
    /// A newer attempt took over before the response arrived. Nothing changed.
    Superseded,
}

/// Everything the presentation layer needs to draw the current state.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub run_id: Uuid,
    pub session: Session,
    pub loading: bool,
    pub stage: StageTag,
    pub attempt: AttemptId,
    pub review: Option<ReviewState>,
    pub playlist: Option<PlaylistResult>,
    pub error: Option<WorkflowError>,
    pub can_confirm: bool,
}

#[derive(Debug)]
struct FlowState {
    gate: SessionGate,
    machine: WorkflowStateMachine,
}

#[derive(Clone)]
pub struct FlowRunner {
    run_id: Uuid,
    config: FlowConfig,
    auth: AuthClient,
    extractor: LineupExtractor,
    creator: PlaylistCreator,
    state: Arc<Mutex<FlowState>>,
}

impl FlowRunner {
    pub fn new(gateway: Arc<dyn RequestGateway>, config: FlowConfig) -> Self {
        let state = FlowState {
            gate: SessionGate::new(),
            machine: WorkflowStateMachine::new(config.max_upload_bytes),
        };
        Self {
            run_id: Uuid::new_v4(),
            auth: AuthClient::new(gateway.clone()),
            extractor: LineupExtractor::new(gateway.clone()),
            creator: PlaylistCreator::new(gateway),
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start-up: act on the launch redirect signal, if any.
    pub async fn boot(&self, signal: Option<RedirectSignal>) -> Session {
        match signal {
            Some(RedirectSignal::AuthFailed(reason)) => {
                warn!(run_id = %self.run_id, reason = %reason, "External authorization failed");
                let mut state = self.lock();
                state.gate.sign_out();
                state.machine.end_session();
                state.machine.record_error(WorkflowError::new(
                    ErrorKind::Auth,
                    StageTag::Idle,
                    AUTH_FAILED_MESSAGE,
                ));
                state.gate.session().clone()
            }
            Some(RedirectSignal::AuthSucceeded) | None => self.check_status().await,
        }
    }

    /// Queries the auth service. Fails closed; an unauthenticated result
    /// discards all workflow state. A reply that lands after a sign-out is
    /// dropped and the signed-out session is returned.
    pub async fn check_status(&self) -> Session {
        let generation = self.lock().gate.generation();
        let session = self.auth.check_status().await;
        let mut state = self.lock();
        if state.gate.resolve(generation, session) == Some(true) {
            state.machine.end_session();
        }
        state.gate.session().clone()
    }

    /// Fetches the external authorization URL. On failure the error channel
    /// carries an `Auth` error and `None` is returned.
    pub async fn begin_login(&self) -> Result<Option<RedirectTarget>> {
        {
            let mut state = self.lock();
            if state.gate.is_authenticated() {
                return Err(FlowError::InvalidCommand {
                    command: "begin_login",
                    stage: state.machine.tag(),
                });
            }
            state.machine.clear_error();
        }

        match self.auth.begin_login().await {
            Ok(target) => Ok(Some(target)),
            Err(error) => {
                self.lock().machine.record_error(error);
                Ok(None)
            }
        }
    }

    /// Logs out. The local session ends whether or not the remote call succeeds.
    pub async fn end_session(&self) {
        {
            let mut state = self.lock();
            state.gate.sign_out();
            state.machine.end_session();
        }
        self.auth.end_session().await;
    }

    /// `Idle → Uploading → Extracting → Reviewing | Failed`.
    pub async fn submit_file(&self, file: Option<UploadAttempt>) -> Result<ExecutionResult> {
        let attempt = {
            let mut state = self.lock();
            let authenticated = state.gate.is_authenticated();
            state.machine.select_file(authenticated, file)?
        };

        if !self.config.upload_delay.is_zero() {
            tokio::time::sleep(self.config.upload_delay).await;
        }

        let upload = self.lock().machine.begin_extraction(attempt);
        let Some(upload) = upload else {
            return Ok(ExecutionResult {
                attempt,
                status: ExecutionStatus::Superseded,
            });
        };

        let outcome = self.extractor.extract(upload).await;

        let state = &mut *self.lock();
        let applied = state.machine.finish_extraction(attempt, outcome);
        Ok(execution_result(attempt, applied, &state.machine))
    }

    pub fn set_event_name(&self, text: impl Into<String>) -> Result<()> {
        self.lock().machine.editor_mut()?.set_event_name(text);
        Ok(())
    }

    /// `Ok(false)` when the index is out of bounds.
    pub fn update_artist(&self, index: usize, text: impl Into<String>) -> Result<bool> {
        Ok(self.lock().machine.editor_mut()?.update_artist(index, text))
    }

    pub fn remove_artist(&self, index: usize) -> Result<Option<String>> {
        Ok(self.lock().machine.editor_mut()?.remove_artist(index))
    }

    /// `Reviewing → CreatingPlaylist → Completed | Failed`.
    ///
    /// Validation failures return [`FlowError::Validation`] and leave the
    /// review untouched.
    pub async fn confirm_review(&self) -> Result<ExecutionResult> {
        let (attempt, request) = self.lock().machine.confirm_review()?;

        let outcome = self
            .creator
            .create(&request.event_name, &request.artists)
            .await;

        let state = &mut *self.lock();
        let applied = state.machine.finish_playlist(attempt, outcome);
        Ok(execution_result(attempt, applied, &state.machine))
    }

    pub fn cancel_review(&self) -> Result<()> {
        self.lock().machine.cancel_review()
    }

    /// Back to `Idle`, from any stage. An outstanding call is abandoned.
    pub fn retry_or_reset(&self) {
        self.lock().machine.reset();
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let state = self.lock();
        let machine = &state.machine;
        FlowSnapshot {
            run_id: self.run_id,
            session: state.gate.session().clone(),
            loading: state.gate.is_loading(),
            stage: machine.tag(),
            attempt: machine.attempt(),
            review: machine.review().cloned(),
            playlist: machine.playlist().cloned(),
            error: machine.error().cloned(),
            can_confirm: machine.can_confirm(),
        }
    }
}

fn execution_result(
    attempt: AttemptId,
    applied: Applied,
    machine: &WorkflowStateMachine,
) -> ExecutionResult {
    let status = match applied {
        Applied::Superseded => ExecutionStatus::Superseded,
        Applied::Accepted(StageTag::Reviewing) => ExecutionStatus::WaitingForInput,
        Applied::Accepted(StageTag::Completed) => ExecutionStatus::Completed,
        Applied::Accepted(stage) => {
            let message = machine
                .error()
                .map(|error| error.message.clone())
                .unwrap_or_default();
            info!(attempt = %attempt, stage = %stage, "Attempt failed");
            ExecutionStatus::Failed(message)
        }
    };
    ExecutionResult { attempt, status }
}

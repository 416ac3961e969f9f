//! # lineup-flow
//!
//! Orchestrates the lineup-to-playlist workflow: a lineup image is uploaded,
//! the extracted event name and artists are reviewed by the user, and the
//! confirmed list is turned into a playlist by a remote service.
//!
//! ## Core pieces
//! - [`SessionGate`] holds the authentication state. The workflow only runs
//!   while it is signed in.
//! - [`WorkflowStateMachine`] owns the [`Stage`] and its payload and is the
//!   only thing that changes it.
//! - [`ReviewEditor`] edits the extracted list between extraction and
//!   confirmation.
//! - [`ErrorChannel`] keeps the single visible [`WorkflowError`].
//! - [`RequestGateway`] is the seam to the backend; [`AuthClient`],
//!   [`LineupExtractor`] and [`PlaylistCreator`] adapt its failures.
//! - [`FlowRunner`] ties these together behind a small command set and hands
//!   out [`FlowSnapshot`]s for rendering.
//!
//! ## Quick example
//! ```rust,no_run
//! use lineup_flow::{FlowConfig, FlowRunner, RequestGateway, UploadAttempt};
//! use std::sync::Arc;
//!
//! # async fn example(gateway: Arc<dyn RequestGateway>, image: Vec<u8>) -> lineup_flow::Result<()> {
//! let runner = FlowRunner::new(gateway, FlowConfig::default());
//! runner.boot(None).await;
//!
//! let upload = UploadAttempt::new("lineup.png", image, Some("image/png".to_string()));
//! runner.submit_file(Some(upload)).await?;
//! runner.remove_artist(0)?;
//! runner.confirm_review().await?;
//!
//! if let Some(playlist) = runner.snapshot().playlist {
//!     println!("{}", playlist.summary());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod error_channel;
pub mod gateway;
pub mod launch;
pub mod machine;
pub mod model;
pub mod review;
pub mod runner;
pub mod session;
pub mod stage;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use error::{FlowError, GatewayError, GatewayResult, Result, ValidationError};
pub use error_channel::{ErrorChannel, ErrorKind, WorkflowError};
pub use gateway::RequestGateway;
pub use launch::{AUTH_FAILED_MESSAGE, LaunchAddress, RedirectSignal};
pub use machine::{ActiveArtifact, Applied, DEFAULT_MAX_UPLOAD_BYTES, WorkflowStateMachine};
pub use model::{
    AuthStatus, ExtractionResult, PlaylistRequest, PlaylistResult, RedirectTarget,
    UploadAttempt, UserProfile,
};
pub use review::{ReviewEditor, ReviewState};
pub use runner::{ExecutionResult, ExecutionStatus, FlowConfig, FlowRunner, FlowSnapshot};
pub use session::{Session, SessionGate};
pub use stage::{AttemptId, Stage, StageTag};
pub use tasks::{AuthClient, LineupExtractor, PlaylistCreator};

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::GatewayError,
    error_channel::{ErrorKind, WorkflowError},
    gateway::RequestGateway,
    model::{PlaylistRequest, PlaylistResult},
    stage::StageTag,
};

pub const PLAYLIST_FAILED_MESSAGE: &str = "Failed to create playlist";

/// Thin adapter over the playlist call. The remote resolves artists to tracks
/// and is the only authority on the resulting playlist.
#[derive(Clone)]
pub struct PlaylistCreator {
    gateway: Arc<dyn RequestGateway>,
}

impl PlaylistCreator {
    pub fn new(gateway: Arc<dyn RequestGateway>) -> Self {
        Self { gateway }
    }

    pub async fn create(
        &self,
        event_name: &str,
        artists: &[String],
    ) -> Result<PlaylistResult, WorkflowError> {
        let request = PlaylistRequest {
            event_name: event_name.to_string(),
            artists: artists.to_vec(),
        };
        info!(
            event = %request.event_name,
            artists = request.artists.len(),
            "Creating playlist"
        );

        match self.gateway.create_playlist(&request).await {
            Ok(result) => {
                info!(
                    playlist = %result.playlist_name,
                    tracks_added = result.tracks_added,
                    "Playlist created"
                );
                Ok(result)
            }
            Err(e) => {
                warn!("Playlist creation failed: {}", e);
                Err(playlist_error(&e))
            }
        }
    }
}

fn playlist_error(error: &GatewayError) -> WorkflowError {
    let message = error
        .remote_message()
        .unwrap_or(PLAYLIST_FAILED_MESSAGE)
        .to_string();
    WorkflowError::new(ErrorKind::PlaylistCreation, StageTag::CreatingPlaylist, message)
}

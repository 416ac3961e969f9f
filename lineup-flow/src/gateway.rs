use async_trait::async_trait;

use crate::{
    error::GatewayResult,
    model::{AuthStatus, ExtractionResult, PlaylistRequest, PlaylistResult, UploadAttempt},
};

/// Remote operations the orchestrator depends on.
///
/// Implementations own no workflow state. Session binding (cookies, tokens)
/// is the implementation's business.
#[async_trait]
pub trait RequestGateway: Send + Sync {
    async fn auth_status(&self) -> GatewayResult<AuthStatus>;

    /// Returns the external authorization URL.
    async fn login_url(&self) -> GatewayResult<String>;

    async fn logout(&self) -> GatewayResult<()>;

    /// Uploads the lineup image and returns the extracted event and artists.
    async fn extract(&self, upload: UploadAttempt) -> GatewayResult<ExtractionResult>;

    async fn create_playlist(&self, request: &PlaylistRequest) -> GatewayResult<PlaylistResult>;
}

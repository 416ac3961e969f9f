use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::GatewayError,
    error_channel::{ErrorKind, WorkflowError},
    gateway::RequestGateway,
    model::{ExtractionResult, UploadAttempt},
    stage::StageTag,
};

pub const EXTRACTION_FAILED_MESSAGE: &str = "Failed to process image";

/// Sends the lineup image to the extraction service.
#[derive(Clone)]
pub struct LineupExtractor {
    gateway: Arc<dyn RequestGateway>,
}

impl LineupExtractor {
    pub fn new(gateway: Arc<dyn RequestGateway>) -> Self {
        Self { gateway }
    }

    pub async fn extract(&self, upload: UploadAttempt) -> Result<ExtractionResult, WorkflowError> {
        info!(
            file = %upload.file_name,
            size_bytes = upload.size_bytes(),
            "Uploading lineup image for extraction"
        );

        match self.gateway.extract(upload).await {
            Ok(extraction) => {
                info!(
                    event = %extraction.event_name,
                    artists = extraction.artists.len(),
                    "Extraction finished"
                );
                Ok(extraction)
            }
            Err(e) => {
                warn!("Extraction failed: {}", e);
                Err(extraction_error(&e))
            }
        }
    }
}

/// A transport failure is an upload failure; anything the remote answered is
/// an extraction failure. The remote's own message wins over the fallback.
fn extraction_error(error: &GatewayError) -> WorkflowError {
    let kind = match error {
        GatewayError::Transport(_) => ErrorKind::Upload,
        GatewayError::Remote { .. } | GatewayError::Malformed(_) => ErrorKind::Extraction,
    };
    let message = error
        .remote_message()
        .unwrap_or(EXTRACTION_FAILED_MESSAGE)
        .to_string();
    WorkflowError::new(kind, StageTag::Extracting, message)
}

use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::{
    error_channel::{ErrorKind, WorkflowError},
    gateway::RequestGateway,
    model::RedirectTarget,
    session::Session,
    stage::StageTag,
};

pub const LOGIN_FAILED_MESSAGE: &str = "Failed to initiate login";

/// Remote half of the session gate: status check, login URL, logout.
#[derive(Clone)]
pub struct AuthClient {
    gateway: Arc<dyn RequestGateway>,
}

impl AuthClient {
    pub fn new(gateway: Arc<dyn RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Fails closed: any error yields a signed-out session and no banner.
    pub async fn check_status(&self) -> Session {
        match self.gateway.auth_status().await {
            Ok(status) => Session::from(status),
            Err(e) => {
                warn!("Auth status check failed, treating as signed out: {}", e);
                Session::signed_out()
            }
        }
    }

    pub async fn begin_login(&self) -> Result<RedirectTarget, WorkflowError> {
        let raw = self.gateway.login_url().await.map_err(|e| {
            warn!("Login URL fetch failed: {}", e);
            login_failed()
        })?;

        let url = Url::parse(raw.trim()).map_err(|e| {
            warn!("Login URL `{}` did not parse: {}", raw, e);
            login_failed()
        })?;

        info!("Redirecting to external authorization");
        Ok(RedirectTarget(url))
    }

    /// Best-effort: failures are logged and otherwise ignored.
    pub async fn end_session(&self) {
        match self.gateway.logout().await {
            Ok(()) => info!("Logged out"),
            Err(e) => warn!("Logout failed: {}", e),
        }
    }
}

fn login_failed() -> WorkflowError {
    WorkflowError::new(ErrorKind::Auth, StageTag::Idle, LOGIN_FAILED_MESSAGE)
}

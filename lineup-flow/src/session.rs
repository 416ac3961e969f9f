use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{AuthStatus, UserProfile};

/// Authentication status as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    pub authenticated: bool,
    pub profile: Option<UserProfile>,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// `"Hey {name}!"`, or a generic line when the service gave no display name.
    /// `None` while signed out.
    pub fn greeting(&self) -> Option<String> {
        if !self.authenticated {
            return None;
        }
        let name = self
            .profile
            .as_ref()
            .and_then(|profile| profile.display_name.as_deref())
            .filter(|name| !name.trim().is_empty());
        Some(match name {
            Some(name) => format!("Hey {}!", name),
            None => "Logged in".to_string(),
        })
    }
}

impl From<AuthStatus> for Session {
    fn from(status: AuthStatus) -> Self {
        if status.authenticated {
            Self {
                authenticated: true,
                profile: status.user,
            }
        } else {
            Self::signed_out()
        }
    }
}

/// Holds the session and gates the workflow on it.
///
/// Starts out loading; the first resolved status check (or an auth failure
/// signal at launch) ends loading.
///
/// Every sign-out starts a new generation. A status check records the
/// generation it was issued under and its reply is dropped once a sign-out
/// has happened in between.
#[derive(Debug, Clone)]
pub struct SessionGate {
    session: Session,
    loading: bool,
    generation: u64,
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            session: Session::signed_out(),
            loading: true,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Installs the reply of a status check issued under `generation`.
    ///
    /// Returns `None` when a sign-out happened after the check was issued; the
    /// reply is dropped then. Otherwise returns `Some(true)` when the result is
    /// unauthenticated, i.e. the workflow must be reset.
    pub fn resolve(&mut self, generation: u64, session: Session) -> Option<bool> {
        if generation != self.generation {
            info!(
                issued = generation,
                current = self.generation,
                "Discarding status reply issued before sign-out"
            );
            return None;
        }
        self.loading = false;
        if session.authenticated {
            info!("Session authenticated");
        } else {
            info!("Session not authenticated");
        }
        let crosses_boundary = !session.authenticated;
        self.session = session;
        Some(crosses_boundary)
    }

    pub fn sign_out(&mut self) {
        self.loading = false;
        self.generation += 1;
        self.session = Session::signed_out();
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

//! Scripted gateway for orchestrator tests.

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::sync::oneshot;

use crate::{
    error::{GatewayError, GatewayResult},
    gateway::RequestGateway,
    model::{
        AuthStatus, ExtractionResult, PlaylistRequest, PlaylistResult, UploadAttempt, UserProfile,
    },
    runner::{FlowConfig, FlowRunner},
    stage::StageTag,
};

enum Reply<T> {
    Ready(GatewayResult<T>),
    Pending(oneshot::Receiver<GatewayResult<T>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> GatewayResult<T> {
        match self {
            Reply::Ready(result) => result,
            Reply::Pending(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(GatewayError::Transport("reply dropped".to_string()))),
        }
    }
}

struct Script {
    auth: VecDeque<Reply<AuthStatus>>,
    login: GatewayResult<String>,
    logout: GatewayResult<()>,
    extractions: VecDeque<Reply<ExtractionResult>>,
    playlists: VecDeque<Reply<PlaylistResult>>,
    uploads: Vec<UploadAttempt>,
    playlist_requests: Vec<PlaylistRequest>,
    logout_calls: usize,
    auth_calls: usize,
}

/// Replies are queued per operation and consumed in call order. An empty
/// queue answers with a transport error.
pub(crate) struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                auth: VecDeque::new(),
                login: Ok("https://accounts.example.com/authorize?client_id=abc".to_string()),
                logout: Ok(()),
                extractions: VecDeque::new(),
                playlists: VecDeque::new(),
                uploads: Vec::new(),
                playlist_requests: Vec::new(),
                logout_calls: 0,
                auth_calls: 0,
            }),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push_auth(&self, status: GatewayResult<AuthStatus>) {
        self.script().auth.push_back(Reply::Ready(status));
    }

    pub(crate) fn pending_auth(&self) -> oneshot::Sender<GatewayResult<AuthStatus>> {
        let (sender, receiver) = oneshot::channel();
        self.script().auth.push_back(Reply::Pending(receiver));
        sender
    }

    pub(crate) fn set_login(&self, reply: GatewayResult<String>) {
        self.script().login = reply;
    }

    pub(crate) fn set_logout(&self, reply: GatewayResult<()>) {
        self.script().logout = reply;
    }

    pub(crate) fn push_extraction(&self, reply: GatewayResult<ExtractionResult>) {
        self.script().extractions.push_back(Reply::Ready(reply));
    }

    pub(crate) fn pending_extraction(&self) -> oneshot::Sender<GatewayResult<ExtractionResult>> {
        let (sender, receiver) = oneshot::channel();
        self.script().extractions.push_back(Reply::Pending(receiver));
        sender
    }

    pub(crate) fn push_playlist(&self, reply: GatewayResult<PlaylistResult>) {
        self.script().playlists.push_back(Reply::Ready(reply));
    }

    pub(crate) fn pending_playlist(&self) -> oneshot::Sender<GatewayResult<PlaylistResult>> {
        let (sender, receiver) = oneshot::channel();
        self.script().playlists.push_back(Reply::Pending(receiver));
        sender
    }

    pub(crate) fn uploads(&self) -> Vec<UploadAttempt> {
        self.script().uploads.clone()
    }

    pub(crate) fn playlist_requests(&self) -> Vec<PlaylistRequest> {
        self.script().playlist_requests.clone()
    }

    pub(crate) fn logout_calls(&self) -> usize {
        self.script().logout_calls
    }

    pub(crate) fn auth_calls(&self) -> usize {
        self.script().auth_calls
    }
}

fn unscripted<T>(operation: &str) -> GatewayResult<T> {
    Err(GatewayError::Transport(format!("no scripted reply for {}", operation)))
}

#[async_trait]
impl RequestGateway for ScriptedGateway {
    async fn auth_status(&self) -> GatewayResult<AuthStatus> {
        let reply = {
            let mut script = self.script();
            script.auth_calls += 1;
            script.auth.pop_front()
        };
        match reply {
            Some(reply) => reply.resolve().await,
            None => unscripted("auth_status"),
        }
    }

    async fn login_url(&self) -> GatewayResult<String> {
        self.script().login.clone()
    }

    async fn logout(&self) -> GatewayResult<()> {
        let mut script = self.script();
        script.logout_calls += 1;
        script.logout.clone()
    }

    async fn extract(&self, upload: UploadAttempt) -> GatewayResult<ExtractionResult> {
        let reply = {
            let mut script = self.script();
            script.uploads.push(upload);
            script.extractions.pop_front()
        };
        match reply {
            Some(reply) => reply.resolve().await,
            None => unscripted("extract"),
        }
    }

    async fn create_playlist(&self, request: &PlaylistRequest) -> GatewayResult<PlaylistResult> {
        let reply = {
            let mut script = self.script();
            script.playlist_requests.push(request.clone());
            script.playlists.pop_front()
        };
        match reply {
            Some(reply) => reply.resolve().await,
            None => unscripted("create_playlist"),
        }
    }
}

pub(crate) fn signed_in() -> AuthStatus {
    AuthStatus {
        authenticated: true,
        user: Some(UserProfile {
            id: Some("user-1".to_string()),
            display_name: Some("Ana".to_string()),
        }),
    }
}

pub(crate) fn lineup_png() -> UploadAttempt {
    UploadAttempt::new("lineup.png", vec![0x89, 0x50, 0x4e, 0x47], Some("image/png".to_string()))
}

pub(crate) fn extraction(event_name: &str, artists: &[&str]) -> ExtractionResult {
    ExtractionResult {
        event_name: event_name.to_string(),
        artists: artists.iter().map(|artist| artist.to_string()).collect(),
    }
}

pub(crate) fn playlist(name: &str, artists: &[&str], tracks_added: u32) -> PlaylistResult {
    PlaylistResult {
        playlist_name: name.to_string(),
        playlist_url: "https://open.spotify.com/playlist/37i9dQZF1DX"
            .parse()
            .expect("static url"),
        tracks_added,
        artists_found: artists.iter().map(|artist| artist.to_string()).collect(),
    }
}

pub(crate) fn runner(gateway: std::sync::Arc<ScriptedGateway>) -> FlowRunner {
    runner_with_delay(gateway, Duration::ZERO)
}

pub(crate) fn runner_with_delay(
    gateway: std::sync::Arc<ScriptedGateway>,
    upload_delay: Duration,
) -> FlowRunner {
    FlowRunner::new(
        gateway,
        FlowConfig {
            upload_delay,
            ..FlowConfig::default()
        },
    )
}

/// Yields until the runner reaches `stage` under an attempt of at least `attempt`.
pub(crate) async fn wait_for(runner: &FlowRunner, stage: StageTag, attempt: u64) {
    for _ in 0..1_000 {
        let snapshot = runner.snapshot();
        if snapshot.stage == stage && snapshot.attempt.get() >= attempt {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("runner never reached {} for attempt {}", stage, attempt);
}

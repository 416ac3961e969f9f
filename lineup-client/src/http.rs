use async_trait::async_trait;
use lineup_flow::{
    AuthStatus, ExtractionResult, GatewayError, GatewayResult, PlaylistRequest, PlaylistResult,
    RequestGateway, UploadAttempt,
};
use reqwest::{
    Client, Response,
    header::{COOKIE, HeaderMap, HeaderValue},
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::ClientConfig;

const AUTH_STATUS_PATH: &str = "auth/status";
const AUTH_LOGIN_PATH: &str = "auth/login";
const AUTH_LOGOUT_PATH: &str = "auth/logout";
const UPLOAD_PATH: &str = "upload";
const CREATE_PLAYLIST_PATH: &str = "create-playlist";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    auth_url: String,
}

/// [`RequestGateway`] over the backend REST API.
///
/// The backend session is cookie-bound: cookies set by the backend are kept in
/// the client's store, and a configured session cookie is sent on every call.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        }

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base: config.api_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> GatewayResult<Url> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Transport(format!("invalid endpoint `{}`: {}", path, e)))
    }
}

#[async_trait]
impl RequestGateway for HttpGateway {
    async fn auth_status(&self) -> GatewayResult<AuthStatus> {
        let response = self
            .client
            .get(self.endpoint(AUTH_STATUS_PATH)?)
            .send()
            .await
            .map_err(transport)?;
        decode_json(response).await
    }

    async fn login_url(&self) -> GatewayResult<String> {
        let response = self
            .client
            .get(self.endpoint(AUTH_LOGIN_PATH)?)
            .send()
            .await
            .map_err(transport)?;
        let login: LoginResponse = decode_json(response).await?;
        Ok(login.auth_url)
    }

    async fn logout(&self) -> GatewayResult<()> {
        let response = self
            .client
            .post(self.endpoint(AUTH_LOGOUT_PATH)?)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Remote {
                status: Some(status.as_u16()),
                message: error_message(&body),
            })
        }
    }

    async fn extract(&self, upload: UploadAttempt) -> GatewayResult<ExtractionResult> {
        let size_bytes = upload.size_bytes();
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(mime) = upload.mime_hint.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|e| GatewayError::Transport(format!("invalid mime type: {}", e)))?;
        }
        let form = Form::new().part("file", part);

        debug!(size_bytes, "Posting lineup image");
        let response = self
            .client
            .post(self.endpoint(UPLOAD_PATH)?)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        decode_envelope(response).await
    }

    async fn create_playlist(&self, request: &PlaylistRequest) -> GatewayResult<PlaylistResult> {
        let response = self
            .client
            .post(self.endpoint(CREATE_PLAYLIST_PATH)?)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let result: PlaylistResult = decode_envelope(response).await?;
        info!(playlist = %result.playlist_url, "Backend created playlist");
        Ok(result)
    }
}

fn transport(error: reqwest::Error) -> GatewayError {
    GatewayError::Transport(error.to_string())
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

/// Plain JSON endpoints: any 2xx body must parse as `T`.
async fn decode_json<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if !status.is_success() {
        return Err(GatewayError::Remote {
            status: Some(status.as_u16()),
            message: error_message(&body),
        });
    }
    serde_json::from_str(&body).map_err(|e| GatewayError::Malformed(e.to_string()))
}

/// Workflow endpoints answer `{success: bool, error?: string, ...payload}`.
/// Only a 2xx with `success: true` counts as success.
async fn decode_envelope<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) if status.is_success() => return Err(GatewayError::Malformed(e.to_string())),
        Err(_) => {
            return Err(GatewayError::Remote {
                status: Some(status.as_u16()),
                message: None,
            });
        }
    };

    let succeeded = status.is_success()
        && value
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    if !succeeded {
        return Err(GatewayError::Remote {
            status: Some(status.as_u16()),
            message: value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    serde_json::from_value(value).map_err(|e| GatewayError::Malformed(e.to_string()))
}

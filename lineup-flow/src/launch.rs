use tracing::debug;
use url::Url;

pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Please try again.";

const AUTH_PARAM: &str = "auth";
const ERROR_PARAM: &str = "error";

/// Outcome of the external authorization redirect, read from the launch address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectSignal {
    AuthSucceeded,
    AuthFailed(String),
}

/// The address the process was started with.
///
/// The redirect parameters are read and stripped exactly once so that a
/// reload does not replay them.
#[derive(Debug, Clone)]
pub struct LaunchAddress {
    url: Url,
    consumed: bool,
}

impl LaunchAddress {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            consumed: false,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(raw)?))
    }

    /// Address as it should be shown after the signal has been taken.
    pub fn visible(&self) -> &Url {
        &self.url
    }

    pub fn take_signal(&mut self) -> Option<RedirectSignal> {
        if self.consumed {
            return None;
        }
        self.consumed = true;

        let mut signal = None;
        let mut failure = None;
        let mut kept = Vec::new();
        for (key, value) in self.url.query_pairs() {
            if key == AUTH_PARAM {
                if value == "success" {
                    signal = Some(RedirectSignal::AuthSucceeded);
                }
            } else if key == ERROR_PARAM {
                failure = Some(value.into_owned());
            } else {
                kept.push((key.into_owned(), value.into_owned()));
            }
        }
        let signal = signal.or(failure.map(RedirectSignal::AuthFailed));

        if kept.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(kept);
        }

        debug!(signal = ?signal, address = %self.url, "Launch address consumed");
        signal
    }
}

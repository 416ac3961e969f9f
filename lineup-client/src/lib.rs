pub mod config;
pub mod http;
pub mod terminal;

pub use config::{ClientConfig, ConfigError};
pub use http::HttpGateway;
pub use terminal::{ReviewCommand, ensure_succeeded, mime_hint_for, render};

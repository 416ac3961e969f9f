pub mod auth;
pub mod extraction;
pub mod playlist;

pub use auth::AuthClient;
pub use extraction::LineupExtractor;
pub use playlist::PlaylistCreator;

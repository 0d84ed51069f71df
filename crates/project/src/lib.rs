//! Sync side of the NLE timeline editor: the backend contract, its HTTP
//! client, client configuration, and the editing session that owns the
//! in-memory project.

use std::path::PathBuf;

mod api;
mod config;
mod error;
mod playback;
mod session;

pub use api::{CreateProjectRequest, HttpTimelineApi, ProjectResponse, RegenerateRequest, RegenerateResponse, TimelineApi};
pub use config::ClientConfig;
pub use error::SyncError;
pub use playback::Playback;
pub use session::{NleSession, SyncStatus};

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| std::env::temp_dir());
    base.join("nle_studio")
}

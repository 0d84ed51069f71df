use thiserror::Error;

mod edit;
mod manifest;
mod model;

pub use edit::{ClipPatch, SplitIds};
pub use manifest::{AssetCandidate, BgmManifest, DialogueManifest, RunArtifactsManifest, SfxManifest, ShotManifest};
pub use model::{Bindings, Clip, ClipKind, ClipMeta, Resolution, Seconds, Timeline, Track, TrackType};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimelineError {
    #[error("invalid operation: {0}")]
    InvalidOp(String),

    #[error("invalid range for clip {clip_id}: start {start} must be before end {end}")]
    InvalidRange { clip_id: String, start: Seconds, end: Seconds },

    #[error("invalid value for clip {clip_id}: {field} = {value}")]
    InvalidValue { clip_id: String, field: &'static str, value: f64 },

    #[error("clip {clip_id} references unknown track {track_id}")]
    UnknownTrack { clip_id: String, track_id: String },
}

pub type TimelineResult<T> = Result<T, TimelineError>;

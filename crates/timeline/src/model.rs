use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{TimelineError, TimelineResult};

pub type Seconds = f64;

/// Binding key (shot id, dialogue id, ...) to the clip ids placed for it.
pub type Bindings = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub w: u32,
    pub h: u32,
}

impl Resolution {
    pub const fn new(w: u32, h: u32) -> Self { Self { w, h } }
}

impl Default for Resolution {
    fn default() -> Self { Self::new(1280, 720) }
}

/// Track type. The backend treats this as a free-form string, so types the
/// editor does not know about load as `Other` and are written back as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Text,
    Storyboard,
    Overlay,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: String,
    #[serde(rename = "type")]
    pub kind: TrackType,
    pub name: String,
    pub order: i32,
}

impl Track {
    pub fn new(track_id: impl Into<String>, kind: TrackType, name: impl Into<String>, order: i32) -> Self {
        Self { track_id: track_id.into(), kind, name: name.into(), order }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Video,
    Audio,
    Text,
    Storyboard,
}

/// Open metadata bag carried by a clip. The JSON object is kept verbatim,
/// explicit `null`s included, so an unedited clip saves back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipMeta(Map<String, Value>);

impl ClipMeta {
    pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

    /// String value of `key`; `None` when absent, `null`, or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> { self.0.get(key).and_then(Value::as_str) }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) { self.0.insert(key.into(), value.into()); }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn shot_id(&self) -> Option<&str> { self.get_str("shot_id") }
    pub fn dialogue_id(&self) -> Option<&str> { self.get_str("dialogue_id") }
    pub fn title(&self) -> Option<&str> { self.get_str("title") }
    pub fn url(&self) -> Option<&str> { self.get_str("url") }

    pub fn as_map(&self) -> &Map<String, Value> { &self.0 }
}

impl From<Map<String, Value>> for ClipMeta {
    fn from(map: Map<String, Value>) -> Self { Self(map) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub clip_id: String,
    pub track_id: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    pub kind: ClipKind,
    pub start: Seconds,
    pub end: Seconds,
    #[serde(default)]
    pub offset_in_asset: Seconds,
    #[serde(default = "unit")]
    pub speed: f64,
    #[serde(default = "unit")]
    pub volume: f64,
    #[serde(default)]
    pub fade_in: Seconds,
    #[serde(default)]
    pub fade_out: Seconds,
    #[serde(default)]
    pub meta: ClipMeta,
}

fn unit() -> f64 { 1.0 }

impl Clip {
    pub fn new(
        clip_id: impl Into<String>,
        track_id: impl Into<String>,
        kind: ClipKind,
        start: Seconds,
        end: Seconds,
    ) -> Self {
        Self {
            clip_id: clip_id.into(),
            track_id: track_id.into(),
            asset_id: None,
            kind,
            start,
            end,
            offset_in_asset: 0.0,
            speed: 1.0,
            volume: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            meta: ClipMeta::default(),
        }
    }

    pub fn duration(&self) -> Seconds { self.end - self.start }

    /// Checks the per-clip invariants: a finite, non-empty time range and
    /// sane playback parameters.
    pub fn check(&self) -> TimelineResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.end <= self.start {
            return Err(TimelineError::InvalidRange { clip_id: self.clip_id.clone(), start: self.start, end: self.end });
        }
        let fields = [
            ("offset_in_asset", self.offset_in_asset, self.offset_in_asset.is_finite()),
            ("speed", self.speed, self.speed.is_finite() && self.speed > 0.0),
            ("volume", self.volume, self.volume.is_finite() && self.volume >= 0.0),
            ("fade_in", self.fade_in, self.fade_in.is_finite() && self.fade_in >= 0.0),
            ("fade_out", self.fade_out, self.fade_out.is_finite() && self.fade_out >= 0.0),
        ];
        for (field, value, ok) in fields {
            if !ok {
                return Err(TimelineError::InvalidValue { clip_id: self.clip_id.clone(), field, value });
            }
        }
        Ok(())
    }
}

/// The editable project body. Its JSON form is the `payload` object of a
/// project response and the body of a save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub run_id: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub bindings: Bindings,
    #[serde(default)]
    pub total_duration_sec: Seconds,
}

fn default_fps() -> u32 { 24 }

impl Default for Timeline {
    fn default() -> Self { Self::new("") }
}

impl Timeline {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            fps: default_fps(),
            resolution: Resolution::default(),
            tracks: Vec::new(),
            clips: Vec::new(),
            bindings: Bindings::new(),
            total_duration_sec: 0.0,
        }
    }

    pub fn add_track(&mut self, track: Track) { self.tracks.push(track); }

    pub fn add_clip(&mut self, clip: Clip) { self.clips.push(clip); }

    /// Tracks ascending by `order`; equal orders keep their storage order.
    pub fn sorted_tracks(&self) -> Vec<&Track> {
        let mut out: Vec<&Track> = self.tracks.iter().collect();
        out.sort_by_key(|t| t.order);
        out
    }

    /// Clips placed on `track_id`, in storage order (not time order).
    pub fn clips_for_track<'a>(&'a self, track_id: &'a str) -> impl Iterator<Item = &'a Clip> + 'a {
        self.clips.iter().filter(move |c| c.track_id == track_id)
    }

    pub fn track(&self, track_id: &str) -> Option<&Track> { self.tracks.iter().find(|t| t.track_id == track_id) }

    pub fn clip(&self, clip_id: &str) -> Option<&Clip> { self.clips.iter().find(|c| c.clip_id == clip_id) }

    pub(crate) fn clip_index(&self, clip_id: &str) -> Option<usize> { self.clips.iter().position(|c| c.clip_id == clip_id) }

    /// Latest clip end, or zero for an empty timeline.
    pub fn computed_end(&self) -> Seconds { self.clips.iter().map(|c| c.end).fold(0.0, f64::max) }

    /// Whole-project consistency check: unique ids, clips on existing
    /// tracks, and every clip passing [`Clip::check`]. Returns the first
    /// violation found.
    pub fn validate(&self) -> TimelineResult<()> {
        let mut track_ids = HashSet::new();
        for t in &self.tracks {
            if !track_ids.insert(t.track_id.as_str()) {
                return Err(TimelineError::InvalidOp(format!("duplicate track id {}", t.track_id)));
            }
        }
        let mut clip_ids = HashSet::new();
        for c in &self.clips {
            if !clip_ids.insert(c.clip_id.as_str()) {
                return Err(TimelineError::InvalidOp(format!("duplicate clip id {}", c.clip_id)));
            }
            if !track_ids.contains(c.track_id.as_str()) {
                return Err(TimelineError::UnknownTrack { clip_id: c.clip_id.clone(), track_id: c.track_id.clone() });
            }
            c.check()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Timeline {
        let mut tl = Timeline::new("run-1");
        tl.add_track(Track::new("t-bgm", TrackType::Audio, "BGM", 4));
        tl.add_track(Track::new("t-video", TrackType::Video, "Video Clips", 1));
        tl.add_track(Track::new("t-subtitle", TrackType::Text, "Subtitles", 1));
        tl.add_track(Track::new("t-storyboard", TrackType::Storyboard, "Storyboard", 0));
        tl.add_clip(Clip::new("c-2", "t-video", ClipKind::Video, 5.0, 9.0));
        tl.add_clip(Clip::new("c-bgm", "t-bgm", ClipKind::Audio, 0.0, 12.0));
        tl.add_clip(Clip::new("c-1", "t-video", ClipKind::Video, 0.0, 5.0));
        tl
    }

    #[test]
    fn sorted_tracks_is_non_decreasing_and_stable() {
        let tl = sample();
        let ids: Vec<&str> = tl.sorted_tracks().iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, vec!["t-storyboard", "t-video", "t-subtitle", "t-bgm"]);
        // storage order is untouched
        assert_eq!(tl.tracks[0].track_id, "t-bgm");
    }

    #[test]
    fn clips_for_track_keeps_storage_order() {
        let tl = sample();
        let ids: Vec<&str> = tl.clips_for_track("t-video").map(|c| c.clip_id.as_str()).collect();
        assert_eq!(ids, vec!["c-2", "c-1"]);
        assert_eq!(tl.clips_for_track("t-missing").count(), 0);
    }

    #[test]
    fn computed_end_is_latest_clip_end() {
        assert_eq!(sample().computed_end(), 12.0);
        assert_eq!(Timeline::new("r").computed_end(), 0.0);
    }

    #[test]
    fn clip_defaults_fill_missing_wire_fields() {
        let clip: Clip = serde_json::from_value(json!({
            "clip_id": "c-sfx-a1",
            "track_id": "t-sfx",
            "kind": "audio",
            "start": 1.5,
            "end": 3.5,
            "meta": {"url": "s3://sfx/a1.wav", "shot_id": null, "at": 0.25}
        }))
        .unwrap();
        assert_eq!(clip.asset_id, None);
        assert_eq!(clip.speed, 1.0);
        assert_eq!(clip.volume, 1.0);
        assert_eq!(clip.offset_in_asset, 0.0);
        assert_eq!(clip.meta.url(), Some("s3://sfx/a1.wav"));
        assert_eq!(clip.meta.shot_id(), None);
        assert_eq!(clip.meta.get("at"), Some(&json!(0.25)));
    }

    #[test]
    fn meta_keeps_explicit_nulls_on_save() {
        let meta = json!({"url": "s3://sfx/a1.wav", "shot_id": null});
        let clip: Clip = serde_json::from_value(json!({
            "clip_id": "c-sfx-a1",
            "track_id": "t-sfx",
            "kind": "audio",
            "start": 1.5,
            "end": 3.5,
            "meta": meta.clone()
        }))
        .unwrap();
        assert_eq!(clip.meta.shot_id(), None);
        let value = serde_json::to_value(&clip).unwrap();
        assert_eq!(value["meta"], meta);
    }

    #[test]
    fn meta_extra_keys_survive_serialization() {
        let meta = ClipMeta::default().with("title", "Opening").with("mood", "tense");
        assert_eq!(meta.title(), Some("Opening"));
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value, json!({"title": "Opening", "mood": "tense"}));
    }

    #[test]
    fn track_type_uses_lowercase_wire_name() {
        let t = Track::new("t-ov", TrackType::Overlay, "Overlay", 6);
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["type"], json!("overlay"));
    }

    #[test]
    fn unknown_track_type_round_trips() {
        let wire = json!({"track_id": "t-fx", "type": "effects", "name": "FX", "order": 7});
        let t: Track = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(t.kind, TrackType::Other("effects".into()));
        assert_eq!(serde_json::to_value(&t).unwrap(), wire);

        let known: Track = serde_json::from_value(json!({"track_id": "t-v", "type": "video", "name": "V", "order": 1})).unwrap();
        assert_eq!(known.kind, TrackType::Video);
    }

    #[test]
    fn validate_reports_dangling_track_and_duplicates() {
        let mut tl = sample();
        assert!(tl.validate().is_ok());

        tl.add_clip(Clip::new("c-x", "t-nowhere", ClipKind::Text, 0.0, 1.0));
        assert!(matches!(tl.validate(), Err(TimelineError::UnknownTrack { .. })));
        tl.clips.pop();

        tl.add_clip(Clip::new("c-1", "t-video", ClipKind::Video, 9.0, 10.0));
        assert!(matches!(tl.validate(), Err(TimelineError::InvalidOp(_))));
    }

    #[test]
    fn check_rejects_empty_range_and_bad_speed() {
        let mut c = Clip::new("c", "t", ClipKind::Video, 2.0, 2.0);
        assert!(matches!(c.check(), Err(TimelineError::InvalidRange { .. })));
        c.end = 3.0;
        c.speed = 0.0;
        assert!(matches!(c.check(), Err(TimelineError::InvalidValue { field: "speed", .. })));
    }
}

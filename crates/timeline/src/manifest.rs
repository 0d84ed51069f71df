use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Clip, ClipKind, Resolution, Seconds};

/// One interchangeable media option generated for a shot or dialogue slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCandidate {
    pub asset_id: String,
    pub url: String,
    #[serde(default)]
    pub duration_sec: Seconds,
    #[serde(rename = "type", default = "default_candidate_kind")]
    pub kind: String,
}

fn default_candidate_kind() -> String { "video".to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotManifest {
    pub shot_id: String,
    pub order: i32,
    #[serde(default = "default_shot_duration")]
    pub duration_sec: Seconds,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub video_candidates: Vec<AssetCandidate>,
    #[serde(default)]
    pub storyboard_image: Option<AssetCandidate>,
}

fn default_shot_duration() -> Seconds { 5.0 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueManifest {
    pub dialogue_id: String,
    #[serde(default)]
    pub shot_id: Option<String>,
    #[serde(default)]
    pub speaker_persona: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tts_candidates: Vec<AssetCandidate>,
    #[serde(default)]
    pub at_sec_in_shot: Option<Seconds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgmManifest {
    pub asset_id: String,
    pub url: String,
    /// `shot_from` / `shot_to` hints for where the music should sit.
    #[serde(default)]
    pub suggest_range: Map<String, Value>,
    #[serde(default)]
    pub duration_sec: Seconds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfxManifest {
    pub asset_id: String,
    pub url: String,
    #[serde(default)]
    pub shot_id: Option<String>,
    #[serde(default)]
    pub at_sec_in_shot: Seconds,
}

/// Read-only description of a generation run's outputs. Backs the candidate
/// pickers; editing never writes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifactsManifest {
    pub run_id: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub total_duration_sec: Seconds,
    #[serde(default)]
    pub shots: Vec<ShotManifest>,
    #[serde(default)]
    pub dialogues: Vec<DialogueManifest>,
    #[serde(default)]
    pub bgm: Vec<BgmManifest>,
    #[serde(default)]
    pub sfx: Vec<SfxManifest>,
}

fn default_fps() -> u32 { 24 }

impl RunArtifactsManifest {
    pub fn shot(&self, shot_id: &str) -> Option<&ShotManifest> { self.shots.iter().find(|s| s.shot_id == shot_id) }

    pub fn dialogue(&self, dialogue_id: &str) -> Option<&DialogueManifest> {
        self.dialogues.iter().find(|d| d.dialogue_id == dialogue_id)
    }

    pub fn shots_in_order(&self) -> Vec<&ShotManifest> {
        let mut out: Vec<&ShotManifest> = self.shots.iter().collect();
        out.sort_by_key(|s| s.order);
        out
    }

    /// Alternatives the clip could be rebound to, looked up through the
    /// clip's `dialogue_id` / `shot_id` meta.
    pub fn candidates_for_clip(&self, clip: &Clip) -> Vec<&AssetCandidate> {
        if let Some(dialogue) = clip.meta.dialogue_id().and_then(|id| self.dialogue(id)) {
            return dialogue.tts_candidates.iter().collect();
        }
        let Some(shot) = clip.meta.shot_id().and_then(|id| self.shot(id)) else { return Vec::new() };
        match clip.kind {
            ClipKind::Video => shot.video_candidates.iter().collect(),
            ClipKind::Storyboard => shot.storyboard_image.iter().collect(),
            ClipKind::Audio | ClipKind::Text => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest() -> RunArtifactsManifest {
        serde_json::from_value(json!({
            "run_id": "run-7",
            "shots": [
                {"shot_id": "s2", "order": 2, "video_candidates": [
                    {"asset_id": "v2a", "url": "https://cdn/v2a.mp4", "duration_sec": 4.0}
                ]},
                {"shot_id": "s1", "order": 1, "duration_sec": 3.0,
                 "video_candidates": [
                    {"asset_id": "v1a", "url": "https://cdn/v1a.mp4", "duration_sec": 3.0},
                    {"asset_id": "v1b", "url": "https://cdn/v1b.mp4", "duration_sec": 3.5}
                 ],
                 "storyboard_image": {"asset_id": "sb1", "url": "https://cdn/sb1.png", "type": "image"}}
            ],
            "dialogues": [
                {"dialogue_id": "d1", "shot_id": "s1", "text": "Hello.", "tts_candidates": [
                    {"asset_id": "tts1", "url": "https://cdn/tts1.wav", "duration_sec": 1.2, "type": "audio"}
                ]}
            ],
            "sfx": [{"asset_id": "fx1", "url": "https://cdn/fx1.wav", "shot_id": "s2", "at_sec_in_shot": 0.5}]
        }))
        .unwrap()
    }

    #[test]
    fn defaults_follow_backend() {
        let m = manifest();
        assert_eq!(m.fps, 24);
        assert_eq!(m.resolution, Resolution::new(1280, 720));
        assert_eq!(m.shot("s2").unwrap().duration_sec, 5.0);
        assert_eq!(m.shot("s2").unwrap().video_candidates[0].kind, "video");
        assert!(m.bgm.is_empty());
    }

    #[test]
    fn shots_in_order_sorts_by_order() {
        let m = manifest();
        let ids: Vec<&str> = m.shots_in_order().iter().map(|s| s.shot_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn candidates_follow_clip_kind_and_meta() {
        let m = manifest();

        let mut video = Clip::new("c-vid-s1", "t-video", ClipKind::Video, 0.0, 3.0);
        video.meta.set("shot_id", "s1");
        let ids: Vec<&str> = m.candidates_for_clip(&video).iter().map(|c| c.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["v1a", "v1b"]);

        let mut board = Clip::new("c-sb-s1", "t-storyboard", ClipKind::Storyboard, 0.0, 3.0);
        board.meta.set("shot_id", "s1");
        assert_eq!(m.candidates_for_clip(&board)[0].asset_id, "sb1");

        let mut line = Clip::new("c-dlg-d1", "t-dialogue", ClipKind::Audio, 0.0, 1.2);
        line.meta.set("dialogue_id", "d1");
        assert_eq!(m.candidates_for_clip(&line)[0].asset_id, "tts1");

        let orphan = Clip::new("c-x", "t-video", ClipKind::Video, 0.0, 1.0);
        assert!(m.candidates_for_clip(&orphan).is_empty());
    }
}

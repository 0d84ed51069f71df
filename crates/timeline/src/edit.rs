use tracing::debug;
use uuid::Uuid;

use crate::model::{Clip, ClipKind, ClipMeta, Seconds, Timeline};
use crate::{AssetCandidate, TimelineError, TimelineResult};

/// Partial clip update. `None` leaves the field as it is; `asset_id` is
/// doubly optional so a patch can also clear the binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipPatch {
    pub track_id: Option<String>,
    pub asset_id: Option<Option<String>>,
    pub kind: Option<ClipKind>,
    pub start: Option<Seconds>,
    pub end: Option<Seconds>,
    pub offset_in_asset: Option<Seconds>,
    pub speed: Option<f64>,
    pub volume: Option<f64>,
    pub fade_in: Option<Seconds>,
    pub fade_out: Option<Seconds>,
    pub meta: Option<ClipMeta>,
}

impl ClipPatch {
    pub fn range(start: Seconds, end: Seconds) -> Self { Self { start: Some(start), end: Some(end), ..Default::default() } }

    fn apply_to(self, clip: &mut Clip) {
        if let Some(v) = self.track_id { clip.track_id = v; }
        if let Some(v) = self.asset_id { clip.asset_id = v; }
        if let Some(v) = self.kind { clip.kind = v; }
        if let Some(v) = self.start { clip.start = v; }
        if let Some(v) = self.end { clip.end = v; }
        if let Some(v) = self.offset_in_asset { clip.offset_in_asset = v; }
        if let Some(v) = self.speed { clip.speed = v; }
        if let Some(v) = self.volume { clip.volume = v; }
        if let Some(v) = self.fade_in { clip.fade_in = v; }
        if let Some(v) = self.fade_out { clip.fade_out = v; }
        if let Some(v) = self.meta { clip.meta = v; }
    }
}

/// Ids of the two clips produced by a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIds {
    pub left: String,
    pub right: String,
}

fn mint_clip_id() -> String { format!("c-{}", Uuid::new_v4().simple()) }

// Edits on an unknown clip id are no-ops reported as `Ok(false)`/`Ok(None)`.
// Edits that would leave a clip violating `Clip::check` are rejected and the
// timeline is left untouched.
impl Timeline {
    /// Merges `patch` into the clip. The merged clip must pass
    /// [`Clip::check`] as a whole, so a clip that was loaded already broken
    /// (say `end == start`) rejects every patch that leaves its range
    /// broken, including asset replacement and moves. Patching `start` and
    /// `end` to a valid range, e.g. with [`Timeline::trim_clip`], repairs it.
    pub fn update_clip(&mut self, clip_id: &str, patch: ClipPatch) -> TimelineResult<bool> {
        let Some(idx) = self.clip_index(clip_id) else {
            debug!(clip_id, "update_clip: no such clip");
            return Ok(false);
        };
        let retrack = patch.track_id.clone();
        let mut next = self.clips[idx].clone();
        patch.apply_to(&mut next);
        next.check()?;
        if let Some(track_id) = retrack {
            if self.track(&track_id).is_none() {
                return Err(TimelineError::UnknownTrack { clip_id: clip_id.to_string(), track_id });
            }
        }
        self.clips[idx] = next;
        Ok(true)
    }

    pub fn trim_clip(&mut self, clip_id: &str, new_start: Seconds, new_end: Seconds) -> TimelineResult<bool> {
        self.update_clip(clip_id, ClipPatch::range(new_start, new_end))
    }

    /// Shifts a clip to `new_start`, keeping its duration. Overlap with
    /// neighbours on the same track is allowed.
    pub fn move_clip(&mut self, clip_id: &str, new_start: Seconds) -> TimelineResult<bool> {
        let Some(idx) = self.clip_index(clip_id) else {
            debug!(clip_id, "move_clip: no such clip");
            return Ok(false);
        };
        if !new_start.is_finite() {
            return Err(TimelineError::InvalidValue { clip_id: clip_id.to_string(), field: "start", value: new_start });
        }
        let dur = self.clips[idx].duration();
        self.update_clip(clip_id, ClipPatch::range(new_start, new_start + dur))
    }

    /// Replaces the clip with two halves meeting at `split_at`. The right
    /// half's source offset advances by the consumed timeline span scaled by
    /// playback speed. Binding lists that named the original clip now name
    /// both halves. Returns `None` for an unknown clip or a split point not
    /// strictly inside the clip.
    pub fn split_clip(&mut self, clip_id: &str, split_at: Seconds) -> TimelineResult<Option<SplitIds>> {
        let Some(idx) = self.clip_index(clip_id) else {
            debug!(clip_id, "split_clip: no such clip");
            return Ok(None);
        };
        let original = &self.clips[idx];
        if !(split_at > original.start && split_at < original.end) {
            debug!(clip_id, split_at, start = original.start, end = original.end, "split_clip: point outside clip");
            return Ok(None);
        }

        let ids = SplitIds { left: mint_clip_id(), right: mint_clip_id() };
        let left = Clip { clip_id: ids.left.clone(), end: split_at, ..original.clone() };
        let right = Clip {
            clip_id: ids.right.clone(),
            start: split_at,
            offset_in_asset: original.offset_in_asset + (split_at - original.start) * original.speed,
            ..original.clone()
        };
        self.clips.splice(idx..=idx, [left, right]);

        for ids_in_binding in self.bindings.values_mut() {
            if ids_in_binding.iter().any(|id| id == clip_id) {
                let rewritten: Vec<String> = ids_in_binding
                    .drain(..)
                    .flat_map(|id| if id == clip_id { vec![ids.left.clone(), ids.right.clone()] } else { vec![id] })
                    .collect();
                *ids_in_binding = rewritten;
            }
        }
        Ok(Some(ids))
    }

    /// Rebinds the clip to another candidate asset. Timing is untouched.
    pub fn replace_candidate_asset(&mut self, clip_id: &str, candidate: &AssetCandidate) -> TimelineResult<bool> {
        let Some(clip) = self.clip(clip_id) else {
            debug!(clip_id, "replace_candidate_asset: no such clip");
            return Ok(false);
        };
        let meta = clip.meta.clone().with("url", candidate.url.clone());
        self.update_clip(
            clip_id,
            ClipPatch { asset_id: Some(Some(candidate.asset_id.clone())), meta: Some(meta), ..Default::default() },
        )
    }
}

use chrono::{DateTime, Utc};
use timeline::{AssetCandidate, Clip, ClipPatch, RunArtifactsManifest, Seconds, SplitIds, Timeline, TimelineResult, Track};
use tracing::{debug, info, warn};

use crate::api::{CreateProjectRequest, ProjectResponse, RegenerateRequest, RegenerateResponse, TimelineApi};
use crate::{ClientConfig, Playback, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Loading,
    Saving,
    Error,
}

/// Owns one editor's in-memory project and keeps it in step with the
/// backend. Every mutation of the timeline goes through this type.
///
/// Load and save come in two flavours: the async `load_*`/`save_project`
/// wrappers, and the `begin_*`/`finish_*` pairs they are built from, for
/// callers that issue the request themselves. `finish_*` always clears the
/// in-flight flag, whatever the outcome.
pub struct NleSession<A> {
    api: A,
    tenant_id: String,
    project_scope_id: String,

    project_id: Option<String>,
    timeline: Timeline,
    selected_clip_id: Option<String>,
    manifest: Option<RunArtifactsManifest>,
    playback: Playback,

    is_loading: bool,
    is_saving: bool,
    last_error: Option<String>,
    dirty: bool,
    last_synced_at: Option<DateTime<Utc>>,
}

impl<A: TimelineApi> NleSession<A> {
    pub fn new(api: A, config: &ClientConfig) -> Self {
        Self {
            api,
            tenant_id: config.tenant_id.clone(),
            project_scope_id: config.project_scope_id.clone(),
            project_id: None,
            timeline: Timeline::default(),
            selected_clip_id: None,
            manifest: None,
            playback: Playback::default(),
            is_loading: false,
            is_saving: false,
            last_error: None,
            dirty: false,
            last_synced_at: None,
        }
    }

    pub fn api(&self) -> &A { &self.api }

    // -------------------------
    // state
    // -------------------------

    pub fn project_id(&self) -> Option<&str> { self.project_id.as_deref() }
    pub fn run_id(&self) -> &str { &self.timeline.run_id }
    pub fn timeline(&self) -> &Timeline { &self.timeline }
    pub fn manifest(&self) -> Option<&RunArtifactsManifest> { self.manifest.as_ref() }
    pub fn playback(&self) -> &Playback { &self.playback }
    pub fn is_loading(&self) -> bool { self.is_loading }
    pub fn is_saving(&self) -> bool { self.is_saving }
    pub fn last_error(&self) -> Option<&str> { self.last_error.as_deref() }
    pub fn is_dirty(&self) -> bool { self.dirty }
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> { self.last_synced_at }

    pub fn status(&self) -> SyncStatus {
        if self.is_loading {
            SyncStatus::Loading
        } else if self.is_saving {
            SyncStatus::Saving
        } else if self.last_error.is_some() {
            SyncStatus::Error
        } else {
            SyncStatus::Idle
        }
    }

    pub fn sorted_tracks(&self) -> Vec<&Track> { self.timeline.sorted_tracks() }

    pub fn clips_for_track<'a>(&'a self, track_id: &'a str) -> impl Iterator<Item = &'a Clip> + 'a {
        self.timeline.clips_for_track(track_id)
    }

    pub fn selected_clip_id(&self) -> Option<&str> { self.selected_clip_id.as_deref() }

    /// The selected clip, or `None` when nothing is selected or the id no
    /// longer names a clip (e.g. it was consumed by a split).
    pub fn selected_clip(&self) -> Option<&Clip> { self.selected_clip_id.as_deref().and_then(|id| self.timeline.clip(id)) }

    /// Candidate assets for a clip, from the loaded manifest.
    pub fn candidates_for(&self, clip_id: &str) -> Vec<&AssetCandidate> {
        match (&self.manifest, self.timeline.clip(clip_id)) {
            (Some(m), Some(clip)) => m.candidates_for_clip(clip),
            _ => Vec::new(),
        }
    }

    // -------------------------
    // loading
    // -------------------------

    pub fn begin_load(&mut self) {
        self.is_loading = true;
        self.last_error = None;
    }

    /// Applies a load result: success replaces the whole project, failure
    /// records the error and leaves the previous state in place.
    pub fn finish_load(&mut self, result: Result<ProjectResponse, SyncError>) -> Result<(), SyncError> {
        self.is_loading = false;
        match result {
            Ok(resp) => {
                self.apply_project_response(resp);
                Ok(())
            }
            Err(err) => Err(self.record_error("load", err)),
        }
    }

    /// Fetches the project for a run, letting the backend auto-assemble one
    /// from the run's artifacts if needed. Unsaved local edits are dropped.
    pub async fn load_run(&mut self, run_id: &str) -> Result<(), SyncError> {
        info!(run_id, "loading timeline for run");
        self.begin_load();
        let req = CreateProjectRequest {
            tenant_id: self.tenant_id.clone(),
            project_id: self.project_scope_id.clone(),
            run_id: run_id.to_string(),
            auto_assemble: true,
        };
        let result = self.api.create_project(&req).await;
        self.finish_load(result)
    }

    pub async fn load_project(&mut self, project_id: &str) -> Result<(), SyncError> {
        info!(project_id, "loading timeline project");
        self.begin_load();
        let result = self.api.get_project(project_id).await;
        self.finish_load(result)
    }

    /// Asks the backend to rebuild the current project from its run and
    /// replaces local state with the result.
    pub async fn reassemble(&mut self) -> Result<(), SyncError> {
        let Some(project_id) = self.project_id.clone() else {
            return Err(self.record_error("reassemble", SyncError::NoProject));
        };
        info!(%project_id, "reassembling timeline project");
        self.begin_load();
        let result = self.api.reassemble_project(&project_id).await;
        self.finish_load(result)
    }

    /// Fetches the run's artifact manifest into the candidate sidecar.
    pub async fn load_manifest(&mut self) -> Result<&RunArtifactsManifest, SyncError> {
        if self.timeline.run_id.is_empty() {
            return Err(self.record_error("manifest", SyncError::NoProject));
        }
        let result = self.api.artifacts_manifest(&self.timeline.run_id).await;
        match result {
            Ok(m) => {
                debug!(run_id = %m.run_id, shots = m.shots.len(), dialogues = m.dialogues.len(), "manifest loaded");
                Ok(&*self.manifest.insert(m))
            }
            Err(err) => Err(self.record_error("manifest", err)),
        }
    }

    fn apply_project_response(&mut self, resp: ProjectResponse) {
        let ProjectResponse { project_id, run_id, updated_at, payload, .. } = resp;
        let mut timeline = payload;
        timeline.run_id = run_id;
        timeline.tracks.sort_by_key(|t| t.order);
        if let Err(err) = timeline.validate() {
            warn!(%project_id, error = %err, "loaded timeline is inconsistent");
        }
        info!(%project_id, tracks = timeline.tracks.len(), clips = timeline.clips.len(), "timeline loaded");

        if self.manifest.as_ref().is_some_and(|m| m.run_id != timeline.run_id) {
            self.manifest = None;
        }
        self.project_id = Some(project_id);
        self.timeline = timeline;
        let end = self.timeline.total_duration_sec.max(self.timeline.computed_end());
        self.playback.seek(self.playback.current_time, end);
        self.dirty = false;
        self.last_synced_at = parse_timestamp(&updated_at);
    }

    // -------------------------
    // saving
    // -------------------------

    /// Marks a save as in flight and returns the project id and body to PUT,
    /// or `None` when no project is loaded.
    pub fn begin_save(&mut self) -> Option<(String, Timeline)> {
        let project_id = self.project_id.clone()?;
        self.is_saving = true;
        self.last_error = None;
        Some((project_id, self.timeline.clone()))
    }

    pub fn finish_save(&mut self, result: Result<ProjectResponse, SyncError>) -> Result<(), SyncError> {
        self.is_saving = false;
        match result {
            Ok(resp) => {
                info!(project_id = %resp.project_id, "timeline saved");
                self.dirty = false;
                self.last_synced_at = parse_timestamp(&resp.updated_at);
                Ok(())
            }
            Err(err) => Err(self.record_error("save", err)),
        }
    }

    /// Writes the full in-memory project back. Returns `Ok(false)` without
    /// touching the network when no project is loaded.
    pub async fn save_project(&mut self) -> Result<bool, SyncError> {
        let Some((project_id, body)) = self.begin_save() else {
            debug!("save_project: no project loaded");
            return Ok(false);
        };
        let result = self.api.update_project(&project_id, &body).await;
        self.finish_save(result).map(|()| true)
    }

    /// Queues AI regeneration of one shot of the current run.
    pub async fn regenerate_shot(
        &mut self,
        shot_id: &str,
        prompt_patch: &str,
        quality: &str,
        target_duration_sec: Option<Seconds>,
    ) -> Result<RegenerateResponse, SyncError> {
        if self.timeline.run_id.is_empty() {
            return Err(self.record_error("regenerate", SyncError::NoProject));
        }
        let req = RegenerateRequest {
            tenant_id: self.tenant_id.clone(),
            project_id: self.project_scope_id.clone(),
            shot_id: shot_id.to_string(),
            prompt_patch: prompt_patch.to_string(),
            quality: quality.to_string(),
            target_duration_sec,
        };
        let result = self.api.regenerate_shot(&self.timeline.run_id, &req).await;
        match result {
            Ok(resp) => {
                info!(shot_id, job_id = %resp.job_id, status = %resp.status, "shot regeneration requested");
                Ok(resp)
            }
            Err(err) => Err(self.record_error("regenerate", err)),
        }
    }

    fn record_error(&mut self, op: &'static str, err: SyncError) -> SyncError {
        let msg = err.user_message();
        warn!(op, error = %msg, "timeline sync failed");
        self.last_error = Some(msg);
        err
    }

    // -------------------------
    // editing
    // -------------------------

    fn edited(&mut self, applied: bool) -> bool {
        self.dirty |= applied;
        applied
    }

    pub fn update_clip(&mut self, clip_id: &str, patch: ClipPatch) -> TimelineResult<bool> {
        let applied = self.timeline.update_clip(clip_id, patch)?;
        Ok(self.edited(applied))
    }

    pub fn trim_clip(&mut self, clip_id: &str, new_start: Seconds, new_end: Seconds) -> TimelineResult<bool> {
        let applied = self.timeline.trim_clip(clip_id, new_start, new_end)?;
        Ok(self.edited(applied))
    }

    pub fn split_clip(&mut self, clip_id: &str, split_at: Seconds) -> TimelineResult<Option<SplitIds>> {
        let ids = self.timeline.split_clip(clip_id, split_at)?;
        self.edited(ids.is_some());
        Ok(ids)
    }

    pub fn move_clip(&mut self, clip_id: &str, new_start: Seconds) -> TimelineResult<bool> {
        let applied = self.timeline.move_clip(clip_id, new_start)?;
        Ok(self.edited(applied))
    }

    pub fn replace_candidate_asset(&mut self, clip_id: &str, candidate: &AssetCandidate) -> TimelineResult<bool> {
        let applied = self.timeline.replace_candidate_asset(clip_id, candidate)?;
        Ok(self.edited(applied))
    }

    pub fn select_clip(&mut self, clip_id: Option<&str>) { self.selected_clip_id = clip_id.map(str::to_string); }

    // -------------------------
    // playback
    // -------------------------

    pub fn seek(&mut self, t: Seconds) {
        let end = self.timeline.total_duration_sec.max(self.timeline.computed_end());
        self.playback.seek(t, end);
    }

    pub fn set_zoom(&mut self, px_per_sec: f32) { self.playback.set_zoom(px_per_sec); }

    pub fn toggle_playback(&mut self) { self.playback.toggle(); }
}

// Only a time the server reported counts as a sync time.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(err) => {
            debug!(raw, error = %err, "unparseable updated_at");
            None
        }
    }
}

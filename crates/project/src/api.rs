use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use timeline::{RunArtifactsManifest, Seconds, Timeline};
use tracing::debug;

use crate::{ClientConfig, SyncError};

// Unreserved URL characters stay literal in path segments.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub run_id: String,
    pub auto_assemble: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub project_id: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub project_scope_id: String,
    pub run_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    pub payload: Timeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub shot_id: String,
    pub prompt_patch: String,
    pub quality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_duration_sec: Option<Seconds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub run_id: String,
    pub shot_id: String,
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// Timeline endpoints of the studio backend.
#[allow(async_fn_in_trait)]
pub trait TimelineApi {
    /// Returns an existing or freshly auto-assembled project for a run.
    async fn create_project(&self, req: &CreateProjectRequest) -> Result<ProjectResponse, SyncError>;

    async fn get_project(&self, project_id: &str) -> Result<ProjectResponse, SyncError>;

    /// Overwrites the full remote project state.
    async fn update_project(&self, project_id: &str, body: &Timeline) -> Result<ProjectResponse, SyncError>;

    /// Re-runs server-side auto-assembly, discarding the stored edits.
    async fn reassemble_project(&self, project_id: &str) -> Result<ProjectResponse, SyncError>;

    async fn artifacts_manifest(&self, run_id: &str) -> Result<RunArtifactsManifest, SyncError>;

    async fn regenerate_shot(&self, run_id: &str, req: &RegenerateRequest) -> Result<RegenerateResponse, SyncError>;
}

#[derive(Debug, Clone)]
pub struct HttpTimelineApi {
    client: Client,
    config: ClientConfig,
}

impl HttpTimelineApi {
    pub fn new(config: ClientConfig) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig { &self.config }

    fn url(&self, segments: &[&str]) -> String {
        let mut path = String::from("/api/v1");
        for s in segments {
            path.push('/');
            path.extend(utf8_percent_encode(s, SEGMENT));
        }
        self.config.endpoint(&path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, SyncError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "timeline api response");
        if !status.is_success() {
            return Err(SyncError::from_response(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl TimelineApi for HttpTimelineApi {
    async fn create_project(&self, req: &CreateProjectRequest) -> Result<ProjectResponse, SyncError> {
        self.send(self.client.post(self.url(&["timeline", "projects"])).json(req)).await
    }

    async fn get_project(&self, project_id: &str) -> Result<ProjectResponse, SyncError> {
        self.send(self.client.get(self.url(&["timeline", "projects", project_id]))).await
    }

    async fn update_project(&self, project_id: &str, body: &Timeline) -> Result<ProjectResponse, SyncError> {
        self.send(self.client.put(self.url(&["timeline", "projects", project_id])).json(body)).await
    }

    async fn reassemble_project(&self, project_id: &str) -> Result<ProjectResponse, SyncError> {
        self.send(self.client.post(self.url(&["timeline", "projects", project_id, "assemble"]))).await
    }

    async fn artifacts_manifest(&self, run_id: &str) -> Result<RunArtifactsManifest, SyncError> {
        self.send(self.client.get(self.url(&["runs", run_id, "artifacts-manifest"]))).await
    }

    async fn regenerate_shot(&self, run_id: &str, req: &RegenerateRequest) -> Result<RegenerateResponse, SyncError> {
        self.send(self.client.post(self.url(&["runs", run_id, "regenerate"])).json(req)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urls_are_built_under_api_prefix() {
        let cfg = ClientConfig { base_url: "https://studio.example/".into(), ..Default::default() };
        let api = HttpTimelineApi::new(cfg).unwrap();
        assert_eq!(api.url(&["timeline", "projects"]), "https://studio.example/api/v1/timeline/projects");
        assert_eq!(
            api.url(&["runs", "run_01", "artifacts-manifest"]),
            "https://studio.example/api/v1/runs/run_01/artifacts-manifest"
        );
    }

    #[test]
    fn path_segments_are_escaped() {
        let api = HttpTimelineApi::new(ClientConfig::default()).unwrap();
        assert_eq!(
            api.url(&["timeline", "projects", "a/b c"]),
            "http://127.0.0.1:8000/api/v1/timeline/projects/a%2Fb%20c"
        );
    }

    #[test]
    fn project_response_parses_backend_shape() {
        let resp: ProjectResponse = serde_json::from_value(json!({
            "project_id": "nle_proj_1",
            "tenant_id": "default",
            "project_scope_id": "default",
            "run_id": "run-1",
            "created_at": "2026-01-02T03:04:05+00:00",
            "updated_at": "2026-01-02T03:04:05+00:00",
            "payload": {
                "run_id": "run-1",
                "fps": 30,
                "resolution": {"w": 1920, "h": 1080},
                "tracks": [{"track_id": "t-video", "type": "video", "name": "Video Clips", "order": 1}],
                "clips": [{"clip_id": "c-vid-s1", "track_id": "t-video", "asset_id": "a1", "kind": "video",
                           "start": 0.0, "end": 5.0, "speed": 0.8, "meta": {"shot_id": "s1"}}],
                "bindings": {"s1": ["c-vid-s1"]},
                "total_duration_sec": 5.0
            }
        }))
        .unwrap();
        assert_eq!(resp.payload.fps, 30);
        assert_eq!(resp.payload.clips[0].speed, 0.8);
        assert_eq!(resp.payload.bindings["s1"], vec!["c-vid-s1".to_string()]);
    }

    #[test]
    fn regenerate_request_omits_missing_target_duration() {
        let req = RegenerateRequest {
            tenant_id: "default".into(),
            project_id: "default".into(),
            shot_id: "s1".into(),
            prompt_patch: String::new(),
            quality: "standard".into(),
            target_duration_sec: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("target_duration_sec").is_none());
        assert_eq!(value["quality"], json!("standard"));
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Where and as whom the editor talks to the studio backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub tenant_id: String,
    /// Tenant-side project scope new timeline projects are filed under.
    pub project_scope_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 15_000,
            tenant_id: "default".to_string(),
            project_scope_id: "default".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn config_path() -> PathBuf { crate::app_data_dir().join("client.json") }

    /// Config file (if any) with environment overrides applied on top.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file(&Self::config_path())?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() { return Ok(Self::default()); }
        let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("NLE_API_BASE_URL").filter(|v| !v.is_empty()) { self.base_url = v; }
        if let Some(v) = lookup("NLE_API_TIMEOUT_MS") {
            match v.parse() {
                Ok(ms) => self.timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring unparsable NLE_API_TIMEOUT_MS"),
            }
        }
        if let Some(v) = lookup("NLE_TENANT_ID").filter(|v| !v.is_empty()) { self.tenant_id = v; }
        if let Some(v) = lookup("NLE_PROJECT_SCOPE_ID").filter(|v| !v.is_empty()) { self.project_scope_id = v; }
    }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    /// Joins `path` (starting with `/`) onto the base URL.
    pub fn endpoint(&self, path: &str) -> String { format!("{}{}", self.base_url.trim_end_matches('/'), path) }
}

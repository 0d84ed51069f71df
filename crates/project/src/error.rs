use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Non-2xx response that carried a `detail` field.
    #[error("{detail}")]
    Backend { status: u16, detail: String },

    /// Non-2xx response without a usable body.
    #[error("request failed with status code {status}")]
    Status { status: u16 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no project loaded")]
    NoProject,

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Classifies a failed response. A structured `detail` is preferred; a
    /// 409 is always surfaced as a conflict.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        match (status, detail) {
            (409, detail) => Self::Conflict(detail.unwrap_or_else(|| "project was modified elsewhere".to_string())),
            (status, Some(detail)) => Self::Backend { status, detail },
            (status, None) => Self::Status { status },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } | Self::Status { status } => Some(*status),
            Self::Conflict(_) => Some(409),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Displayable message for the error channel. Never empty.
    pub fn user_message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() { format!("{self:?}") } else { msg }
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_is_shown_verbatim() {
        let err = SyncError::from_response(404, r#"{"detail":"run not found"}"#);
        assert!(matches!(err, SyncError::Backend { status: 404, .. }));
        assert_eq!(err.user_message(), "run not found");
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let body = r#"{"detail":[{"loc":["body","run_id"],"msg":"field required"}]}"#;
        let err = SyncError::from_response(422, body);
        assert!(err.user_message().contains("field required"));
    }

    #[test]
    fn missing_detail_falls_back_to_status_text() {
        let err = SyncError::from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.user_message(), "request failed with status code 502");
        assert_eq!(err.status(), Some(502));
        let err = SyncError::from_response(500, r#"{"detail":null}"#);
        assert!(matches!(err, SyncError::Status { status: 500 }));
    }

    #[test]
    fn conflict_is_classified() {
        let err = SyncError::from_response(409, "");
        assert!(matches!(err, SyncError::Conflict(_)));
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn user_message_is_never_empty() {
        assert_eq!(SyncError::NoProject.user_message(), "no project loaded");
        assert!(!SyncError::Other(String::new()).user_message().is_empty());
    }
}

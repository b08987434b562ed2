//! HTTP client for the remote progress API.

use async_trait::async_trait;
use levelup_core::LevelId;
use reqwest::{Client, ClientBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::sync::{ProgressSubmission, RemoteLevelId, RemoteProgressService, SyncError};

/// Connection settings for [`HttpProgressService`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, e.g. `https://api.example.com/api`
    pub base_url: String,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl HttpConfig {
    /// Settings for `base_url` with no timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }
}

/// Remote progress service over HTTP/JSON.
#[derive(Clone)]
pub struct HttpProgressService {
    /// HTTP client
    client: Client,

    /// API root without trailing slash
    base_url: String,
}

impl HttpProgressService {
    /// Build a client for the given settings.
    pub fn new(config: HttpConfig) -> Result<Self, SyncError> {
        let mut builder = ClientBuilder::new();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn levels_url(&self) -> String {
        format!("{}/levels/", self.base_url)
    }

    fn progress_url(&self) -> String {
        format!("{}/progress/", self.base_url)
    }
}

async fn ensure_success(response: Response) -> Result<Response, SyncError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Status { status, body })
}

/// Pick the first level id out of a lookup response.
///
/// Accepts a bare list or a paged object with a `results` list.
pub fn parse_level_lookup(body: &Value) -> Result<Option<RemoteLevelId>, SyncError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items,
            _ => return Err(SyncError::Decode("lookup object has no `results` list".to_string())),
        },
        other => return Err(SyncError::Decode(format!("lookup returned {}", other))),
    };

    let Some(first) = items.first() else {
        return Ok(None);
    };

    match first.get("id") {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|id| Some(RemoteLevelId::Int(id)))
            .ok_or_else(|| SyncError::Decode(format!("level id {} is not an integer", n))),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(RemoteLevelId::Text(s.clone()))),
        _ => Err(SyncError::Decode("level entry has no usable `id`".to_string())),
    }
}

#[async_trait]
impl RemoteProgressService for HttpProgressService {
    async fn resolve_level(&self, level_id: LevelId, token: &str) -> Result<Option<RemoteLevelId>, SyncError> {
        debug!("Resolving level {} via {}", level_id, self.levels_url());

        let response = self
            .client
            .get(self.levels_url())
            .query(&[("level_number", level_id.get())])
            .bearer_auth(token)
            .send()
            .await?;

        let body: Value = ensure_success(response).await?.json().await?;
        parse_level_lookup(&body)
    }

    async fn submit_progress(&self, token: &str, submission: &ProgressSubmission) -> Result<(), SyncError> {
        debug!("Submitting progress for remote level {}", submission.level_id);

        let response = self
            .client
            .post(self.progress_url())
            .bearer_auth(token)
            .json(submission)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_list() {
        let body = json!([{"id": 7, "level_number": 3}, {"id": 8, "level_number": 3}]);
        assert_eq!(parse_level_lookup(&body).unwrap(), Some(RemoteLevelId::Int(7)));
    }

    #[test]
    fn test_parse_paged_results() {
        let body = json!({"count": 1, "next": null, "results": [{"id": "a1b2", "level_number": 3}]});
        assert_eq!(
            parse_level_lookup(&body).unwrap(),
            Some(RemoteLevelId::Text("a1b2".to_string()))
        );
    }

    #[test]
    fn test_parse_empty_is_unresolved() {
        assert_eq!(parse_level_lookup(&json!([])).unwrap(), None);
        assert_eq!(parse_level_lookup(&json!({"results": []})).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        assert!(parse_level_lookup(&json!("nope")).is_err());
        assert!(parse_level_lookup(&json!({"detail": "not found"})).is_err());
        assert!(parse_level_lookup(&json!([{"name": "no id"}])).is_err());
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let service = HttpProgressService::new(HttpConfig::new("http://localhost:8000/api/")).unwrap();
        assert_eq!(service.levels_url(), "http://localhost:8000/api/levels/");
        assert_eq!(service.progress_url(), "http://localhost:8000/api/progress/");
    }
}

// src/backend/http.rs

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::backend::{Backend, LogQuery};
use crate::errors::{LiveError, Result};
use crate::protocol::{LogPage, LogSnapshot, RunningTasks, StatsSummary};
use crate::types::{BoxFuture, TaskId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed [`Backend`] authenticating with the `access_token` cookie.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

/// Error body shape used by the server (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl HttpBackend {
    pub fn new(base: Url, access_token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = access_token {
            let cookie = HeaderValue::from_str(&format!("access_token={token}"))
                .map_err(|e| LiveError::ConfigError(format!("invalid access token: {e}")))?;
            headers.insert(COOKIE, cookie);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| LiveError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(LiveError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| "request failed".to_string());
            warn!(%status, %detail, "backend rejected request");
            return Err(LiveError::Rejected(detail));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self.send(self.client.get(url)).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post(&self, url: Url) -> Result<()> {
        debug!(%url, "POST");
        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

impl Backend for HttpBackend {
    fn fetch_task_logs(&self, query: LogQuery) -> BoxFuture<'_, Result<Vec<LogSnapshot>>> {
        Box::pin(async move {
            let mut url = self.endpoint("/api/logs/")?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("task_id", &query.task_id.to_string());
                if let Some(status) = query.status {
                    pairs.append_pair("status", status.as_str());
                }
                pairs.append_pair("limit", &query.limit.to_string());
            }

            debug!(%url, "GET");
            let response = self.send(self.client.get(url)).await?;
            let page = response.json::<LogPage>().await?;
            Ok(page.into_items())
        })
    }

    fn fetch_running_tasks(&self) -> BoxFuture<'_, Result<Vec<TaskId>>> {
        Box::pin(async move {
            let running: RunningTasks = self.get_json("/api/tasks/running/status").await?;
            Ok(running.running_tasks)
        })
    }

    fn fetch_stats(&self) -> BoxFuture<'_, Result<StatsSummary>> {
        Box::pin(async move { self.get_json("/api/logs/stats/summary").await })
    }

    fn reload_packages(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            for path in ["/api/packages/python/list", "/api/packages/nodejs/list"] {
                let listing: serde_json::Value = self.get_json(path).await?;
                debug!(path, entries = listing.as_array().map(Vec::len), "package list reloaded");
            }
            Ok(())
        })
    }

    fn reload_subscriptions(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let listing: serde_json::Value = self.get_json("/api/subscriptions/").await?;
            debug!(entries = listing.as_array().map(Vec::len), "subscriptions reloaded");
            Ok(())
        })
    }

    fn run_task(&self, task_id: TaskId) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let url = self.endpoint(&format!("/api/tasks/{task_id}/run"))?;
            self.post(url).await
        })
    }

    fn stop_task(&self, task_id: TaskId, force: bool) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut url = self.endpoint(&format!("/api/tasks/{task_id}/stop"))?;
            if force {
                url.query_pairs_mut().append_pair("force", "true");
            }
            self.post(url).await
        })
    }
}

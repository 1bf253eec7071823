use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

use super::{CreateTaskRequest, CreatedTask, MessagePatch, Task, TaskStatus, UpdateTaskRequest};
use crate::utils::url::construct_api_url;

#[derive(Debug)]
pub enum ApiError {
    Request(reqwest::Error),
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    Decode(serde_json::Error),
}

impl ApiError {
    /// The service's own message if the error body carries one.
    pub fn summary(&self) -> Option<String> {
        match self {
            ApiError::Status { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .as_ref()
                .and_then(extract_error_summary),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Request(err) => write!(f, "request failed: {err}"),
            ApiError::Status { status, body } => match self.summary() {
                Some(summary) => write!(f, "server returned {status}: {summary}"),
                None if body.trim().is_empty() => write!(f, "server returned {status}"),
                None => write!(f, "server returned {status}: {}", body.trim()),
            },
            ApiError::Decode(err) => write!(f, "unexpected response body: {err}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Request(err) => Some(err),
            ApiError::Decode(err) => Some(err),
            ApiError::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Request(err)
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Turn a non-success response into [`ApiError::Status`], otherwise decode
/// the JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(ApiError::Decode)
}

pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(ApiError::Status { status, body })
}

/// Task and message endpoints of the project service.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Newest first.
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, ApiError>;
    async fn create_task(&self, project_id: &str) -> Result<CreatedTask, ApiError>;
    async fn update_task(&self, task_id: &str, status: TaskStatus) -> Result<Task, ApiError>;
    async fn mark_message_read(&self, message_id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        debug!(%method, %url, "api request");
        let request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "tasks")
            .query(&[("projectId", project_id)])
            .send()
            .await?;
        read_json(response).await
    }

    async fn create_task(&self, project_id: &str) -> Result<CreatedTask, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "tasks")
            .json(&CreateTaskRequest { project_id })
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_task(&self, task_id: &str, status: TaskStatus) -> Result<Task, ApiError> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("tasks/{task_id}"))
            .json(&UpdateTaskRequest { status })
            .send()
            .await?;
        read_json(response).await
    }

    async fn mark_message_read(&self, message_id: &str) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("messages/{message_id}"))
            .json(&MessagePatch { read: true })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

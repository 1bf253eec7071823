//! Payloads exchanged with the task service and the blob store, and the
//! traits the rest of the crate talks to them through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod blob;
pub mod client;

pub use blob::{BlobClient, BlobStore, Upload};
pub use client::{ApiClient, ApiError, TaskApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// Still queued or executing on the worker.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One optimization run. Lists come back newest first (by `updatedAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest<'a> {
    pub project_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreatedTask {
    pub id: String,
}

#[derive(Serialize)]
pub struct UpdateTaskRequest {
    pub status: TaskStatus,
}

#[derive(Serialize)]
pub struct MessagePatch {
    pub read: bool,
}

/// What the upload endpoint returns for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedBlob {
    pub url: String,
    pub pathname: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_decodes_from_service_json() {
        let json = r#"{
            "id": "t1",
            "projectId": "p1",
            "status": "running",
            "createdAt": "2025-05-01T10:00:00.000Z",
            "updatedAt": "2025-05-01T10:05:00.000Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.status.is_active());
        assert!(task.updated_at > task.created_at);
    }

    #[test]
    fn only_pending_and_running_are_active() {
        let active: Vec<_> = [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Succeeded,
            TaskStatus::Failed,
            TaskStatus::Canceled,
        ]
        .into_iter()
        .filter(|status| status.is_active())
        .collect();
        assert_eq!(active, vec![TaskStatus::Pending, TaskStatus::Running]);
    }

    #[test]
    fn request_bodies_use_service_field_names() {
        let body = serde_json::to_value(CreateTaskRequest { project_id: "p1" }).unwrap();
        assert_eq!(body, serde_json::json!({"projectId": "p1"}));
        let body = serde_json::to_value(UpdateTaskRequest {
            status: TaskStatus::Canceled,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "canceled"}));
    }
}

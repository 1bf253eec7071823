//! Editing session for one project: dataset text, pipeline form and the
//! biosafety confirmation, plus the calls that load and submit them.

use std::fmt;
use tracing::{debug, info, warn};

use crate::api::{ApiError, BlobStore, CreatedTask, Task, TaskApi, TaskStatus, Upload};
use crate::core::columns::ColumnDiffTracker;
use crate::core::dataset::{self, column_stats, ColumnStats, Dataset, DatasetError};
use crate::core::forms::ConfirmForm;
use crate::core::issues::ValidationErrors;
use crate::core::pipeline::{
    ObjectiveKind, PipelineConfig, PipelineForm, StrategyKind, StrategySlot,
};

/// Text the dataset editor starts from before anything is loaded.
pub const DEFAULT_DATASET: &str = "id,sequence,value1,value2,value3";

pub const INPUT_FILE: &str = "input.csv";
pub const CONFIG_FILE: &str = "config.json";
pub const RESULT_FILE: &str = "result.csv";

/// Blob path of a project file, e.g. `p1/config.json`.
pub fn blob_path(project_id: &str, file: &str) -> String {
    format!("{project_id}/{file}")
}

/// Something worth telling the user that did not stop the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    DownloadFailed { path: String, error: String },
    InvalidStoredConfig { error: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DownloadFailed { path, error } => {
                write!(f, "could not download {path}: {error}")
            }
            Notice::InvalidStoredConfig { error } => {
                write!(f, "stored configuration ignored: {error}")
            }
        }
    }
}

/// Every problem found by [`ProjectSession::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectErrors {
    pub confirm: Option<ValidationErrors>,
    pub dataset: Option<DatasetError>,
    pub config: Option<ValidationErrors>,
}

impl ProjectErrors {
    pub fn is_empty(&self) -> bool {
        self.confirm.is_none() && self.dataset.is_none() && self.config.is_none()
    }
}

impl fmt::Display for ProjectErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(errors) = &self.confirm {
            parts.push(errors.clone().prefixed("confirm").to_string());
        }
        if let Some(error) = self.dataset {
            parts.push(format!("dataset: {}", error.code()));
        }
        if let Some(errors) = &self.config {
            parts.push(errors.clone().prefixed("config").to_string());
        }
        f.write_str(&parts.join(", "))
    }
}

impl std::error::Error for ProjectErrors {}

#[derive(Debug)]
pub enum SubmitError {
    Invalid(ProjectErrors),
    Encode(serde_json::Error),
    Upload { path: String, source: ApiError },
    CreateTask(ApiError),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Invalid(errors) => write!(f, "project is not ready: {errors}"),
            SubmitError::Encode(err) => write!(f, "failed to encode configuration: {err}"),
            SubmitError::Upload { path, source } => write!(f, "failed to upload {path}: {source}"),
            SubmitError::CreateTask(err) => write!(f, "failed to start task: {err}"),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Invalid(errors) => Some(errors),
            SubmitError::Encode(err) => Some(err),
            SubmitError::Upload { source, .. } => Some(source),
            SubmitError::CreateTask(err) => Some(err),
        }
    }
}

/// A project that passed every check, ready to upload.
#[derive(Debug, Clone)]
pub struct ValidatedProject {
    pub dataset: Dataset,
    pub config: PipelineConfig,
}

pub struct ProjectSession {
    project_id: String,
    text: String,
    dataset: Dataset,
    form: PipelineForm,
    tracker: ColumnDiffTracker,
    pub confirm: ConfirmForm,
}

impl ProjectSession {
    pub fn new(project_id: impl Into<String>) -> Self {
        let mut session = Self {
            project_id: project_id.into(),
            text: String::new(),
            dataset: Dataset::default(),
            form: PipelineForm::default(),
            tracker: ColumnDiffTracker::new(),
            confirm: ConfirmForm::default(),
        };
        session.set_dataset_text(DEFAULT_DATASET);
        session
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn form(&self) -> &PipelineForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PipelineForm {
        &mut self.form
    }

    /// Replace the dataset text, reparse it, and move per-column entries
    /// along with the value columns.
    pub fn set_dataset_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.dataset = dataset::parse(text);
        let diff = self.tracker.diff(self.dataset.value_columns());
        if !diff.is_empty() {
            debug!(added = ?diff.added, removed = ?diff.removed, "value columns changed");
        }
        self.form.apply_column_diff(&diff);
    }

    /// Replace the form (e.g. one loaded from storage) and fit its
    /// per-column entries to the current dataset.
    pub fn set_form(&mut self, form: PipelineForm) {
        self.form = form;
        self.sync_columns();
    }

    pub fn sync_columns(&mut self) {
        let columns = self.dataset.value_columns().to_vec();
        self.form.sync_columns(&columns);
        self.tracker.diff(&columns);
    }

    pub fn column_stats(&self, column: &str) -> Option<ColumnStats> {
        column_stats(&self.dataset, column)
    }

    pub fn switch_objective(&mut self, column: &str, kind: ObjectiveKind) -> bool {
        let stats = self.column_stats(column);
        match self.form.evaluator.get_mut(column) {
            Some(entry) => {
                entry.objective.switch_to(kind, stats.as_ref());
                true
            }
            None => false,
        }
    }

    pub fn switch_strategy(
        &mut self,
        column: &str,
        slot: StrategySlot,
        kind: StrategyKind,
    ) -> bool {
        match self.form.evaluator.get_mut(column) {
            Some(entry) => {
                entry.strategy_mut(slot).switch_to(kind);
                true
            }
            None => false,
        }
    }

    /// Check the confirmation, the dataset and the configuration together so
    /// every section can show its problems at once.
    pub fn validate(&self) -> Result<ValidatedProject, ProjectErrors> {
        let confirm = self.confirm.validate().err();
        let dataset = dataset::validate_dataset(&self.dataset).err();
        let config = self.form.validate();

        match (confirm, dataset, config) {
            (None, None, Ok(config)) => Ok(ValidatedProject {
                dataset: self.dataset.clone(),
                config,
            }),
            (confirm, dataset, config) => Err(ProjectErrors {
                confirm,
                dataset,
                config: config.err(),
            }),
        }
    }

    /// Load the stored dataset and configuration. Missing files leave the
    /// defaults in place; failures come back as notices.
    pub async fn prefetch(&mut self, store: &dyn BlobStore) -> Vec<Notice> {
        let mut notices = Vec::new();

        let input_path = blob_path(&self.project_id, INPUT_FILE);
        match store.fetch_text(&input_path).await {
            Ok(Some(text)) => {
                info!(path = %input_path, "loaded stored dataset");
                self.set_dataset_text(&text);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(path = %input_path, error = %err, "dataset download failed");
                notices.push(Notice::DownloadFailed {
                    path: input_path,
                    error: err.to_string(),
                });
            }
        }

        let config_path = blob_path(&self.project_id, CONFIG_FILE);
        match store.fetch_text(&config_path).await {
            Ok(Some(json)) => match serde_json::from_str::<PipelineForm>(&json) {
                Ok(form) => {
                    info!(path = %config_path, "loaded stored configuration");
                    self.set_form(form);
                }
                Err(err) => {
                    warn!(path = %config_path, error = %err, "stored configuration is malformed");
                    notices.push(Notice::InvalidStoredConfig {
                        error: err.to_string(),
                    });
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(path = %config_path, error = %err, "configuration download failed");
                notices.push(Notice::DownloadFailed {
                    path: config_path,
                    error: err.to_string(),
                });
            }
        }

        notices
    }

    /// Validate, upload `config.json` then `input.csv`, and start a task.
    pub async fn submit(
        &self,
        api: &dyn TaskApi,
        store: &dyn BlobStore,
    ) -> Result<CreatedTask, SubmitError> {
        let project = self.validate().map_err(SubmitError::Invalid)?;

        let config_json =
            serde_json::to_string_pretty(&project.config.to_form()).map_err(SubmitError::Encode)?;
        let config_path = blob_path(&self.project_id, CONFIG_FILE);
        store
            .upload(Upload::new(config_path.clone(), "application/json", config_json))
            .await
            .map_err(|source| SubmitError::Upload {
                path: config_path,
                source,
            })?;

        let input_path = blob_path(&self.project_id, INPUT_FILE);
        store
            .upload(Upload::new(input_path.clone(), "text/csv", self.text.clone()))
            .await
            .map_err(|source| SubmitError::Upload {
                path: input_path,
                source,
            })?;

        let task = api
            .create_task(&self.project_id)
            .await
            .map_err(SubmitError::CreateTask)?;
        info!(project = %self.project_id, task = %task.id, "task submitted");
        Ok(task)
    }
}

/// Ask the service to stop a task.
pub async fn cancel(api: &dyn TaskApi, task_id: &str) -> Result<Task, ApiError> {
    info!(task = %task_id, "canceling task");
    api.update_task(task_id, TaskStatus::Canceled).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::UploadedBlob;
    use crate::core::forms::{Answer, Consents, Questions};
    use crate::core::issues::FieldCode;
    use crate::core::pipeline::ObjectiveForm;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn sample_dataset(columns: &[&str], rows: usize) -> String {
        let mut text = format!("id,sequence,{}", columns.join(","));
        for i in 0..rows {
            text.push_str(&format!("\n{i},MKVL"));
            for (c, _) in columns.iter().enumerate() {
                text.push_str(&format!(",{}", i + c));
            }
        }
        text
    }

    fn confirmed() -> ConfirmForm {
        ConfirmForm {
            question: Questions {
                toxin: Some(Answer::No),
                pathogen: Some(Answer::No),
                virus: Some(Answer::No),
            },
            consent: Consents {
                compliance: true,
                disclaimer: true,
                warranty: true,
            },
        }
    }

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub blobs: Mutex<HashMap<String, String>>,
        pub uploads: Mutex<Vec<Upload>>,
        pub fail_uploads: bool,
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn fetch_text(&self, path: &str) -> Result<Option<String>, ApiError> {
            Ok(self.blobs.lock().unwrap().get(path).cloned())
        }

        async fn upload(&self, upload: Upload) -> Result<UploadedBlob, ApiError> {
            if self.fail_uploads {
                return Err(ApiError::Status {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: String::new(),
                });
            }
            self.uploads.lock().unwrap().push(upload.clone());
            Ok(UploadedBlob {
                url: format!("https://blob.example/{}", upload.pathname),
                pathname: upload.pathname,
                download_url: None,
                content_type: Some(upload.content_type),
            })
        }
    }

    #[derive(Default)]
    struct RecordingApi {
        created: Mutex<Vec<String>>,
        updated: Mutex<Vec<(String, TaskStatus)>>,
    }

    #[async_trait]
    impl TaskApi for RecordingApi {
        async fn list_tasks(&self, _project_id: &str) -> Result<Vec<Task>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_task(&self, project_id: &str) -> Result<CreatedTask, ApiError> {
            self.created.lock().unwrap().push(project_id.to_string());
            Ok(CreatedTask { id: "t1".into() })
        }

        async fn update_task(&self, task_id: &str, status: TaskStatus) -> Result<Task, ApiError> {
            self.updated.lock().unwrap().push((task_id.to_string(), status));
            let now = chrono::Utc::now();
            Ok(Task {
                id: task_id.to_string(),
                status,
                created_at: now,
                updated_at: now,
            })
        }

        async fn mark_message_read(&self, _message_id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[test]
    fn starts_with_default_columns() {
        let session = ProjectSession::new("p1");
        assert_eq!(session.dataset().value_columns(), ["value1", "value2", "value3"]);
        assert!(session
            .form()
            .keys_match(&["value1".into(), "value2".into(), "value3".into()]));
    }

    #[test]
    fn editing_headers_moves_entries() {
        let mut session = ProjectSession::new("p1");
        assert!(session.switch_objective("value2", ObjectiveKind::Min));
        session.set_dataset_text("id,sequence,value2,score");
        let form = session.form();
        assert!(form.keys_match(&["value2".into(), "score".into()]));
        assert_eq!(form.evaluator["value2"].objective, ObjectiveForm::Min);
        assert!(!session.switch_objective("value1", ObjectiveKind::Max));
    }

    #[test]
    fn range_switch_is_seeded_from_data() {
        let mut session = ProjectSession::new("p1");
        session.set_dataset_text(&sample_dataset(&["score"], 40));
        session.switch_objective("score", ObjectiveKind::Range);
        assert_eq!(
            session.form().evaluator["score"].objective,
            ObjectiveForm::Range {
                lower: "0".into(),
                upper: "39".into()
            }
        );
    }

    #[test]
    fn validate_reports_every_section() {
        let mut session = ProjectSession::new("p1");
        session.form_mut().runner.num_iterations = "0".into();
        let errors = session.validate().unwrap_err();
        assert_eq!(errors.dataset, Some(DatasetError::TooFewRows));
        assert_eq!(errors.confirm.as_ref().map(ValidationErrors::len), Some(6));
        assert_eq!(
            errors.config.as_ref().and_then(|e| e.at(&["runner", "num_iterations"])),
            Some(FieldCode::TooSmall)
        );
        assert!(errors.to_string().contains("dataset: row.too_few"));
        assert!(errors.to_string().contains("config.runner.num_iterations: too_small"));
    }

    #[tokio::test]
    async fn prefetch_loads_stored_files() {
        let store = MemoryStore::default();
        let stored_form = {
            let mut form = PipelineForm::for_columns(&["score".to_string(), "stale".to_string()]);
            form.runner.num_iterations = "12".into();
            form
        };
        store.blobs.lock().unwrap().insert(
            "p1/input.csv".into(),
            sample_dataset(&["score", "yield"], 40),
        );
        store.blobs.lock().unwrap().insert(
            "p1/config.json".into(),
            serde_json::to_string(&stored_form).unwrap(),
        );

        let mut session = ProjectSession::new("p1");
        let notices = session.prefetch(&store).await;
        assert!(notices.is_empty());
        assert_eq!(session.dataset().value_columns(), ["score", "yield"]);
        assert_eq!(session.form().runner.num_iterations, "12");
        assert!(session.form().keys_match(&["score".into(), "yield".into()]));
    }

    #[tokio::test]
    async fn prefetch_keeps_defaults_and_reports_bad_config() {
        let store = MemoryStore::default();
        store
            .blobs
            .lock()
            .unwrap()
            .insert("p1/config.json".into(), "{not json".into());

        let mut session = ProjectSession::new("p1");
        let notices = session.prefetch(&store).await;
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0], Notice::InvalidStoredConfig { .. }));
        assert_eq!(session.text(), DEFAULT_DATASET);
        assert_eq!(session.form().runner.num_iterations, "30");
    }

    #[tokio::test]
    async fn submit_uploads_then_creates_task() {
        let store = MemoryStore::default();
        let api = RecordingApi::default();
        let mut session = ProjectSession::new("p1");
        session.confirm = confirmed();
        session.set_dataset_text(&sample_dataset(&["score"], 40));
        session.form_mut().sampler.shuffle_rate = "0.050".into();

        let task = session.submit(&api, &store).await.unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(*api.created.lock().unwrap(), vec!["p1".to_string()]);

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].pathname, "p1/config.json");
        assert_eq!(uploads[0].content_type, "application/json");
        let stored: serde_json::Value = serde_json::from_slice(&uploads[0].bytes).unwrap();
        assert_eq!(stored["sampler"]["shuffle_rate"], "0.05");
        assert_eq!(stored["evaluator"]["score"]["mode"], "max");
        assert_eq!(uploads[1].pathname, "p1/input.csv");
        assert_eq!(uploads[1].bytes, session.text().as_bytes());
    }

    #[tokio::test]
    async fn invalid_project_is_not_uploaded() {
        let store = MemoryStore::default();
        let api = RecordingApi::default();
        let session = ProjectSession::new("p1");

        let err = session.submit(&api, &store).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));
        assert!(store.uploads.lock().unwrap().is_empty());
        assert!(api.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_stops_submission() {
        let store = MemoryStore {
            fail_uploads: true,
            ..MemoryStore::default()
        };
        let api = RecordingApi::default();
        let mut session = ProjectSession::new("p1");
        session.confirm = confirmed();
        session.set_dataset_text(&sample_dataset(&["score"], 40));

        let err = session.submit(&api, &store).await.unwrap_err();
        assert!(matches!(err, SubmitError::Upload { ref path, .. } if path == "p1/config.json"));
        assert!(api.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_patches_status() {
        let api = RecordingApi::default();
        let task = cancel(&api, "t7").await.unwrap();
        assert_eq!(task.status, TaskStatus::Canceled);
        assert_eq!(
            *api.updated.lock().unwrap(),
            vec![("t7".to_string(), TaskStatus::Canceled)]
        );
    }
}

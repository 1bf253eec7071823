//! Following a project's tasks while one is running, and fetching the
//! leaderboard once none is.

use futures_util::stream::{self, Stream};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiError, BlobStore, Task, TaskApi};
use crate::core::dataset::{self, validate::check_table_headers, Dataset};
use crate::core::project::{blob_path, RESULT_FILE};

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Whether the most recent task is still pending or running.
pub fn latest_is_active(tasks: &[Task]) -> bool {
    tasks.first().is_some_and(|task| task.status.is_active())
}

/// Delay before the next refresh, or `None` once there is nothing to follow.
pub fn poll_delay(tasks: &[Task], interval: Duration) -> Option<Duration> {
    latest_is_active(tasks).then_some(interval)
}

struct WatchState {
    api: Arc<dyn TaskApi>,
    project_id: String,
    interval: Duration,
    cancel: CancellationToken,
    next_delay: Option<Duration>,
}

/// Fetch the task list now and then every `interval` while the latest task
/// is active. Each fetch is yielded; a failed fetch is yielded as an error
/// and retried after `interval`. The stream ends when the latest task
/// settles or `cancel` fires.
pub fn watch_tasks(
    api: Arc<dyn TaskApi>,
    project_id: impl Into<String>,
    interval: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Vec<Task>, ApiError>> {
    let state = WatchState {
        api,
        project_id: project_id.into(),
        interval,
        cancel,
        next_delay: Some(Duration::ZERO),
    };

    stream::unfold(state, |mut state| async move {
        let delay = state.next_delay?;
        if !delay.is_zero() {
            tokio::select! {
                _ = state.cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let result = tokio::select! {
            _ = state.cancel.cancelled() => return None,
            result = state.api.list_tasks(&state.project_id) => result,
        };

        state.next_delay = match &result {
            Ok(tasks) => {
                let next = poll_delay(tasks, state.interval);
                debug!(
                    project = %state.project_id,
                    latest = ?tasks.first().map(|task| task.status),
                    polling = next.is_some(),
                    "tasks refreshed"
                );
                next
            }
            Err(err) => {
                warn!(project = %state.project_id, error = %err, "task refresh failed");
                Some(state.interval)
            }
        };

        Some((result, state))
    })
}

/// The ranked sequences produced by the last finished task. `None` while a
/// task is active, when no result exists yet, or when the file does not
/// carry the `id`/`sequence` headers.
pub async fn fetch_leaderboard(
    store: &dyn BlobStore,
    project_id: &str,
    tasks: &[Task],
) -> Result<Option<Dataset>, ApiError> {
    if latest_is_active(tasks) {
        return Ok(None);
    }

    let path = blob_path(project_id, RESULT_FILE);
    let Some(text) = store.fetch_text(&path).await? else {
        return Ok(None);
    };

    let table = dataset::parse(&text);
    if !check_table_headers(&table.headers) {
        warn!(%path, "result file has unexpected headers");
        return Ok(None);
    }
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CreatedTask, TaskStatus};
    use crate::core::project::tests::MemoryStore;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn task(id: &str, status: TaskStatus) -> Task {
        let now = chrono::Utc::now();
        Task {
            id: id.to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<Vec<Task>, ApiError>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<Vec<Task>, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TaskApi for ScriptedApi {
        async fn list_tasks(&self, _project_id: &str) -> Result<Vec<Task>, ApiError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn create_task(&self, _project_id: &str) -> Result<CreatedTask, ApiError> {
            unreachable!()
        }

        async fn update_task(&self, _task_id: &str, _status: TaskStatus) -> Result<Task, ApiError> {
            unreachable!()
        }

        async fn mark_message_read(&self, _message_id: &str) -> Result<(), ApiError> {
            unreachable!()
        }
    }

    #[test]
    fn delay_follows_latest_task_only() {
        let running_then_done = [task("b", TaskStatus::Running), task("a", TaskStatus::Succeeded)];
        assert_eq!(poll_delay(&running_then_done, POLL_INTERVAL), Some(POLL_INTERVAL));

        let done_then_running = [task("b", TaskStatus::Canceled), task("a", TaskStatus::Running)];
        assert_eq!(poll_delay(&done_then_running, POLL_INTERVAL), None);

        assert_eq!(poll_delay(&[], POLL_INTERVAL), None);
        assert_eq!(
            poll_delay(&[task("a", TaskStatus::Pending)], POLL_INTERVAL),
            Some(POLL_INTERVAL)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn polls_every_interval_until_settled() {
        let api = ScriptedApi::new(vec![
            Ok(vec![task("t", TaskStatus::Pending)]),
            Ok(vec![task("t", TaskStatus::Running)]),
            Ok(vec![task("t", TaskStatus::Succeeded)]),
        ]);

        let start = Instant::now();
        let results: Vec<_> =
            watch_tasks(api.clone(), "p1", POLL_INTERVAL, CancellationToken::new())
                .collect()
                .await;

        assert_eq!(results.len(), 3);
        let last = results.last().unwrap().as_ref().unwrap();
        assert_eq!(last[0].status, TaskStatus::Succeeded);

        let offsets: Vec<Duration> = api
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|at| *at - start)
            .collect();
        assert_eq!(
            offsets,
            vec![Duration::ZERO, POLL_INTERVAL, POLL_INTERVAL * 2]
        );
    }

    #[tokio::test]
    async fn failed_refresh_is_reported_and_retried() {
        tokio::time::pause();
        let api = ScriptedApi::new(vec![
            Ok(vec![task("t", TaskStatus::Running)]),
            Err(ApiError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: String::new(),
            }),
            Ok(vec![task("t", TaskStatus::Failed)]),
        ]);

        let results: Vec<_> = watch_tasks(api, "p1", POLL_INTERVAL, CancellationToken::new())
            .collect()
            .await;
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn cancel_ends_the_stream() {
        tokio::time::pause();
        let api = ScriptedApi::new(
            (0..10)
                .map(|_| Ok(vec![task("t", TaskStatus::Running)]))
                .collect(),
        );
        let cancel = CancellationToken::new();

        let mut stream = Box::pin(watch_tasks(api.clone(), "p1", POLL_INTERVAL, cancel.clone()));
        assert!(stream.next().await.is_some());
        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert_eq!(api.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn leaderboard_waits_for_idle_and_valid_headers() {
        let store = MemoryStore::default();
        store.blobs.lock().unwrap().insert(
            "p1/result.csv".into(),
            "id,sequence,score\nr1,MKV,0.9\nr2,MKL,0.8\n".into(),
        );

        let running = [task("t", TaskStatus::Running)];
        assert!(fetch_leaderboard(&store, "p1", &running).await.unwrap().is_none());

        let done = [task("t", TaskStatus::Succeeded)];
        let table = fetch_leaderboard(&store, "p1", &done).await.unwrap().unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.value_columns(), ["score"]);

        assert!(fetch_leaderboard(&store, "other", &done).await.unwrap().is_none());

        store
            .blobs
            .lock()
            .unwrap()
            .insert("p2/result.csv".into(), "name,score\na,1\n".into());
        assert!(fetch_leaderboard(&store, "p2", &done).await.unwrap().is_none());
    }
}

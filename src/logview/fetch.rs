// src/logview/fetch.rs

use tracing::debug;

use crate::backend::{Backend, LogQuery};
use crate::errors::Result;
use crate::logview::aggregator::WAITING_FOR_OUTPUT;
use crate::protocol::LogSnapshot;
use crate::types::TaskId;

/// Pull the log to show for `task_id`.
///
/// With `prefer_running`, the in-progress log is tried first (a failure there
/// falls through quietly) and an empty stdout gets the waiting placeholder.
/// Otherwise, or when there is no running log, the latest log is used.
pub async fn load_task_log<B>(
    backend: &B,
    task_id: TaskId,
    prefer_running: bool,
) -> Result<Option<LogSnapshot>>
where
    B: Backend + ?Sized,
{
    if prefer_running {
        match backend.fetch_task_logs(LogQuery::running(task_id)).await {
            Ok(logs) => {
                if let Some(mut log) = logs.into_iter().next() {
                    if log.stdout.is_empty() {
                        log.stdout = WAITING_FOR_OUTPUT.to_string();
                    }
                    return Ok(Some(log));
                }
            }
            Err(err) if err.ends_session() => return Err(err),
            Err(err) => {
                debug!(task_id, error = %err, "running log unavailable; falling back to latest");
            }
        }
    }

    let logs = backend.fetch_task_logs(LogQuery::latest(task_id)).await?;
    Ok(logs.into_iter().next())
}

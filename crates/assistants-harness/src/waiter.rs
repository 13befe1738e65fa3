use std::time::Duration;

use tracing::debug;

use crate::api::{AssistantApi, RunStatusKind};
use crate::errors::GenerateError;
use crate::orchestrator::AbortSignal;

/// Fixed pause between run status polls. No backoff, no jitter.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls a run until it reaches a terminal status.
///
/// `completed` returns `Ok(())`; `failed` is a normal terminal outcome
/// surfaced as [`GenerateError::RunFailed`] carrying the server-supplied
/// message (or "Unknown error"). Any transport or HTTP failure from the
/// status fetch aborts the wait immediately. There is no attempt cap:
/// without an abort signal the wait is unbounded.
pub(crate) async fn wait_until_terminal(
    api: &dyn AssistantApi,
    thread_id: &str,
    run_id: &str,
    abort: &mut AbortSignal,
) -> Result<(), GenerateError> {
    loop {
        let state = abort.guard(api.run_status(thread_id, run_id)).await??;
        debug!(%thread_id, %run_id, status = ?state.status, "polled run status");
        match state.status {
            RunStatusKind::Completed => return Ok(()),
            RunStatusKind::Failed => {
                let message = state
                    .last_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Unknown error".to_string());
                return Err(GenerateError::run_failed(message));
            }
            _ => {}
        }
        abort.guard(tokio::time::sleep(POLL_INTERVAL)).await?;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::api::{ByteStream, RunError, RunState, ThreadMessage};
    use crate::errors::ApiError;

    struct ScriptedStatusApi {
        states: Mutex<VecDeque<Result<RunState, ApiError>>>,
    }

    impl ScriptedStatusApi {
        fn new(states: Vec<Result<RunState, ApiError>>) -> Self {
            Self {
                states: Mutex::new(states.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl AssistantApi for ScriptedStatusApi {
        async fn create_thread(&self, _user_message: &str) -> Result<String, ApiError> {
            unreachable!("not used by the waiter")
        }

        async fn add_message(
            &self,
            _thread_id: &str,
            _user_message: &str,
        ) -> Result<(), ApiError> {
            unreachable!("not used by the waiter")
        }

        async fn create_run(
            &self,
            _thread_id: &str,
            _assistant_id: &str,
        ) -> Result<ByteStream, ApiError> {
            unreachable!("not used by the waiter")
        }

        async fn run_status(&self, _thread_id: &str, _run_id: &str) -> Result<RunState, ApiError> {
            self.states
                .lock()
                .expect("lock")
                .pop_front()
                .expect("unexpected extra poll")
        }

        async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>, ApiError> {
            unreachable!("not used by the waiter")
        }
    }

    fn in_progress() -> Result<RunState, ApiError> {
        Ok(RunState {
            status: RunStatusKind::InProgress,
            last_error: None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn polls_at_the_fixed_interval_until_completed() {
        let api = ScriptedStatusApi::new(vec![
            in_progress(),
            in_progress(),
            Ok(RunState {
                status: RunStatusKind::Completed,
                last_error: None,
            }),
        ]);
        let started = tokio::time::Instant::now();
        let mut abort = AbortSignal::disabled();
        wait_until_terminal(&api, "thread_1", "run_1", &mut abort)
            .await
            .expect("completed");
        // Two sleeps between three polls.
        assert_eq!(started.elapsed(), POLL_INTERVAL * 2);
    }

    #[tokio::test]
    async fn failed_status_carries_the_server_message() {
        let api = ScriptedStatusApi::new(vec![Ok(RunState {
            status: RunStatusKind::Failed,
            last_error: Some(RunError {
                message: Some("rate_limited".into()),
            }),
        })]);
        let mut abort = AbortSignal::disabled();
        let err = wait_until_terminal(&api, "thread_1", "run_1", &mut abort)
            .await
            .expect_err("failed run");
        assert_eq!(err, GenerateError::run_failed("rate_limited"));
    }

    #[tokio::test]
    async fn failed_status_without_detail_uses_unknown_error() {
        let api = ScriptedStatusApi::new(vec![Ok(RunState {
            status: RunStatusKind::Failed,
            last_error: None,
        })]);
        let mut abort = AbortSignal::disabled();
        let err = wait_until_terminal(&api, "thread_1", "run_1", &mut abort)
            .await
            .expect_err("failed run");
        assert_eq!(err, GenerateError::run_failed("Unknown error"));
    }

    #[tokio::test]
    async fn transport_error_aborts_the_wait() {
        let api = ScriptedStatusApi::new(vec![Err(ApiError::transport("connection reset"))]);
        let mut abort = AbortSignal::disabled();
        let err = wait_until_terminal(&api, "thread_1", "run_1", &mut abort)
            .await
            .expect_err("transport error");
        assert!(matches!(err, GenerateError::Api(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_keeps_polling() {
        let api = ScriptedStatusApi::new(vec![
            Ok(RunState {
                status: RunStatusKind::Other,
                last_error: None,
            }),
            Ok(RunState {
                status: RunStatusKind::Completed,
                last_error: None,
            }),
        ]);
        let mut abort = AbortSignal::disabled();
        wait_until_terminal(&api, "thread_1", "run_1", &mut abort)
            .await
            .expect("completed");
    }
}

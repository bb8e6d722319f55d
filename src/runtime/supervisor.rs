use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ReliabilityConfig;

const MIN_BACKOFF_SECS: u64 = 1;

/// Backoff bounds for a supervised component, with `max >= initial >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial_secs: u64,
    pub max_secs: u64,
}

impl Backoff {
    pub fn new(initial_secs: u64, max_secs: u64) -> Self {
        let initial_secs = initial_secs.max(MIN_BACKOFF_SECS);
        Self {
            initial_secs,
            max_secs: max_secs.max(initial_secs),
        }
    }

    pub fn from_reliability(reliability: &ReliabilityConfig) -> Self {
        Self::new(
            reliability.channel_initial_backoff_secs,
            reliability.channel_max_backoff_secs,
        )
    }

    fn next(self, current: u64) -> u64 {
        current.saturating_mul(2).min(self.max_secs)
    }
}

/// Run `run_component` forever, restarting it after it returns.
///
/// A clean return (e.g. the gateway asked for a reconnect) restarts after the
/// initial backoff; errors double the wait up to the maximum. With
/// `max_restarts > 0` the loop gives up after that many consecutive errors.
/// Cancelling `shutdown` stops the loop, including a component mid-run.
pub fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    backoff: Backoff,
    max_restarts: u32,
    shutdown: CancellationToken,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut wait = backoff.initial_secs;
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::debug!(component = name, "component starting");
            let result = tokio::select! {
                () = shutdown.cancelled() => break,
                result = run_component() => result,
            };

            match result {
                Ok(()) => {
                    tracing::info!(component = name, "component exited; restarting");
                    wait = backoff.initial_secs;
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    tracing::error!(
                        component = name,
                        failures = consecutive_failures,
                        error = %format!("{e:#}"),
                        "component failed; restarting"
                    );
                }
            }

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!(
                    component = name,
                    max_restarts,
                    "component exceeded max restarts; giving up"
                );
                break;
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(Duration::from_secs(wait)) => {}
            }
            if consecutive_failures > 0 {
                wait = backoff.next(wait);
            }
        }

        tracing::debug!(component = name, "component supervisor stopped");
    })
}

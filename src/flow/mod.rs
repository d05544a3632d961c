// src/flow/mod.rs

pub mod csv_to_gcs;
pub mod elt_to_bq;
pub mod query;

pub use csv_to_gcs::csv_to_gcs;
pub use elt_to_bq::{elt_to_bigquery, EltReport};
pub use query::query_bigquery;

use chrono::Utc;
use std::{error::Error, fmt::Display, future::Future, time::Duration};
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;

/// How often a failing task is re-run before the flow gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPolicy {
    pub retries: u32,
    pub initial_backoff: Duration,
}

impl TaskPolicy {
    /// Run exactly once.
    pub const fn once() -> Self {
        Self {
            retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            retries: cfg.task_retries,
            initial_backoff: Duration::from_millis(cfg.retry_backoff_ms),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// `outer: cause: root cause`
pub(crate) fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        out.push_str(": ");
        out.push_str(&c.to_string());
        cause = c.source();
    }
    out
}

/// A named run of sequential tasks; logs every step.
pub struct Flow {
    name: &'static str,
    run_id: String,
    started: Instant,
    policy: TaskPolicy,
}

impl Flow {
    pub fn start(name: &'static str, policy: TaskPolicy) -> Self {
        let run_id = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        info!(flow = name, run = %run_id, "flow started");
        Self {
            name,
            run_id,
            started: Instant::now(),
            policy,
        }
    }

    /// Run a task under the flow's default policy.
    pub async fn task<T, E, F, Fut>(&self, task: &str, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error,
    {
        self.task_with(task, self.policy, f).await
    }

    /// Run a task, retrying with exponential backoff per `policy`.
    pub async fn task_with<T, E, F, Fut>(
        &self,
        task: &str,
        policy: TaskPolicy,
        mut f: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error,
    {
        let mut attempt = 0;
        loop {
            let start = Instant::now();
            info!(flow = self.name, task, attempt, "task started");
            match f().await {
                Ok(v) => {
                    info!(flow = self.name, task, elapsed = ?start.elapsed(), "task completed");
                    return Ok(v);
                }
                Err(e) if attempt < policy.retries => {
                    attempt += 1;
                    let delay = policy.backoff(attempt);
                    warn!(flow = self.name, task, attempt, delay_ms = delay.as_millis() as u64, error = %error_chain(&e), "retrying task");
                    sleep(delay).await;
                }
                Err(e) => {
                    error!(flow = self.name, task, attempts = attempt + 1, error = %error_chain(&e), "task failed");
                    return Err(e);
                }
            }
        }
    }

    /// Log the final state of the run. `{:#}` spells out the whole cause
    /// chain for `anyhow` errors.
    pub fn finish<T, E: Display>(self, result: &Result<T, E>) {
        let elapsed = self.started.elapsed();
        match result {
            Ok(_) => info!(flow = self.name, run = %self.run_id, ?elapsed, "flow completed"),
            Err(e) => {
                let chain = format!("{e:#}");
                error!(flow = self.name, run = %self.run_id, ?elapsed, error = %chain, "flow failed")
            }
        }
    }
}

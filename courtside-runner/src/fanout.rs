//! Bounded parallel fan-out over independent slices (seasons, players).
//!
//! Each request builds its own short-lived Rayon pool and joins it before
//! returning. A slice's failure is reported in its [`SliceOutcome`];
//! [`merge_successes`] is where failures are logged and dropped.

use std::fmt::Display;

use courtside_core::data::DataError;
use polars::prelude::DataFrame;
use rayon::prelude::*;

/// What one slice produced.
#[derive(Debug)]
pub struct SliceOutcome {
    pub slice: String,
    pub result: Result<Option<DataFrame>, DataError>,
}

impl SliceOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `f` once per task on a pool of `workers` threads.
///
/// Outcomes come back in task order. If the pool cannot be built the tasks
/// run sequentially on the calling thread.
pub fn fan_out<T, F>(label: &str, workers: usize, tasks: &[T], f: F) -> Vec<SliceOutcome>
where
    T: Display + Sync,
    F: Fn(&T) -> Result<Option<DataFrame>, DataError> + Sync + Send,
{
    let run = |task: &T| SliceOutcome {
        slice: task.to_string(),
        result: f(task),
    };

    if tasks.is_empty() {
        return Vec::new();
    }

    let name = label.to_string();
    match rayon::ThreadPoolBuilder::new()
        .num_threads(workers.clamp(1, tasks.len()))
        .thread_name(move |i| format!("courtside-{name}-{i}"))
        .build()
    {
        Ok(pool) => {
            tracing::debug!(label, workers, tasks = tasks.len(), "fan-out");
            pool.install(|| tasks.par_iter().map(run).collect())
        }
        Err(e) => {
            tracing::warn!(label, error = %e, "failed to build worker pool, running sequentially");
            tasks.iter().map(run).collect()
        }
    }
}

/// Stack every successful, non-empty slice. Failed slices are logged and
/// dropped; so is a slice whose schema does not match the first survivor.
/// Returns `None` when nothing survives.
pub fn merge_successes(label: &str, outcomes: Vec<SliceOutcome>) -> Option<DataFrame> {
    let total = outcomes.len();
    let mut merged: Option<DataFrame> = None;
    let mut dropped = 0usize;

    for outcome in outcomes {
        match outcome.result {
            Err(e) => {
                dropped += 1;
                tracing::warn!(label, slice = %outcome.slice, error = %e, "slice failed, dropping");
            }
            Ok(None) => {
                tracing::debug!(label, slice = %outcome.slice, "slice returned no data");
            }
            Ok(Some(df)) if df.height() == 0 => {
                tracing::debug!(label, slice = %outcome.slice, "slice returned no rows");
            }
            Ok(Some(df)) => match merged.as_mut() {
                None => merged = Some(df),
                Some(acc) => {
                    if let Err(e) = acc.vstack_mut(&df) {
                        dropped += 1;
                        tracing::warn!(label, slice = %outcome.slice, error = %e, "slice schema mismatch, dropping");
                    }
                }
            },
        }
    }

    tracing::debug!(
        label,
        total,
        dropped,
        rows = merged.as_ref().map(|df| df.height()).unwrap_or(0),
        "merged slices"
    );
    merged
}

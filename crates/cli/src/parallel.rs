//! Outcome collection and panic isolation for parallel instance generation.

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    path::PathBuf,
};

use anyhow::{Result, anyhow};
use designspace::Instance;
use log::error;

/// Result of a batch of instance generations.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    /// Written files, in designspace order
    pub written: Vec<PathBuf>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Tally per-instance outcomes, given in designspace order.
///
/// Every failure is logged. The first failure in designspace order is
/// returned, with the instance named in its context.
pub fn collect_outcomes(
    label: &str,
    instances: &[Instance],
    outcomes: Vec<Result<PathBuf>>,
) -> Result<BatchResult> {
    let mut result = BatchResult::default();
    let mut first_error = None;

    for (instance, outcome) in instances.iter().zip(outcomes) {
        match outcome {
            Ok(path) => {
                result.succeeded += 1;
                result.written.push(path);
            }
            Err(e) => {
                error!("{}: {e:?}", instance.name);
                result.failed += 1;
                if first_error.is_none() {
                    first_error = Some(e.context(format!("Instance '{}' failed", instance.name)));
                }
            }
        }
    }

    println!("{label}: {} succeeded, {} failed", result.succeeded, result.failed);
    match first_error {
        Some(e) => Err(e),
        None => Ok(result),
    }
}

/// Run one task, turning a panic into an error naming the instance.
pub fn guarded<T>(instance: &Instance, task: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        Err(anyhow!(
            "Worker panicked while generating '{}': {}",
            instance.name,
            panic_message(&*payload)
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

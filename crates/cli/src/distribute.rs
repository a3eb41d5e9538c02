//! Interchangeable work distributors.
//!
//! Every strategy runs the same per-instance generator and differs only in
//! how the instantiator reaches the worker: borrowed, cloned per task,
//! shared behind an `Arc`, or rebuilt from disk.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use designspace::Instance;
use instantiator::Instantiator;
use log::{error, info};
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use tokio::{runtime::Builder as RuntimeBuilder, sync::Semaphore, task::JoinSet};

use crate::{
    config::RunConfig,
    generate::{build_instantiator, generate_and_write, load_exportable, rebuild_and_generate},
    io::ensure_dir,
    parallel::{BatchResult, collect_outcomes, guarded},
};

/// How instance generation is spread over workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain loop on the calling thread
    Serial,
    /// Rayon pool; every task owns a clone of the instantiator
    Copy,
    /// Worker threads pulling from a shared cursor, instantiator behind an `Arc`
    Shared,
    /// Rayon pool; every task reloads the designspace and rebuilds
    Reread,
    /// Tokio blocking tasks gated by a semaphore
    Async,
}

impl Strategy {
    pub const ALL: [Strategy; 5] =
        [Strategy::Serial, Strategy::Copy, Strategy::Shared, Strategy::Reread, Strategy::Async];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Serial => "serial",
            Strategy::Copy => "copy",
            Strategy::Shared => "shared",
            Strategy::Reread => "reread",
            Strategy::Async => "async",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock time spent in each phase of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub load: Duration,
    /// `None` when the strategy builds inside its workers
    pub build: Option<Duration>,
    pub distribute: Duration,
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load {:.2}s", self.load.as_secs_f64())?;
        if let Some(build) = self.build {
            write!(f, ", build {:.2}s", build.as_secs_f64())?;
        }
        write!(f, ", distribute {:.2}s", self.distribute.as_secs_f64())
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub batch: BatchResult,
    pub timings: PhaseTimings,
}

/// Load, build and distribute: the full generation run for one strategy.
pub fn run(strategy: Strategy, config: &RunConfig) -> Result<RunReport> {
    let start = Instant::now();
    let designspace = load_exportable(&config.designspace_path)?;
    let load = start.elapsed();
    info!(
        "Loaded {} with {} exportable instances",
        config.designspace_path.display(),
        designspace.instances.len()
    );

    ensure_dir(config.output_dir())?;

    let start = Instant::now();
    let engine = match strategy {
        Strategy::Reread => None,
        _ => {
            println!("Instantiating instantiator");
            Some(build_instantiator(&designspace)?)
        }
    };
    let build = engine.as_ref().map(|_| start.elapsed());

    let instances = &designspace.instances;
    let output_dir = config.output_dir();
    let jobs = config.jobs;

    let start = Instant::now();
    let outcomes = match (strategy, engine) {
        (Strategy::Reread, _) => {
            run_reread(&config.designspace_path, instances, output_dir, jobs)?
        }
        (Strategy::Serial, Some(engine)) => run_serial(&engine, instances, output_dir),
        (Strategy::Copy, Some(engine)) => run_copy(&engine, instances, output_dir, jobs)?,
        (Strategy::Shared, Some(engine)) => {
            run_shared(Arc::new(engine), instances, output_dir, jobs)
        }
        (Strategy::Async, Some(engine)) => {
            run_async(Arc::new(engine), instances, output_dir, jobs)?
        }
        (_, None) => return Err(anyhow!("{strategy} requires a prebuilt instantiator")),
    };
    let distribute = start.elapsed();

    let batch = collect_outcomes(strategy.name(), instances, outcomes)?;
    let timings = PhaseTimings { load, build, distribute };
    println!("Timings ({strategy}, {jobs} jobs): {timings}");

    Ok(RunReport { batch, timings })
}

fn queue(instances: &[Instance]) {
    for instance in instances {
        println!("Queueing {}", instance.name);
    }
}

fn thread_pool(jobs: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new().num_threads(jobs).build().context("Failed to build thread pool")
}

/// Fill slots left empty by a worker that died, keeping designspace order.
fn settle(instances: &[Instance], slots: Vec<Option<Result<PathBuf>>>) -> Vec<Result<PathBuf>> {
    slots
        .into_iter()
        .zip(instances)
        .map(|(slot, instance)| {
            slot.unwrap_or_else(|| Err(anyhow!("No result was produced for '{}'", instance.name)))
        })
        .collect()
}

pub fn run_serial(
    engine: &Instantiator,
    instances: &[Instance],
    output_dir: &Path,
) -> Vec<Result<PathBuf>> {
    instances
        .iter()
        .map(|instance| generate_and_write(engine, instance, output_dir))
        .collect()
}

pub fn run_copy(
    engine: &Instantiator,
    instances: &[Instance],
    output_dir: &Path,
    jobs: usize,
) -> Result<Vec<Result<PathBuf>>> {
    let pool = thread_pool(jobs)?;
    queue(instances);
    Ok(pool.install(|| {
        instances
            .par_iter()
            .map(|instance| {
                let engine = engine.clone();
                guarded(instance, move || generate_and_write(&engine, instance, output_dir))
            })
            .collect()
    }))
}

pub fn run_shared(
    engine: Arc<Instantiator>,
    instances: &[Instance],
    output_dir: &Path,
    jobs: usize,
) -> Vec<Result<PathBuf>> {
    let cursor = AtomicUsize::new(0);
    let slots: Vec<OnceLock<Result<PathBuf>>> = instances.iter().map(|_| OnceLock::new()).collect();
    queue(instances);

    thread::scope(|scope| {
        let workers: Vec<_> = (0..jobs.min(instances.len()))
            .map(|_| {
                let engine = Arc::clone(&engine);
                let (cursor, slots) = (&cursor, &slots);
                scope.spawn(move || {
                    loop {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(instance) = instances.get(index) else {
                            break;
                        };
                        let outcome =
                            guarded(instance, || generate_and_write(&engine, instance, output_dir));
                        let _ = slots[index].set(outcome);
                    }
                })
            })
            .collect();

        for worker in workers {
            if worker.join().is_err() {
                error!("Shared worker thread panicked");
            }
        }
    });

    settle(instances, slots.into_iter().map(OnceLock::into_inner).collect())
}

pub fn run_reread(
    designspace_path: &Path,
    instances: &[Instance],
    output_dir: &Path,
    jobs: usize,
) -> Result<Vec<Result<PathBuf>>> {
    let pool = thread_pool(jobs)?;
    queue(instances);
    Ok(pool.install(|| {
        instances
            .par_iter()
            .enumerate()
            .map(|(index, instance)| {
                guarded(instance, || rebuild_and_generate(designspace_path, index, output_dir))
            })
            .collect()
    }))
}

pub fn run_async(
    engine: Arc<Instantiator>,
    instances: &[Instance],
    output_dir: &Path,
    jobs: usize,
) -> Result<Vec<Result<PathBuf>>> {
    let runtime = RuntimeBuilder::new_multi_thread()
        .worker_threads(jobs)
        .max_blocking_threads(jobs)
        .build()
        .context("Failed to start async runtime")?;

    let slots = runtime.block_on(async {
        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut tasks = JoinSet::new();

        for (index, instance) in instances.iter().enumerate() {
            println!("Queueing {}", instance.name);
            let permit = Arc::clone(&semaphore).acquire_owned().await.context("Semaphore closed")?;
            let engine = Arc::clone(&engine);
            let instance = instance.clone();
            let output_dir = output_dir.to_path_buf();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let outcome =
                    guarded(&instance, || generate_and_write(&engine, &instance, &output_dir));
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<PathBuf>>> = instances.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!("Async task did not complete: {e}"),
            }
        }
        Ok::<_, anyhow::Error>(slots)
    })?;

    Ok(settle(instances, slots))
}

//! Configuration constants and resolved run settings.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread::available_parallelism,
};

use anyhow::{Result, bail};

/// Extension of generated instance files.
pub const OUTPUT_EXTENSION: &str = "ttf";

/// Worker count used when the platform cannot report its parallelism.
pub const FALLBACK_JOBS: usize = 4;

/// Default worker count: one per available CPU.
pub fn default_jobs() -> usize {
    available_parallelism().map(NonZeroUsize::get).unwrap_or(FALLBACK_JOBS)
}

/// Validated settings shared by every distributor.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub designspace_path: PathBuf,
    pub output_dir: PathBuf,
    pub jobs: usize,
}

impl RunConfig {
    pub fn new(
        designspace_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        jobs: Option<usize>,
    ) -> Result<Self> {
        let jobs = jobs.unwrap_or_else(default_jobs);
        if jobs == 0 {
            bail!("--jobs must be at least 1");
        }
        Ok(Self { designspace_path: designspace_path.into(), output_dir: output_dir.into(), jobs })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

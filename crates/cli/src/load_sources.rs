//! Source loading benchmark: read every master eagerly and report timing.

use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use instantiator::{Master, load_masters};
use log::info;

use crate::{generate::load_exportable, io::expand_patterns};

/// Where the masters to load come from.
#[derive(Debug, Clone)]
pub enum SourceSelection {
    Designspace(PathBuf),
    Patterns(Vec<String>),
}

#[derive(Debug, Clone, Copy)]
pub struct LoadReport {
    pub masters: usize,
    pub glyphs: usize,
    pub seconds: f64,
}

pub fn load_sources(selection: &SourceSelection) -> Result<LoadReport> {
    let start = Instant::now();
    let masters = match selection {
        SourceSelection::Designspace(path) => {
            let designspace = load_exportable(path)?;
            load_masters(&designspace).context("Failed to load sources")?
        }
        SourceSelection::Patterns(patterns) => expand_patterns(patterns)?
            .iter()
            .map(|path| {
                info!("Loading {}", path.display());
                Master::load(path).with_context(|| format!("Failed to load {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?,
    };

    let report = LoadReport {
        masters: masters.len(),
        glyphs: masters.iter().map(Master::num_glyphs).sum(),
        seconds: start.elapsed().as_secs_f64(),
    };
    println!(
        "Loaded {} sources ({} glyphs) in {:.2}s",
        report.masters, report.glyphs, report.seconds
    );
    Ok(report)
}

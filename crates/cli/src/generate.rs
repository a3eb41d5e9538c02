//! Per-instance work shared by every distributor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use designspace::{DesignSpace, Instance};
use instantiator::Instantiator;
use log::debug;

use crate::{config::OUTPUT_EXTENSION, io::FontFile};

/// Generate one instance and write it to `output_dir/{file_stem}.ttf`.
pub fn generate_and_write(
    instantiator: &Instantiator,
    instance: &Instance,
    output_dir: &Path,
) -> Result<PathBuf> {
    println!("Generating {}", instance.name);
    let generated = instantiator
        .generate_instance(instance)
        .with_context(|| format!("Failed to generate instance '{}'", instance.name))?;

    let file_name = format!("{}.{OUTPUT_EXTENSION}", generated.file_stem());
    let file = FontFile::new(output_dir.join(file_name));
    file.write(&generated.data)?;
    debug!("Wrote {} ({} bytes)", file.path().display(), generated.data.len());
    Ok(file.path().to_path_buf())
}

/// Load the designspace and keep only exportable instances.
pub fn load_exportable(path: &Path) -> Result<DesignSpace> {
    let mut designspace = DesignSpace::load(path)
        .with_context(|| format!("Failed to load designspace: {}", path.display()))?;
    let skipped = designspace.retain_exportable();
    if skipped > 0 {
        debug!("Skipping {skipped} non-exportable instances");
    }
    Ok(designspace)
}

pub fn build_instantiator(designspace: &DesignSpace) -> Result<Instantiator> {
    Instantiator::from_designspace(designspace).context("Failed to build instantiator")
}

/// Reload everything from disk and generate instance `index` in isolation.
pub fn rebuild_and_generate(
    designspace_path: &Path,
    index: usize,
    output_dir: &Path,
) -> Result<PathBuf> {
    let designspace = load_exportable(designspace_path)?;
    let instance = designspace.instances.get(index).with_context(|| {
        format!("Instance #{index} disappeared from {}", designspace_path.display())
    })?;
    let instantiator = build_instantiator(&designspace)?;
    debug!("Rebuilt instantiator for {}", instance.name);
    generate_and_write(&instantiator, instance, output_dir)
}

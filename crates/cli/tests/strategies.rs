//! Every distributor must produce the same files from the same designspace.

#[path = "../../instantiator/tests/common/mod.rs"]
mod common;

use std::path::Path;

use gen_instances_cli::{
    Strategy,
    config::RunConfig,
    load_sources::{SourceSelection, load_sources},
    run,
};
use tempfile::TempDir;

const EXPECTED_FILES: [&str; 2] = ["FixtureSans-Regular.ttf", "FixtureSans-Medium.ttf"];

fn setup() -> (TempDir, RunConfig) {
    let dir = TempDir::new().unwrap();
    let designspace = common::write_family(dir.path(), common::INSTANCES);
    let config = RunConfig::new(designspace, dir.path().join("out/instances"), Some(2)).unwrap();
    (dir, config)
}

fn read_outputs(output_dir: &Path) -> Vec<Vec<u8>> {
    EXPECTED_FILES.iter().map(|name| std::fs::read(output_dir.join(name)).unwrap()).collect()
}

#[test]
fn all_strategies_write_identical_instances() {
    let mut reference: Option<Vec<Vec<u8>>> = None;

    for strategy in Strategy::ALL {
        let (_dir, config) = setup();
        let report = run(strategy, &config).unwrap();

        assert_eq!(report.batch.succeeded, 2, "{strategy}");
        assert!(report.batch.all_succeeded(), "{strategy}");
        assert!(!config.output_dir().join("FixtureSans-Hidden.ttf").exists());

        let outputs = read_outputs(config.output_dir());
        match &reference {
            Some(expected) => assert_eq!(&outputs, expected, "{strategy} output differs"),
            None => reference = Some(outputs),
        }
    }
}

#[test]
fn written_paths_follow_designspace_order() {
    let (_dir, config) = setup();
    let report = run(Strategy::Shared, &config).unwrap();

    let names: Vec<_> = report
        .batch
        .written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, EXPECTED_FILES);
}

#[test]
fn reread_skips_upfront_build() {
    let (_dir, config) = setup();
    let report = run(Strategy::Reread, &config).unwrap();
    assert!(report.timings.build.is_none());

    let report = run(Strategy::Serial, &config).unwrap();
    assert!(report.timings.build.is_some());
}

#[test]
fn existing_outputs_are_overwritten() {
    let (_dir, config) = setup();
    std::fs::create_dir_all(config.output_dir()).unwrap();
    let stale = config.output_dir().join(EXPECTED_FILES[0]);
    std::fs::write(&stale, b"stale").unwrap();

    run(Strategy::Copy, &config).unwrap();
    assert_ne!(std::fs::read(&stale).unwrap(), b"stale");
}

#[test]
fn failure_is_reported_after_all_instances_ran() {
    for strategy in [Strategy::Copy, Strategy::Shared, Strategy::Async] {
        let (_dir, config) = setup();
        // A directory in the way makes writing the Medium instance fail
        std::fs::create_dir_all(config.output_dir().join(EXPECTED_FILES[1])).unwrap();

        let err = run(strategy, &config).unwrap_err();
        assert!(format!("{err:#}").contains("Fixture Sans Medium"), "{strategy}: {err:#}");
        assert!(config.output_dir().join(EXPECTED_FILES[0]).is_file(), "{strategy}");
    }
}

#[test]
fn load_sources_from_designspace_and_patterns() {
    let (dir, config) = setup();

    let from_designspace =
        load_sources(&SourceSelection::Designspace(config.designspace_path.clone())).unwrap();
    assert_eq!(from_designspace.masters, 2);

    let pattern = format!("{}/*.ttf", dir.path().display());
    let from_patterns = load_sources(&SourceSelection::Patterns(vec![pattern])).unwrap();
    assert_eq!(from_patterns.masters, 2);
    assert_eq!(from_patterns.glyphs, from_designspace.glyphs);
}

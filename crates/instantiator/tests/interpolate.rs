//! End-to-end interpolation against a two-master fixture family.

mod common;

use designspace::{Axis, DesignSpace, Instance, Source};
use instantiator::{Error, Instantiator, Master};
use read_fonts::{
    FontRef, TableProvider,
    tables::{
        glyf::{CompositeGlyphFlags, Glyph},
        head::MacStyle,
        os2::SelectionFlags,
    },
    types::{GlyphId, NameId},
};
use tempfile::TempDir;

fn setup() -> (TempDir, DesignSpace) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    let path = common::write_family(dir.path(), common::INSTANCES);
    let designspace = DesignSpace::load(path).unwrap();
    (dir, designspace)
}

fn advance(data: &[u8], glyph_id: u32) -> u16 {
    let font = FontRef::new(data).unwrap();
    font.hmtx().unwrap().advance(GlyphId::new(glyph_id)).unwrap()
}

fn simple_x_min(data: &[u8], glyph_id: u32) -> Option<i16> {
    let font = FontRef::new(data).unwrap();
    let glyf = font.glyf().unwrap();
    let loca = font.loca(None).unwrap();
    match loca.get_glyf(GlyphId::new(glyph_id), &glyf).unwrap()? {
        Glyph::Simple(simple) if simple.num_points() > 0 => Some(simple.x_min()),
        _ => None,
    }
}

fn name_record(data: &[u8], name_id: u16) -> Option<String> {
    let font = FontRef::new(data).unwrap();
    let name = font.name().unwrap();
    name.name_record()
        .iter()
        .find(|record| record.name_id() == NameId::new(name_id))
        .and_then(|record| record.string(name.string_data()).ok())
        .map(|s| s.to_string())
}

#[test]
fn default_instance_keeps_default_metrics() {
    let (_dir, designspace) = setup();
    let instantiator = Instantiator::from_designspace(&designspace).unwrap();

    let regular = instantiator.generate_instance(&designspace.instances[0]).unwrap();
    let original = font_test_data::VAZIRMATN_VAR;

    for glyph_id in 0..instantiator.num_glyphs() as u32 {
        assert_eq!(advance(&regular.data, glyph_id), advance(original, glyph_id));
    }
}

#[test]
fn midpoint_instance_is_interpolated() {
    let (_dir, designspace) = setup();
    let instantiator = Instantiator::from_designspace(&designspace).unwrap();

    let regular = instantiator.generate_instance(&designspace.instances[0]).unwrap();
    let medium = instantiator.generate_instance(&designspace.instances[1]).unwrap();

    // 650 sits halfway between the masters
    let half_shift = (common::SHIFT / 2.0) as i16;
    let glyph_id = (0..instantiator.num_glyphs() as u32)
        .find(|&gid| simple_x_min(&regular.data, gid).is_some())
        .expect("fixture has outlined glyphs");

    assert_eq!(
        simple_x_min(&medium.data, glyph_id).unwrap(),
        simple_x_min(&regular.data, glyph_id).unwrap() + half_shift
    );
    assert_eq!(
        advance(&medium.data, glyph_id),
        advance(&regular.data, glyph_id) + common::SHIFT as u16
    );
}

#[test]
fn writes_names_and_weight_class() {
    let (_dir, designspace) = setup();
    let instantiator = Instantiator::from_designspace(&designspace).unwrap();
    let medium = instantiator.generate_instance(&designspace.instances[1]).unwrap();

    assert_eq!(medium.file_name(), "FixtureSans-Medium.ttf");
    assert_eq!(name_record(&medium.data, 1).as_deref(), Some("Fixture Sans Medium"));
    assert_eq!(name_record(&medium.data, 2).as_deref(), Some("Regular"));
    assert_eq!(name_record(&medium.data, 6).as_deref(), Some("FixtureSans-Medium"));
    assert_eq!(name_record(&medium.data, 16).as_deref(), Some("Fixture Sans"));
    assert_eq!(name_record(&medium.data, 17).as_deref(), Some("Medium"));

    let font = FontRef::new(&medium.data).unwrap();
    let os2 = font.os2().unwrap();
    assert_eq!(os2.us_weight_class(), 650);
    assert_eq!(os2.us_width_class(), 5);
    assert_eq!(os2.s_typo_ascender(), 1100);
    assert_eq!(os2.fs_selection(), SelectionFlags::REGULAR | SelectionFlags::USE_TYPO_METRICS);
    assert_eq!(font.post().unwrap().underline_position().to_i16(), -100);
    assert!(font.fvar().is_err());
    assert!(font.gvar().is_err());
}

#[test]
fn bold_instance_is_style_linked() {
    let (_dir, designspace) = setup();
    let instantiator = Instantiator::from_designspace(&designspace).unwrap();
    let instance = Instance::new("Fixture Sans Bold", [("Weight", 900.0)])
        .with_family_name("Fixture Sans")
        .with_style_name("Bold")
        .with_postscript_name("FixtureSans-Bd");
    let bold = instantiator.generate_instance(&instance).unwrap();

    assert_eq!(name_record(&bold.data, 1).as_deref(), Some("Fixture Sans"));
    assert_eq!(name_record(&bold.data, 2).as_deref(), Some("Bold"));
    assert_eq!(name_record(&bold.data, 6).as_deref(), Some("FixtureSans-Bd"));

    let font = FontRef::new(&bold.data).unwrap();
    let os2 = font.os2().unwrap();
    assert_eq!(os2.us_weight_class(), 900);
    assert!(os2.fs_selection().contains(SelectionFlags::BOLD));
    assert!(!os2.fs_selection().contains(SelectionFlags::REGULAR));
    assert!(os2.fs_selection().contains(SelectionFlags::USE_TYPO_METRICS));
    assert_eq!(font.head().unwrap().mac_style(), MacStyle::BOLD);
}

#[test]
fn width_axis_sets_width_class() {
    let master = Master::from_bytes("Regular.ttf", common::base_master(400)).unwrap();
    let designspace = DesignSpace::new(
        vec![
            Axis::new("wght", "Weight", 100.0, 400.0, 900.0),
            Axis::new("wdth", "Width", 75.0, 100.0, 100.0),
        ],
        vec![Source::new("Regular.ttf", [("Weight", 400.0), ("Width", 100.0)])],
    );
    let instantiator = Instantiator::from_masters(&designspace, vec![master]).unwrap();

    let condensed = Instance::new("Condensed", [("Width", 75.0)]).with_family_name("Fixture Sans");
    let generated = instantiator.generate_instance(&condensed).unwrap();

    let font = FontRef::new(&generated.data).unwrap();
    assert_eq!(font.os2().unwrap().us_width_class(), 3);
    assert_eq!(font.os2().unwrap().us_weight_class(), 400);
}

#[test]
fn default_instance_keeps_composite_hinting() {
    let (_dir, designspace) = setup();
    let instantiator = Instantiator::from_designspace(&designspace).unwrap();
    let regular = instantiator.generate_instance(&designspace.instances[0]).unwrap();

    let original = FontRef::new(font_test_data::VAZIRMATN_VAR).unwrap();
    let generated = FontRef::new(&regular.data).unwrap();
    let kept = CompositeGlyphFlags::USE_MY_METRICS
        | CompositeGlyphFlags::ROUND_XY_TO_GRID
        | CompositeGlyphFlags::OVERLAP_COMPOUND
        | CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS
        | CompositeGlyphFlags::MORE_COMPONENTS;
    let composite = |font: &FontRef<'_>, gid: u32| {
        let glyf = font.glyf().unwrap();
        let loca = font.loca(None).unwrap();
        match loca.get_glyf(GlyphId::new(gid), &glyf).unwrap() {
            Some(Glyph::Composite(composite)) => Some((
                composite.components().map(|c| c.flags & kept).collect::<Vec<_>>(),
                composite.instructions().map(<[u8]>::to_vec),
            )),
            _ => None,
        }
    };

    let mut checked = 0;
    for gid in 0..instantiator.num_glyphs() as u32 {
        if let Some(expected) = composite(&original, gid) {
            assert_eq!(composite(&generated, gid), Some(expected), "glyph {gid}");
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[test]
fn export_filter_drops_hidden_instance() {
    let (_dir, mut designspace) = setup();
    assert_eq!(designspace.retain_exportable(), 1);
    assert_eq!(designspace.instances.len(), 2);
}

#[test]
fn clone_generates_identical_output() {
    let (_dir, designspace) = setup();
    let instantiator = Instantiator::from_designspace(&designspace).unwrap();
    let copy = instantiator.clone();

    let a = instantiator.generate_instance(&designspace.instances[1]).unwrap();
    let b = copy.generate_instance(&designspace.instances[1]).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn rejects_glyph_count_mismatch() {
    let (dir, designspace) = setup();
    let regular = Master::load(dir.path().join("Regular.ttf")).unwrap();
    let mut bold = Master::load(dir.path().join("Bold.ttf")).unwrap();
    bold.glyphs.pop();
    bold.advances.pop();

    let err = Instantiator::from_masters(&designspace, vec![regular, bold]).unwrap_err();
    assert!(matches!(err, Error::GlyphCountMismatch { .. }));
    assert!(err.to_string().contains("Bold.ttf"));
}

#[test]
fn missing_master_is_reported() {
    let (dir, designspace) = setup();
    std::fs::remove_file(dir.path().join("Bold.ttf")).unwrap();

    let err = Instantiator::from_designspace(&designspace).unwrap_err();
    assert!(matches!(err, Error::ReadFont { .. }));
}

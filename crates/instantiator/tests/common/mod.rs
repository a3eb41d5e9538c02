//! Fixture family: the Vazirmatn default master plus a copy shifted right.
//!
//! Shared by the instantiator and cli integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use instantiator::{
    GlyphGeometry, InstanceOutlines, Master, VariationModel, VariedGlyph, assemble_font,
};
use read_fonts::{FontRef, tables::os2::SelectionFlags, types::FWord};
use write_fonts::{
    FontBuilder,
    tables::{os2::Os2, post::Post},
};

/// Horizontal shift of the "Bold" master; its advances grow by twice this.
pub const SHIFT: f64 = 20.0;

/// Vazirmatn plus the OS/2 and post tables the test font ships without.
pub fn base_master(weight_class: u16) -> Vec<u8> {
    let font = FontRef::new(font_test_data::VAZIRMATN_VAR).unwrap();
    let os2 = Os2 {
        us_weight_class: weight_class,
        fs_selection: SelectionFlags::REGULAR | SelectionFlags::USE_TYPO_METRICS,
        s_typo_ascender: 1100,
        s_typo_descender: -600,
        us_win_ascent: 1100,
        us_win_descent: 600,
        ul_code_page_range_1: Some(1),
        ul_code_page_range_2: Some(0),
        sx_height: Some(500),
        s_cap_height: Some(700),
        us_default_char: Some(0),
        us_break_char: Some(32),
        us_max_context: Some(0),
        ..Default::default()
    };
    let post = Post {
        underline_position: FWord::new(-100),
        underline_thickness: FWord::new(50),
        ..Default::default()
    };

    let mut builder = FontBuilder::new();
    builder.add_table(&os2).unwrap();
    builder.add_table(&post).unwrap();
    builder.copy_missing_tables(font);
    builder.build()
}

pub fn shifted_master(shift: f64) -> Vec<u8> {
    let mut master = Master::from_bytes("Bold.ttf", base_master(700)).unwrap();
    for glyph in &mut master.glyphs {
        if let GlyphGeometry::Simple { points, .. } = glyph {
            for point in points {
                point.x += shift;
            }
        }
    }
    for advance in &mut master.advances {
        *advance += (2.0 * shift) as u16;
    }

    let model = VariationModel::new(&[vec![0.0]], 0);
    let masters = [master];
    let glyphs = (0..masters[0].num_glyphs())
        .map(|glyph_id| {
            let glyph = VariedGlyph::build(glyph_id, &masters, &model).unwrap();
            glyph.instantiate(&[]).unwrap()
        })
        .collect();
    let [master] = masters;

    assemble_font(
        &master.data,
        InstanceOutlines { glyphs, advances: master.advances, metrics: master.metrics },
        None,
        &[],
    )
    .unwrap()
}

pub fn designspace_xml(instances: &str) -> String {
    format!(
        r#"<?xml version='1.0' encoding='UTF-8'?>
<designspace format="5.0">
  <axes>
    <axis tag="wght" name="Weight" minimum="100" default="400" maximum="900"/>
  </axes>
  <sources>
    <source filename="Regular.ttf" familyname="Fixture Sans" stylename="Regular">
      <location><dimension name="Weight" xvalue="400"/></location>
    </source>
    <source filename="Bold.ttf" familyname="Fixture Sans" stylename="Bold">
      <location><dimension name="Weight" xvalue="900"/></location>
    </source>
  </sources>
  <instances>
{instances}
  </instances>
</designspace>
"#
    )
}

pub const INSTANCES: &str = r#"    <instance name="Fixture Sans Regular" familyname="Fixture Sans" stylename="Regular">
      <location><dimension name="Weight" xvalue="400"/></location>
    </instance>
    <instance name="Fixture Sans Medium" familyname="Fixture Sans" stylename="Medium">
      <location><dimension name="Weight" xvalue="650"/></location>
    </instance>
    <instance name="Fixture Sans Hidden" familyname="Fixture Sans" stylename="Hidden">
      <location><dimension name="Weight" xvalue="900"/></location>
      <lib>
        <dict>
          <key>com.schriftgestaltung.export</key>
          <false/>
        </dict>
      </lib>
    </instance>"#;

/// Write both masters and a designspace into `dir`; returns the designspace path.
pub fn write_family(dir: &Path, instances: &str) -> PathBuf {
    std::fs::write(dir.join("Regular.ttf"), base_master(400)).unwrap();
    std::fs::write(dir.join("Bold.ttf"), shifted_master(SHIFT)).unwrap();
    let path = dir.join("Fixture.designspace");
    std::fs::write(&path, designspace_xml(instances)).unwrap();
    path
}

//! Static font assembly.
//!
//! Rebuilds the outline and metric tables of an instance and copies the rest
//! from the default master.

use read_fonts::{
    FontRef, TableProvider,
    tables::{
        head::MacStyle,
        hhea::Hhea,
        os2::{Os2, SelectionFlags},
        post::Post,
    },
    types::{NameId, Tag},
};
use write_fonts::{
    FontBuilder,
    from_obj::ToOwnedTable,
    tables::{
        glyf::{Bbox, GlyfLocaBuilder, Glyph as WriteGlyph},
        head::Head,
        hhea::Hhea as WriteHhea,
        hmtx::{Hmtx, LongMetric},
        loca::LocaFormat,
        name::{Name, NameRecord},
        os2::Os2 as WriteOs2,
        post::Post as WritePost,
    },
};

use crate::{
    error::Result,
    master::Metric,
    outline::{clamp_i16, glyph_x_min, ot_round, resolve_composite_bboxes},
};

/// Variation tables from a variable default master; a static instance drops them.
const VARIATION_TABLES: [Tag; 8] = [
    Tag::new(b"fvar"),
    Tag::new(b"gvar"),
    Tag::new(b"avar"),
    Tag::new(b"cvar"),
    Tag::new(b"HVAR"),
    Tag::new(b"MVAR"),
    Tag::new(b"VVAR"),
    Tag::new(b"STAT"),
];

const REPLACED_TABLES: [Tag; 8] = [
    Tag::new(b"glyf"),
    Tag::new(b"loca"),
    Tag::new(b"hmtx"),
    Tag::new(b"head"),
    Tag::new(b"hhea"),
    Tag::new(b"OS/2"),
    Tag::new(b"post"),
    Tag::new(b"name"),
];

const REMOVED_TABLES: [Tag; 1] = [Tag::new(b"DSIG")];

const RIBBI_STYLES: [&str; 4] = ["Regular", "Bold", "Italic", "Bold Italic"];

/// Interpolated outline data for one instance.
#[derive(Debug, Clone)]
pub struct InstanceOutlines {
    pub glyphs: Vec<WriteGlyph>,
    pub advances: Vec<u16>,
    /// Indexed by [`Metric::index`]
    pub metrics: Vec<f64>,
}

fn rounded_metric(metrics: &[f64], metric: Metric) -> Option<i16> {
    metrics.get(metric.index()).map(|&v| clamp_i16(ot_round(v)))
}

/// Names written into the instance's name table.
#[derive(Debug, Clone, Copy)]
pub struct InstanceNames<'a> {
    pub family: &'a str,
    pub style: &'a str,
    pub postscript: Option<&'a str>,
}

impl InstanceNames<'_> {
    fn is_ribbi(&self) -> bool {
        RIBBI_STYLES.contains(&self.style)
    }

    /// Subfamily for name ID 2: the style itself for RIBBI, else Regular or Italic.
    fn legacy_style(&self) -> &str {
        if self.is_ribbi() {
            self.style
        } else if self.style.contains("Italic") {
            "Italic"
        } else {
            "Regular"
        }
    }
}

/// Bold and italic bits implied by the legacy subfamily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StyleLinking {
    bold: bool,
    italic: bool,
}

impl StyleLinking {
    fn from_names(names: &InstanceNames) -> Self {
        let style = names.legacy_style();
        Self { bold: style.starts_with("Bold"), italic: style.ends_with("Italic") }
    }

    fn mac_style(self, mut mac_style: MacStyle) -> MacStyle {
        mac_style.remove(MacStyle::BOLD | MacStyle::ITALIC);
        if self.bold {
            mac_style.insert(MacStyle::BOLD);
        }
        if self.italic {
            mac_style.insert(MacStyle::ITALIC);
        }
        mac_style
    }

    fn fs_selection(self, mut selection: SelectionFlags) -> SelectionFlags {
        selection.remove(SelectionFlags::BOLD | SelectionFlags::ITALIC | SelectionFlags::REGULAR);
        if self.bold {
            selection.insert(SelectionFlags::BOLD);
        }
        if self.italic {
            selection.insert(SelectionFlags::ITALIC);
        }
        if !self.bold && !self.italic {
            selection.insert(SelectionFlags::REGULAR);
        }
        selection
    }
}

/// Assemble a static TrueType font from rebuilt outlines and the default master.
///
/// `user_location` holds (axis tag, user-space value) pairs used for the OS/2
/// weight and width classes.
pub fn assemble_font(
    default_data: &[u8],
    outlines: InstanceOutlines,
    names: Option<InstanceNames>,
    user_location: &[(String, f64)],
) -> Result<Vec<u8>> {
    let font = FontRef::new(default_data)?;
    let InstanceOutlines { mut glyphs, advances, metrics } = outlines;
    let linking = names.as_ref().map(StyleLinking::from_names);

    resolve_composite_bboxes(&mut glyphs);
    let bounds = Extents::measure(&glyphs, &advances);

    let mut glyf_builder = GlyfLocaBuilder::new();
    let mut lsbs: Vec<i16> = Vec::with_capacity(glyphs.len());
    for glyph in &glyphs {
        lsbs.push(glyph_x_min(glyph).unwrap_or(0));
        glyf_builder.add_glyph(glyph)?;
    }

    let (glyf, loca, loca_format) = glyf_builder.build();
    let num_h_metrics = long_metric_count(&advances);

    let mut builder = FontBuilder::new();
    builder.add_table(&glyf)?;
    builder.add_table(&loca)?;
    builder.add_table(&build_hmtx(&advances, &lsbs, num_h_metrics))?;

    if let Ok(head) = font.head() {
        let new_head = Head::new(
            head.font_revision(),
            head.checksum_adjustment(),
            head.flags(),
            head.units_per_em(),
            head.created(),
            head.modified(),
            bounds.bbox.x_min,
            bounds.bbox.y_min,
            bounds.bbox.x_max,
            bounds.bbox.y_max,
            linking.map_or(head.mac_style(), |l| l.mac_style(head.mac_style())),
            head.lowest_rec_ppem(),
            match loca_format {
                LocaFormat::Short => 0,
                LocaFormat::Long => 1,
            },
        );
        builder.add_table(&new_head)?;
    }

    if let Ok(hhea) = font.hhea() {
        builder.add_table(&build_hhea(&hhea, &bounds, &metrics, num_h_metrics))?;
    }

    if let Ok(os2) = font.os2() {
        builder.add_table(&build_os2(&os2, &metrics, user_location, linking))?;
    }

    if let Ok(post) = font.post() {
        builder.add_table(&build_post(&post, &metrics))?;
    }

    let original_name = font.name().ok();
    if let Some(names) = names {
        builder.add_table(&build_name(original_name.as_ref(), names))?;
    } else if let Some(original) = original_name {
        let copied: Name = original.to_owned_table();
        builder.add_table(&copied)?;
    }

    for record in font.table_directory.table_records() {
        let tag = record.tag();
        if !VARIATION_TABLES.contains(&tag)
            && !REPLACED_TABLES.contains(&tag)
            && !REMOVED_TABLES.contains(&tag)
            && let Some(data) = font.table_data(tag)
        {
            builder.add_raw(tag, data);
        }
    }

    Ok(builder.build())
}

/// Trailing glyphs sharing the last advance only need a side bearing.
fn long_metric_count(advances: &[u16]) -> usize {
    let mut count = advances.len();
    while count > 1 && advances[count - 1] == advances[count - 2] {
        count -= 1;
    }
    count
}

fn build_hmtx(advances: &[u16], lsbs: &[i16], num_h_metrics: usize) -> Hmtx {
    let h_metrics = advances[..num_h_metrics]
        .iter()
        .zip(lsbs)
        .map(|(&advance, &side_bearing)| LongMetric { advance, side_bearing })
        .collect();
    let left_side_bearings = lsbs[num_h_metrics..].to_vec();

    Hmtx { h_metrics, left_side_bearings }
}

/// Font-wide extents of the rebuilt glyphs, for head and hhea.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Extents {
    bbox: Bbox,
    advance_width_max: u16,
    min_left_side_bearing: i16,
    min_right_side_bearing: i16,
    x_max_extent: i16,
}

impl Extents {
    /// Glyphs without ink are ignored; a font without any ink has zero extents.
    fn measure(glyphs: &[WriteGlyph], advances: &[u16]) -> Self {
        let advance_width_max = advances.iter().copied().max().unwrap_or(0);
        glyphs
            .iter()
            .zip(advances)
            .filter_map(|(glyph, &advance)| {
                let bbox = match glyph {
                    WriteGlyph::Simple(simple) => simple.bbox,
                    WriteGlyph::Composite(composite) => composite.bbox,
                    WriteGlyph::Empty => return None,
                };
                (bbox != Bbox::default()).then(|| Self {
                    bbox,
                    advance_width_max,
                    min_left_side_bearing: bbox.x_min,
                    min_right_side_bearing: clamp_i16(i32::from(advance) - i32::from(bbox.x_max)),
                    x_max_extent: bbox.x_max,
                })
            })
            .reduce(|a, b| Self {
                bbox: a.bbox.union(b.bbox),
                advance_width_max,
                min_left_side_bearing: a.min_left_side_bearing.min(b.min_left_side_bearing),
                min_right_side_bearing: a.min_right_side_bearing.min(b.min_right_side_bearing),
                x_max_extent: a.x_max_extent.max(b.x_max_extent),
            })
            .unwrap_or(Self { advance_width_max, ..Default::default() })
    }
}

fn build_hhea(
    original: &Hhea,
    bounds: &Extents,
    metrics: &[f64],
    num_h_metrics: usize,
) -> WriteHhea {
    let ascender = rounded_metric(metrics, Metric::HheaAscender).unwrap_or(original.ascender().to_i16());
    let descender =
        rounded_metric(metrics, Metric::HheaDescender).unwrap_or(original.descender().to_i16());
    let line_gap = rounded_metric(metrics, Metric::HheaLineGap).unwrap_or(original.line_gap().to_i16());

    WriteHhea::new(
        ascender.into(),
        descender.into(),
        line_gap.into(),
        bounds.advance_width_max.into(),
        bounds.min_left_side_bearing.into(),
        bounds.min_right_side_bearing.into(),
        bounds.x_max_extent.into(),
        original.caret_slope_rise(),
        original.caret_slope_run(),
        original.caret_offset(),
        num_h_metrics as u16,
    )
}

/// Upper wdth bound of usWidthClass 1 through 8; anything wider is class 9.
const WIDTH_CLASS_LIMITS: [f64; 8] = [56.25, 68.75, 81.25, 93.75, 106.25, 118.75, 137.5, 175.0];

fn width_class(wdth: f64) -> u16 {
    WIDTH_CLASS_LIMITS.iter().position(|&limit| wdth <= limit).map_or(9, |i| i as u16 + 1)
}

fn build_os2(
    original: &Os2,
    metrics: &[f64],
    user_location: &[(String, f64)],
    linking: Option<StyleLinking>,
) -> WriteOs2 {
    let mut os2: WriteOs2 = original.to_owned_table();
    if let Some(linking) = linking {
        os2.fs_selection = linking.fs_selection(os2.fs_selection);
    }

    for (tag, value) in user_location {
        match tag.as_str() {
            "wght" => os2.us_weight_class = ot_round(*value).clamp(1, 1000) as u16,
            "wdth" => os2.us_width_class = width_class(*value),
            _ => {}
        }
    }

    if let Some(v) = rounded_metric(metrics, Metric::TypoAscender) {
        os2.s_typo_ascender = v;
    }
    if let Some(v) = rounded_metric(metrics, Metric::TypoDescender) {
        os2.s_typo_descender = v;
    }
    if let Some(v) = rounded_metric(metrics, Metric::TypoLineGap) {
        os2.s_typo_line_gap = v;
    }
    if original.sx_height().is_some() {
        os2.sx_height = rounded_metric(metrics, Metric::XHeight);
    }
    if original.s_cap_height().is_some() {
        os2.s_cap_height = rounded_metric(metrics, Metric::CapHeight);
    }

    os2
}

fn build_post(original: &Post, metrics: &[f64]) -> WritePost {
    let mut post: WritePost = original.to_owned_table();
    if let Some(v) = rounded_metric(metrics, Metric::UnderlinePosition) {
        post.underline_position = v.into();
    }
    if let Some(v) = rounded_metric(metrics, Metric::UnderlineThickness) {
        post.underline_thickness = v.into();
    }
    post
}

/// Name IDs rewritten for every instance.
const INSTANCE_NAME_IDS: [u16; 6] = [1, 2, 4, 6, 16, 17];

/// Rewrite family/style name records.
///
/// RIBBI styles keep the family in ID 1 and the style in ID 2; everything
/// else folds the style into ID 1 with "Regular" or "Italic" as subfamily.
/// Each (platform, encoding, language) group carrying a family name gets the
/// full set of instance names; without one, Windows English is used.
fn build_name(original: Option<&read_fonts::tables::name::Name>, names: InstanceNames) -> Name {
    let InstanceNames { family, style, postscript } = names;
    let is_ribbi = names.is_ribbi();
    let legacy_family = if is_ribbi { family.to_string() } else { format!("{family} {style}") };
    let legacy_style = names.legacy_style();
    let postscript = postscript.map(str::to_string).unwrap_or_else(|| {
        format!("{}-{}", family.replace(' ', ""), style.replace(' ', ""))
    });
    let instance_string = |name_id: u16| match name_id {
        1 => legacy_family.clone(),
        2 => legacy_style.to_string(),
        4 => format!("{family} {style}"),
        6 => postscript.clone(),
        16 => family.to_string(),
        _ => style.to_string(),
    };

    let mut groups: Vec<(u16, u16, u16)> = Vec::new();
    let mut records: Vec<NameRecord> = Vec::new();

    if let Some(name) = original {
        for record in name.name_record() {
            let name_id = record.name_id().to_u16();
            let group = (record.platform_id(), record.encoding_id(), record.language_id());
            if INSTANCE_NAME_IDS.contains(&name_id) {
                if name_id == 1 && !groups.contains(&group) {
                    groups.push(group);
                }
                continue;
            }
            let Ok(string) = record.string(name.string_data()) else {
                continue;
            };
            records.push(NameRecord::new(
                group.0,
                group.1,
                group.2,
                NameId::new(name_id),
                string.to_string().into(),
            ));
        }
    }

    if groups.is_empty() {
        groups.push((3, 1, 0x409));
    }
    for &(platform_id, encoding_id, language_id) in &groups {
        for name_id in INSTANCE_NAME_IDS {
            // Typographic names are redundant for RIBBI styles
            if is_ribbi && name_id >= 16 {
                continue;
            }
            records.push(NameRecord::new(
                platform_id,
                encoding_id,
                language_id,
                NameId::new(name_id),
                instance_string(name_id).into(),
            ));
        }
    }

    records.sort_by(|a, b| {
        (a.platform_id, a.encoding_id, a.language_id, a.name_id).cmp(&(
            b.platform_id,
            b.encoding_id,
            b.language_id,
            b.name_id,
        ))
    });

    Name::new(records)
}

//! Master font loading.
//!
//! Masters are read eagerly: every glyph outline, advance and metric is
//! pulled out of the binary up front so later interpolation never touches
//! the font parser again.

use std::{
    fs::read,
    path::{Path, PathBuf},
    time::Instant,
};

use designspace::DesignSpace;
use kurbo::{Rect, Vec2};
use log::{debug, info};
use read_fonts::{
    FontRef, TableProvider,
    tables::glyf::{Anchor, CompositeGlyphFlags, Glyph, Transform},
    types::{GlyphId, GlyphId16},
};
use skrifa::{MetadataProvider, string::StringId};

use crate::error::{Error, Result};

/// Font-wide metrics that are interpolated along with the outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    HheaAscender,
    HheaDescender,
    HheaLineGap,
    TypoAscender,
    TypoDescender,
    TypoLineGap,
    XHeight,
    CapHeight,
    UnderlinePosition,
    UnderlineThickness,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::HheaAscender,
        Metric::HheaDescender,
        Metric::HheaLineGap,
        Metric::TypoAscender,
        Metric::TypoDescender,
        Metric::TypoLineGap,
        Metric::XHeight,
        Metric::CapHeight,
        Metric::UnderlinePosition,
        Metric::UnderlineThickness,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One component of a composite glyph.
#[derive(Debug, Clone)]
pub struct ComponentGeometry {
    pub glyph: GlyphId16,
    pub anchor: Anchor,
    pub transform: Transform,
    /// Flags as stored in the master; layout bits are recomputed on write
    pub flags: CompositeGlyphFlags,
}

impl ComponentGeometry {
    /// Offset of an offset-anchored component; point anchors do not move.
    pub fn offset(&self) -> Vec2 {
        match self.anchor {
            Anchor::Offset { x, y } => Vec2::new(f64::from(x), f64::from(y)),
            Anchor::Point { .. } => Vec2::ZERO,
        }
    }
}

/// Outline data of one glyph in one master.
#[derive(Debug, Clone)]
pub enum GlyphGeometry {
    Empty,
    Simple {
        /// Index of the last point of each contour
        end_pts: Vec<usize>,
        on_curve: Vec<bool>,
        points: Vec<Vec2>,
        instructions: Vec<u8>,
    },
    Composite {
        components: Vec<ComponentGeometry>,
        instructions: Vec<u8>,
        bbox: Rect,
    },
}

impl GlyphGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            GlyphGeometry::Empty => "empty",
            GlyphGeometry::Simple { .. } => "simple",
            GlyphGeometry::Composite { .. } => "composite",
        }
    }
}

/// A fully loaded master font.
#[derive(Debug, Clone)]
pub struct Master {
    pub path: PathBuf,
    /// Raw font bytes; tables that are not interpolated are copied from here
    pub data: Vec<u8>,
    pub glyphs: Vec<GlyphGeometry>,
    pub advances: Vec<u16>,
    /// Indexed by [`Metric::index`]
    pub metrics: Vec<f64>,
    /// Typographic family name, falling back to the legacy family name
    pub family_name: Option<String>,
}

impl Master {
    /// Read and parse a master font file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = read(path).map_err(|e| Error::ReadFont { path: path.to_path_buf(), source: e })?;
        Self::from_bytes(path, data)
    }

    /// Parse a master from bytes already in memory.
    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Result<Self> {
        let path = path.into();
        let parse_error = |e: read_fonts::ReadError| Error::ParseFont {
            path: path.clone(),
            message: e.to_string(),
        };

        let font = FontRef::new(&data).map_err(parse_error)?;
        let glyf = font
            .glyf()
            .map_err(|_| Error::MissingTable { path: path.clone(), table: "glyf" })?;
        let loca = font
            .loca(None)
            .map_err(|_| Error::MissingTable { path: path.clone(), table: "loca" })?;
        let num_glyphs = u32::from(font.maxp().map_err(parse_error)?.num_glyphs());
        let hmtx = font.hmtx().ok();

        let mut glyphs = Vec::with_capacity(num_glyphs as usize);
        let mut advances = Vec::with_capacity(num_glyphs as usize);

        for glyph_id in 0..num_glyphs {
            let gid = GlyphId::new(glyph_id);
            advances.push(hmtx.as_ref().and_then(|h| h.advance(gid)).unwrap_or(0));

            let geometry = match loca.get_glyf(gid, &glyf).map_err(parse_error)? {
                None => GlyphGeometry::Empty,
                Some(Glyph::Simple(simple)) if simple.num_points() == 0 => GlyphGeometry::Empty,
                Some(Glyph::Simple(simple)) => GlyphGeometry::Simple {
                    end_pts: simple
                        .end_pts_of_contours()
                        .iter()
                        .map(|v| v.get() as usize)
                        .collect(),
                    on_curve: simple.points().map(|p| p.on_curve).collect(),
                    points: simple
                        .points()
                        .map(|p| Vec2::new(f64::from(p.x), f64::from(p.y)))
                        .collect(),
                    instructions: simple.instructions().to_vec(),
                },
                Some(Glyph::Composite(composite)) => GlyphGeometry::Composite {
                    components: composite
                        .components()
                        .map(|c| ComponentGeometry {
                            glyph: c.glyph,
                            anchor: c.anchor,
                            transform: c.transform,
                            flags: c.flags,
                        })
                        .collect(),
                    instructions: composite.instructions().unwrap_or_default().to_vec(),
                    bbox: Rect::new(
                        f64::from(composite.x_min()),
                        f64::from(composite.y_min()),
                        f64::from(composite.x_max()),
                        f64::from(composite.y_max()),
                    ),
                },
            };
            glyphs.push(geometry);
        }

        let metrics = read_metrics(&font);
        let family_name = [StringId::TYPOGRAPHIC_FAMILY_NAME, StringId::FAMILY_NAME]
            .into_iter()
            .find_map(|id| {
                font.localized_strings(id)
                    .english_or_first()
                    .map(|s| s.chars().collect::<String>())
            });

        debug!("Loaded master {} ({num_glyphs} glyphs)", path.display());

        Ok(Self { path, data, glyphs, advances, metrics, family_name })
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyphs.len()
    }
}

fn read_metrics(font: &FontRef) -> Vec<f64> {
    let mut metrics = vec![0.0; Metric::ALL.len()];
    let mut set = |metric: Metric, value: i16| metrics[metric.index()] = f64::from(value);

    if let Ok(hhea) = font.hhea() {
        set(Metric::HheaAscender, hhea.ascender().to_i16());
        set(Metric::HheaDescender, hhea.descender().to_i16());
        set(Metric::HheaLineGap, hhea.line_gap().to_i16());
    }
    if let Ok(os2) = font.os2() {
        set(Metric::TypoAscender, os2.s_typo_ascender());
        set(Metric::TypoDescender, os2.s_typo_descender());
        set(Metric::TypoLineGap, os2.s_typo_line_gap());
        set(Metric::XHeight, os2.sx_height().unwrap_or(0));
        set(Metric::CapHeight, os2.s_cap_height().unwrap_or(0));
    }
    if let Ok(post) = font.post() {
        set(Metric::UnderlinePosition, post.underline_position().to_i16());
        set(Metric::UnderlineThickness, post.underline_thickness().to_i16());
    }

    metrics
}

/// Load every source of a designspace, in source order.
pub fn load_masters(designspace: &DesignSpace) -> Result<Vec<Master>> {
    let start = Instant::now();
    let masters = designspace
        .sources
        .iter()
        .map(|source| Master::load(&source.path))
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Loaded {} masters in {:.2}s",
        masters.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(masters)
}

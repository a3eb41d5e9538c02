//! Interpolatable glyph outlines.

use kurbo::{Affine, Rect, Vec2};
use read_fonts::{
    FontData, FontRead, ReadError,
    tables::glyf::{Anchor as ReadAnchor, CompositeGlyphFlags, CurvePoint},
};
use write_fonts::tables::glyf::{
    Anchor, Bbox, Component, CompositeGlyph, Contour, Glyph as WriteGlyph, SimpleGlyph,
};

use crate::{
    error::{Error, Result},
    master::{ComponentGeometry, GlyphGeometry, Master},
    variation_model::{Varied, VariationModel},
};

/// OpenType rounding: half-way cases round towards positive infinity.
pub fn ot_round(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

pub(crate) fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// A glyph whose coordinates vary across the designspace.
#[derive(Debug, Clone)]
pub enum VariedGlyph {
    Empty,
    Simple {
        end_pts: Vec<usize>,
        on_curve: Vec<bool>,
        instructions: Vec<u8>,
        points: Vec<Varied<Vec2>>,
    },
    Composite {
        components: Vec<ComponentGeometry>,
        offsets: Vec<Varied<Vec2>>,
        instructions: Vec<u8>,
        bbox: Rect,
    },
}

impl VariedGlyph {
    /// Check glyph `glyph_id` for compatibility across masters and compute its deltas.
    pub fn build(glyph_id: usize, masters: &[Master], model: &VariationModel) -> Result<Self> {
        let default = &masters[model.default_idx].glyphs[glyph_id];
        check_compatible(glyph_id, default, masters)?;

        let glyph = match default {
            GlyphGeometry::Empty => VariedGlyph::Empty,
            GlyphGeometry::Simple { end_pts, on_curve, points, instructions } => {
                let mut master_points = Vec::with_capacity(masters.len());
                let points = (0..points.len())
                    .map(|point_idx| {
                        master_points.clear();
                        master_points.extend(masters.iter().map(|m| match &m.glyphs[glyph_id] {
                            GlyphGeometry::Simple { points, .. } => points[point_idx],
                            _ => Vec2::ZERO,
                        }));
                        model.compute_deltas(&master_points)
                    })
                    .collect();
                VariedGlyph::Simple {
                    end_pts: end_pts.clone(),
                    on_curve: on_curve.clone(),
                    instructions: instructions.clone(),
                    points,
                }
            }
            GlyphGeometry::Composite { components, instructions, bbox } => {
                let offsets = (0..components.len())
                    .map(|comp_idx| {
                        let master_offsets: Vec<Vec2> = masters
                            .iter()
                            .map(|m| match &m.glyphs[glyph_id] {
                                GlyphGeometry::Composite { components, .. } => {
                                    components[comp_idx].offset()
                                }
                                _ => Vec2::ZERO,
                            })
                            .collect();
                        model.compute_deltas(&master_offsets)
                    })
                    .collect();
                VariedGlyph::Composite {
                    components: components.clone(),
                    offsets,
                    instructions: instructions.clone(),
                    bbox: *bbox,
                }
            }
        };

        Ok(glyph)
    }

    /// Evaluate the glyph at the given region scalars, rounding every coordinate.
    pub fn instantiate(&self, scalars: &[f64]) -> Result<WriteGlyph> {
        let glyph = match self {
            VariedGlyph::Empty => WriteGlyph::Empty,
            VariedGlyph::Simple { points, .. } if points.is_empty() => WriteGlyph::Empty,
            VariedGlyph::Simple { end_pts, on_curve, instructions, points } => {
                let mut contours = Vec::with_capacity(end_pts.len());
                let mut start = 0;
                for &end in end_pts {
                    let contour_points: Vec<CurvePoint> = (start..=end)
                        .map(|i| {
                            let p = points[i].at(scalars);
                            CurvePoint::new(
                                clamp_i16(ot_round(p.x)),
                                clamp_i16(ot_round(p.y)),
                                on_curve[i],
                            )
                        })
                        .collect();
                    contours.push(Contour::from(contour_points));
                    start = end + 1;
                }

                let mut glyph = SimpleGlyph {
                    bbox: Bbox::default(),
                    contours,
                    instructions: instructions.clone(),
                };
                glyph.recompute_bounding_box();
                WriteGlyph::Simple(glyph)
            }
            VariedGlyph::Composite { components, offsets, instructions, bbox } => {
                let mut new_components = components.iter().zip(offsets).map(|(comp, offset)| {
                    let anchor = match comp.anchor {
                        ReadAnchor::Offset { .. } => {
                            let p = offset.at(scalars);
                            Anchor::Offset {
                                x: clamp_i16(ot_round(p.x)),
                                y: clamp_i16(ot_round(p.y)),
                            }
                        }
                        ReadAnchor::Point { base, component } => Anchor::Point { base, component },
                    };
                    Component::new(comp.glyph, anchor, comp.transform, comp.flags)
                });

                let Some(first) = new_components.next() else {
                    return Ok(WriteGlyph::Empty);
                };
                let mut composite = CompositeGlyph::new(first, *bbox);
                for comp in new_components {
                    composite.add_component(comp, Rect::ZERO);
                }
                WriteGlyph::Composite(with_instructions(composite, instructions)?)
            }
        };
        Ok(glyph)
    }
}

/// Attach composite-level hinting instructions.
///
/// write-fonts only keeps these when a composite is parsed, so the glyph is
/// serialized, flagged on its last component and read back.
fn with_instructions(composite: CompositeGlyph, instructions: &[u8]) -> Result<CompositeGlyph> {
    if instructions.is_empty() {
        return Ok(composite);
    }
    let mut data = write_fonts::dump_table(&composite)?;

    // numberOfContours plus the bbox
    let mut offset = 10;
    loop {
        let raw = data.get(offset..offset + 2).ok_or(ReadError::OutOfBounds)?;
        let mut flags = CompositeGlyphFlags::from_bits_truncate(u16::from_be_bytes([raw[0], raw[1]]));
        let len = component_len(flags);
        if !flags.contains(CompositeGlyphFlags::MORE_COMPONENTS) {
            flags.insert(CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS);
            data[offset..offset + 2].copy_from_slice(&flags.bits().to_be_bytes());
            data.truncate(offset + len);
            break;
        }
        offset += len;
    }

    let count = u16::try_from(instructions.len()).map_err(|_| ReadError::OutOfBounds)?;
    data.extend_from_slice(&count.to_be_bytes());
    data.extend_from_slice(instructions);
    Ok(CompositeGlyph::read(FontData::new(&data))?)
}

/// Encoded size of one component record with the given flags.
fn component_len(flags: CompositeGlyphFlags) -> usize {
    let args = if flags.contains(CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS) { 4 } else { 2 };
    let transform = if flags.contains(CompositeGlyphFlags::WE_HAVE_A_SCALE) {
        2
    } else if flags.contains(CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE) {
        4
    } else if flags.contains(CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO) {
        8
    } else {
        0
    };
    4 + args + transform
}

fn check_compatible(glyph_id: usize, default: &GlyphGeometry, masters: &[Master]) -> Result<()> {
    let glyph_id_u32 = glyph_id as u32;

    for master in masters {
        let other = &master.glyphs[glyph_id];
        match (default, other) {
            (GlyphGeometry::Empty, GlyphGeometry::Empty) => {}
            (
                GlyphGeometry::Simple { end_pts, points, .. },
                GlyphGeometry::Simple { end_pts: other_ends, points: other_points, .. },
            ) => {
                if points.len() != other_points.len() {
                    return Err(Error::PointCountMismatch {
                        path: master.path.clone(),
                        glyph_id: glyph_id_u32,
                        expected: points.len(),
                        actual: other_points.len(),
                    });
                }
                if end_pts.len() != other_ends.len() {
                    return Err(Error::ContourCountMismatch {
                        path: master.path.clone(),
                        glyph_id: glyph_id_u32,
                        expected: end_pts.len(),
                        actual: other_ends.len(),
                    });
                }
            }
            (
                GlyphGeometry::Composite { components, .. },
                GlyphGeometry::Composite { components: other_components, .. },
            ) => {
                if components.len() != other_components.len() {
                    return Err(Error::ComponentCountMismatch {
                        path: master.path.clone(),
                        glyph_id: glyph_id_u32,
                        expected: components.len(),
                        actual: other_components.len(),
                    });
                }
            }
            _ => {
                return Err(Error::GlyphKindMismatch {
                    path: master.path.clone(),
                    glyph_id: glyph_id_u32,
                    expected: default.kind(),
                    actual: other.kind(),
                });
            }
        }
    }

    Ok(())
}

/// Nesting deeper than this is treated as a component cycle.
const MAX_COMPONENT_DEPTH: usize = 64;

/// Replace every composite's bbox with the union of its transformed components.
pub fn resolve_composite_bboxes(glyphs: &mut [WriteGlyph]) {
    let bboxes: Vec<Bbox> = {
        let mut resolver = BboxResolver { glyphs, resolved: vec![None; glyphs.len()] };
        (0..glyphs.len()).map(|glyph_id| resolver.bbox(glyph_id, 0)).collect()
    };
    for (glyph, bbox) in glyphs.iter_mut().zip(bboxes) {
        if let WriteGlyph::Composite(composite) = glyph {
            composite.bbox = bbox;
        }
    }
}

/// Memoized depth-first bbox lookup over a glyph set.
struct BboxResolver<'a> {
    glyphs: &'a [WriteGlyph],
    resolved: Vec<Option<Bbox>>,
}

impl BboxResolver<'_> {
    fn bbox(&mut self, glyph_id: usize, depth: usize) -> Bbox {
        if let Some(Some(bbox)) = self.resolved.get(glyph_id) {
            return *bbox;
        }
        let glyphs = self.glyphs;
        let bbox = match glyphs.get(glyph_id) {
            Some(WriteGlyph::Simple(simple)) => simple.bbox,
            Some(WriteGlyph::Composite(composite)) if depth < MAX_COMPONENT_DEPTH => composite
                .components()
                .iter()
                .filter_map(|component| {
                    let inner = self.bbox(component.glyph.to_u32() as usize, depth + 1);
                    (inner != Bbox::default()).then(|| place_component(inner, component))
                })
                .reduce(Bbox::union)
                .unwrap_or_default(),
            _ => Bbox::default(),
        };
        if let Some(slot) = self.resolved.get_mut(glyph_id) {
            *slot = Some(bbox);
        }
        bbox
    }
}

/// Bbox of a component's glyph after its transform and offset.
fn place_component(bbox: Bbox, component: &Component) -> Bbox {
    let (dx, dy) = match component.anchor {
        Anchor::Offset { x, y } => (f64::from(x), f64::from(y)),
        Anchor::Point { .. } => (0.0, 0.0),
    };
    let t = &component.transform;
    let affine = Affine::new([
        f64::from(t.xx.to_f32()),
        f64::from(t.yx.to_f32()),
        f64::from(t.xy.to_f32()),
        f64::from(t.yy.to_f32()),
        dx,
        dy,
    ]);
    let rect = affine.transform_rect_bbox(Rect::new(
        f64::from(bbox.x_min),
        f64::from(bbox.y_min),
        f64::from(bbox.x_max),
        f64::from(bbox.y_max),
    ));
    let round = |v: f64| clamp_i16(ot_round(v));
    Bbox { x_min: round(rect.x0), y_min: round(rect.y0), x_max: round(rect.x1), y_max: round(rect.y1) }
}

/// Left side bearing of a rebuilt glyph (its xMin).
pub fn glyph_x_min(glyph: &WriteGlyph) -> Option<i16> {
    match glyph {
        WriteGlyph::Simple(s) => Some(s.bbox.x_min),
        WriteGlyph::Composite(c) => Some(c.bbox.x_min),
        WriteGlyph::Empty => None,
    }
}

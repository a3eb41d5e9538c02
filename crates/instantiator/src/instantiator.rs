use std::time::Instant;

use designspace::{Axis, DesignSpace, Instance};
use log::{debug, info};

use crate::{
    error::{Error, Result},
    font_writer::{InstanceNames, InstanceOutlines, assemble_font},
    master::{Master, load_masters},
    outline::{VariedGlyph, ot_round},
    variation_model::{Varied, VariationModel},
};

/// Precomputed interpolation state for a designspace.
///
/// Holds only owned data, so cloning produces a fully independent copy and
/// the value can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Instantiator {
    axes: Vec<Axis>,
    model: VariationModel,
    glyphs: Vec<VariedGlyph>,
    advances: Vec<Varied<f64>>,
    metrics: Vec<Varied<f64>>,
    default_data: Vec<u8>,
    default_family_name: Option<String>,
}

/// A generated static instance, ready to be written to disk.
#[derive(Debug, Clone)]
pub struct GeneratedInstance {
    pub instance_name: String,
    pub family_name: String,
    pub style_name: String,
    pub data: Vec<u8>,
}

impl GeneratedInstance {
    /// `{family}-{style}` with spaces removed.
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.family_name, self.style_name).replace(' ', "")
    }

    pub fn file_name(&self) -> String {
        format!("{}.ttf", self.file_stem())
    }
}

impl Instantiator {
    /// Validate the designspace, load its masters and precompute all deltas.
    pub fn from_designspace(designspace: &DesignSpace) -> Result<Self> {
        designspace.validate()?;
        let masters = load_masters(designspace)?;
        Self::from_masters(designspace, masters)
    }

    /// Build from masters already loaded in designspace source order.
    pub fn from_masters(designspace: &DesignSpace, mut masters: Vec<Master>) -> Result<Self> {
        designspace.validate()?;
        if masters.len() != designspace.sources.len() {
            return Err(designspace::Error::Invalid(format!(
                "Expected {} masters, got {}",
                designspace.sources.len(),
                masters.len()
            ))
            .into());
        }
        let start = Instant::now();

        let locations = designspace.master_locations();
        check_distinct_locations(&locations, &masters)?;

        let default_idx = designspace
            .default_source_index()
            .ok_or(designspace::Error::NoDefaultSource)?;
        let model = VariationModel::new(&locations, default_idx);

        let default = &masters[default_idx];
        let num_glyphs = default.num_glyphs();
        for master in &masters {
            if master.num_glyphs() != num_glyphs {
                return Err(Error::GlyphCountMismatch {
                    path: master.path.clone(),
                    expected: num_glyphs,
                    actual: master.num_glyphs(),
                });
            }
        }

        let glyphs = (0..num_glyphs)
            .map(|glyph_id| VariedGlyph::build(glyph_id, &masters, &model))
            .collect::<Result<Vec<_>>>()?;

        let advances = (0..num_glyphs)
            .map(|glyph_id| {
                let values: Vec<f64> =
                    masters.iter().map(|m| f64::from(m.advances[glyph_id])).collect();
                model.compute_deltas(&values)
            })
            .collect();

        let metrics = (0..default.metrics.len())
            .map(|metric_idx| {
                let values: Vec<f64> = masters.iter().map(|m| m.metrics[metric_idx]).collect();
                model.compute_deltas(&values)
            })
            .collect();

        let default_family_name = designspace.sources[default_idx]
            .family_name
            .clone()
            .or_else(|| default.family_name.clone());

        info!(
            "Built instantiator for {num_glyphs} glyphs across {} masters in {:.2}s",
            masters.len(),
            start.elapsed().as_secs_f64()
        );

        let default_data = std::mem::take(&mut masters[default_idx].data);

        Ok(Self {
            axes: designspace.axes.clone(),
            model,
            glyphs,
            advances,
            metrics,
            default_data,
            default_family_name,
        })
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    /// Interpolate one instance into a static TrueType font.
    pub fn generate_instance(&self, instance: &Instance) -> Result<GeneratedInstance> {
        let start = Instant::now();

        let family_name = instance
            .family_name
            .clone()
            .or_else(|| self.default_family_name.clone())
            .ok_or_else(|| Error::MissingFamilyName(instance.name.clone()))?;
        let style_name = instance.style_name.clone().unwrap_or_else(|| instance.name.clone());

        let normalized: Vec<f64> = self
            .axes
            .iter()
            .map(|axis| axis.normalize(axis.value_in(&instance.location)))
            .collect();
        let scalars = self.model.scalars_at(&normalized);

        let glyphs = self
            .glyphs
            .iter()
            .map(|glyph| glyph.instantiate(&scalars))
            .collect::<Result<Vec<_>>>()?;
        let advances = self
            .advances
            .iter()
            .map(|advance| ot_round(advance.at(&scalars)).clamp(0, i32::from(u16::MAX)) as u16)
            .collect();
        let metrics = self.metrics.iter().map(|metric| metric.at(&scalars)).collect();

        let user_location: Vec<(String, f64)> = self
            .axes
            .iter()
            .map(|axis| {
                let user = axis.map_backward(axis.value_in(&instance.location));
                (axis.tag.clone(), user)
            })
            .collect();

        let names = InstanceNames {
            family: &family_name,
            style: &style_name,
            postscript: instance.postscript_name.as_deref(),
        };
        let data = assemble_font(
            &self.default_data,
            InstanceOutlines { glyphs, advances, metrics },
            Some(names),
            &user_location,
        )?;

        debug!(
            "Interpolated {} at {normalized:?} in {:.3}s",
            instance.name,
            start.elapsed().as_secs_f64()
        );

        Ok(GeneratedInstance { instance_name: instance.name.clone(), family_name, style_name, data })
    }
}

fn check_distinct_locations(locations: &[Vec<f64>], masters: &[Master]) -> Result<()> {
    for (i, a) in locations.iter().enumerate() {
        for (j, b) in locations.iter().enumerate().skip(i + 1) {
            if a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9) {
                return Err(Error::DuplicateLocation {
                    first: masters[i].path.clone(),
                    second: masters[j].path.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(family: &str, style: &str) -> GeneratedInstance {
        GeneratedInstance {
            instance_name: style.to_string(),
            family_name: family.to_string(),
            style_name: style.to_string(),
            data: Vec::new(),
        }
    }

    #[test]
    fn file_stem_strips_spaces() {
        let instance = generated("My Family", "Semi Bold Italic");
        assert_eq!(instance.file_stem(), "MyFamily-SemiBoldItalic");
        assert_eq!(instance.file_name(), "MyFamily-SemiBoldItalic.ttf");
    }

    #[test]
    fn single_master_round_trips() {
        let master =
            Master::from_bytes("Vazirmatn.ttf", font_test_data::VAZIRMATN_VAR.to_vec()).unwrap();
        let designspace = DesignSpace::new(
            vec![Axis::new("wght", "Weight", 100.0, 400.0, 900.0)],
            vec![designspace::Source::new("Vazirmatn.ttf", [("Weight", 400.0)])],
        );
        let instantiator = Instantiator::from_masters(&designspace, vec![master]).unwrap();

        let instance = Instance::new("Regular", [("Weight", 400.0)]).with_family_name("Test Sans");
        let generated = instantiator.generate_instance(&instance).unwrap();

        assert_eq!(generated.file_stem(), "TestSans-Regular");
        assert!(read_fonts::FontRef::new(&generated.data).is_ok());
    }

    #[test]
    fn rejects_duplicate_locations() {
        let load = || Master::from_bytes("a.ttf", font_test_data::VAZIRMATN_VAR.to_vec()).unwrap();
        let designspace = DesignSpace::new(
            vec![Axis::new("wght", "Weight", 100.0, 400.0, 900.0)],
            vec![
                designspace::Source::new("a.ttf", [("Weight", 400.0)]),
                designspace::Source::new("b.ttf", [("Weight", 400.0)]),
            ],
        );

        let err = Instantiator::from_masters(&designspace, vec![load(), load()]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLocation { .. }));
    }

    #[test]
    fn instantiator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Instantiator>();
    }
}

//! Designspace model for instance generation.
//!
//! Mirrors the concepts from fontTools designspaceLib. Axis ranges are in
//! user space; source and instance locations are in design space.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;

use crate::{
    EXPORT_LIB_KEY,
    error::{Error, Result},
    lib_dict::InstanceLib,
};

/// A designspace location: axis name to design-space value.
pub type Location = IndexMap<String, f64>;

/// Tolerance when comparing locations.
const LOCATION_EPSILON: f64 = 0.001;

/// A variation axis in the designspace.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Four-character axis tag (e.g., "wght", "wdth")
    pub tag: String,
    /// Human-readable axis name, used as the key in locations
    pub name: String,
    /// Minimum user-space value
    pub minimum: f64,
    /// Default user-space value
    pub default: f64,
    /// Maximum user-space value
    pub maximum: f64,
    /// User→design mapping as (input, output) pairs, sorted by input
    pub map: Vec<(f64, f64)>,
}

impl Axis {
    /// Create a new axis with an identity user→design mapping.
    pub fn new(tag: &str, name: &str, minimum: f64, default: f64, maximum: f64) -> Self {
        Self {
            tag: tag.to_string(),
            name: name.to_string(),
            minimum,
            default,
            maximum,
            map: Vec::new(),
        }
    }

    /// Set the user→design mapping.
    pub fn with_map(mut self, mut map: Vec<(f64, f64)>) -> Self {
        map.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.map = map;
        self
    }

    /// Map a user-space value to design space.
    ///
    /// Piecewise-linear through `map`, clamped to the first and last pair.
    pub fn map_forward(&self, user: f64) -> f64 {
        let (Some(&first), Some(&last)) = (self.map.first(), self.map.last()) else {
            return user;
        };
        if user <= first.0 {
            return first.1;
        }
        if user >= last.0 {
            return last.1;
        }
        for pair in self.map.windows(2) {
            let ((in_a, out_a), (in_b, out_b)) = (pair[0], pair[1]);
            if user >= in_a && user <= in_b {
                if in_b == in_a {
                    return out_a;
                }
                return out_a + (user - in_a) / (in_b - in_a) * (out_b - out_a);
            }
        }
        last.1
    }

    /// Map a design-space value back to user space.
    pub fn map_backward(&self, design: f64) -> f64 {
        if self.map.is_empty() {
            return design;
        }
        let mut inverted: Vec<(f64, f64)> = self.map.iter().map(|&(i, o)| (o, i)).collect();
        inverted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let inverse = Axis { map: inverted, ..self.clone() };
        inverse.map_forward(design)
    }

    pub fn design_minimum(&self) -> f64 {
        self.map_forward(self.minimum)
    }

    pub fn design_default(&self) -> f64 {
        self.map_forward(self.default)
    }

    pub fn design_maximum(&self) -> f64 {
        self.map_forward(self.maximum)
    }

    /// Design-space value of this axis at `location`, or the axis default.
    pub fn value_in(&self, location: &Location) -> f64 {
        location.get(&self.name).copied().unwrap_or_else(|| self.design_default())
    }

    /// Normalize a design-space value to the range [-1, 1].
    ///
    /// Values below the default normalize to [-1, 0].
    /// Values above the default normalize to [0, 1].
    pub fn normalize(&self, value: f64) -> f64 {
        let (minimum, default, maximum) =
            (self.design_minimum(), self.design_default(), self.design_maximum());
        let value = value.clamp(minimum.min(default), maximum.max(default));
        if value < default {
            if default == minimum {
                0.0
            } else {
                -((default - value) / (default - minimum))
            }
        } else if value > default {
            if default == maximum {
                0.0
            } else {
                (value - default) / (maximum - default)
            }
        } else {
            0.0
        }
    }
}

/// A source (master) font in the designspace.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Optional source name
    pub name: Option<String>,
    /// Path to the master font, resolved against the designspace directory
    pub path: PathBuf,
    /// Design-space location
    pub location: Location,
    /// Optional family name
    pub family_name: Option<String>,
    /// Optional style name
    pub style_name: Option<String>,
}

impl Source {
    /// Create a new source with the given path and location.
    pub fn new<'a>(
        path: impl Into<PathBuf>,
        location: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        Self {
            name: None,
            path: path.into(),
            location: location.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            family_name: None,
            style_name: None,
        }
    }

    /// Set the family name.
    pub fn with_family_name(mut self, name: &str) -> Self {
        self.family_name = Some(name.to_string());
        self
    }
}

/// A named instance in the designspace.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Instance name (e.g., "Bold", "Light Italic")
    pub name: String,
    /// Design-space location
    pub location: Location,
    pub family_name: Option<String>,
    pub style_name: Option<String>,
    pub postscript_name: Option<String>,
    /// Output filename suggested by the document (informational)
    pub filename: Option<String>,
    /// Instance lib dictionary
    pub lib: InstanceLib,
}

impl Instance {
    /// Create a new instance with the given name and location.
    pub fn new<'a>(name: &str, location: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            name: name.to_string(),
            location: location.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            family_name: None,
            style_name: None,
            postscript_name: None,
            filename: None,
            lib: InstanceLib::new(),
        }
    }

    pub fn with_family_name(mut self, name: &str) -> Self {
        self.family_name = Some(name.to_string());
        self
    }

    pub fn with_style_name(mut self, name: &str) -> Self {
        self.style_name = Some(name.to_string());
        self
    }

    pub fn with_postscript_name(mut self, name: &str) -> Self {
        self.postscript_name = Some(name.to_string());
        self
    }

    pub fn with_lib(mut self, lib: InstanceLib) -> Self {
        self.lib = lib;
        self
    }

    /// Whether the instance should be exported.
    ///
    /// Only an explicit false-y `com.schriftgestaltung.export` excludes it.
    pub fn is_exportable(&self) -> bool {
        self.lib.get(EXPORT_LIB_KEY).is_none_or(|value| value.is_truthy())
    }
}

/// A complete designspace document.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignSpace {
    /// File the document was loaded from, if any
    pub path: Option<PathBuf>,
    /// Variation axes
    pub axes: Vec<Axis>,
    /// Source (master) fonts
    pub sources: Vec<Source>,
    /// Named instances
    pub instances: Vec<Instance>,
}

impl DesignSpace {
    /// Create a new designspace with the given axes and sources.
    pub fn new(axes: Vec<Axis>, sources: Vec<Source>) -> Self {
        Self { path: None, axes, sources, instances: Vec::new() }
    }

    /// Add named instances to the designspace.
    pub fn with_instances(mut self, instances: Vec<Instance>) -> Self {
        self.instances = instances;
        self
    }

    /// Read and parse a `.designspace` file.
    ///
    /// Source filenames are resolved relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .map_err(|e| Error::Read { path: path.to_path_buf(), source: e })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut designspace = Self::parse(&xml, base_dir)?;
        designspace.path = Some(path.to_path_buf());
        debug!(
            "Loaded {}: {} axes, {} sources, {} instances",
            path.display(),
            designspace.axes.len(),
            designspace.sources.len(),
            designspace.instances.len()
        );
        Ok(designspace)
    }

    /// Drop instances flagged as non-exportable.
    ///
    /// Returns the number of instances removed.
    pub fn retain_exportable(&mut self) -> usize {
        let before = self.instances.len();
        self.instances.retain(Instance::is_exportable);
        before - self.instances.len()
    }

    pub fn axis_by_name(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    /// Normalized coordinates for a location, one per axis in axis order.
    pub fn normalized_location(&self, location: &Location) -> Vec<f64> {
        self.axes
            .iter()
            .map(|axis| axis.normalize(axis.value_in(location)))
            .collect()
    }

    /// Find the index of the default source (at the default on every axis).
    pub fn default_source_index(&self) -> Option<usize> {
        self.sources.iter().position(|source| {
            self.axes.iter().all(|axis| {
                (axis.value_in(&source.location) - axis.design_default()).abs()
                    < LOCATION_EPSILON
            })
        })
    }

    /// Find the default source.
    pub fn default_source(&self) -> Option<&Source> {
        self.default_source_index().map(|idx| &self.sources[idx])
    }

    /// Normalized locations of all sources, in source order.
    pub fn master_locations(&self) -> Vec<Vec<f64>> {
        self.sources
            .iter()
            .map(|source| self.normalized_location(&source.location))
            .collect()
    }

    /// Validate the designspace.
    pub fn validate(&self) -> Result<()> {
        if self.axes.is_empty() {
            return Err(Error::Invalid("Designspace must have at least one axis".to_string()));
        }
        if self.sources.is_empty() {
            return Err(Error::Invalid("Designspace must have at least one source".to_string()));
        }

        for axis in &self.axes {
            if axis.tag.is_empty() || axis.tag.len() > 4 {
                return Err(Error::Invalid(format!(
                    "Axis tag '{}' must be 1 to 4 characters",
                    axis.tag
                )));
            }
            if !(axis.minimum <= axis.default && axis.default <= axis.maximum) {
                return Err(Error::Invalid(format!(
                    "Axis '{}' must satisfy minimum <= default <= maximum",
                    axis.name
                )));
            }
        }

        let locations = self
            .sources
            .iter()
            .map(|s| &s.location)
            .chain(self.instances.iter().map(|i| &i.location));
        for location in locations {
            if let Some(unknown) = location.keys().find(|name| self.axis_by_name(name).is_none()) {
                return Err(Error::UnknownAxis(unknown.clone()));
            }
        }

        if self.default_source_index().is_none() {
            return Err(Error::NoDefaultSource);
        }

        Ok(())
    }
}

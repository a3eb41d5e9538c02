//! Variation model for interpolating master values.
//!
//! Implements the core algorithm for computing how master contributions
//! are weighted at different locations in the design space.

use std::{
    cmp::Ordering,
    iter::once,
    ops::{Add, Mul, Sub},
};

use designspace::DesignSpace;

/// Tolerance when matching axis positions.
const POSITION_EPSILON: f64 = 0.0001;

fn same_position(a: f64, b: f64) -> bool {
    (a - b).abs() < POSITION_EPSILON
}

/// A region in the variation space, defined by (start, peak, end) tuples.
///
/// Each tuple defines the contribution curve for one axis.
/// The contribution is 0 at start, 1 at peak, and 0 at end.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// (min, peak, max) for each axis in normalized coordinates
    pub axes: Vec<(f64, f64, f64)>,
}

impl Region {
    /// Full-width tent for a master peak.
    ///
    /// On each axis the master varies along, the tent spans from the origin
    /// to the farthest master position on the same side.
    pub fn from_peak(peak: &[f64], min: &[f64], max: &[f64]) -> Self {
        let axes = peak
            .iter()
            .enumerate()
            .map(|(axis_idx, &p)| {
                if p > 0.0 {
                    (0.0, p, max[axis_idx])
                } else if p < 0.0 {
                    (min[axis_idx], p, 0.0)
                } else {
                    (0.0, 0.0, 0.0)
                }
            })
            .collect();
        Self { axes }
    }

    fn peak(&self) -> impl Iterator<Item = f64> + '_ {
        self.axes.iter().map(|&(_, peak, _)| peak)
    }

    fn same_axes(&self, other: &Region) -> bool {
        self.peak().zip(other.peak()).all(|(a, b)| (a == 0.0) == (b == 0.0))
    }

    /// Split this tent at an earlier master's peak when that peak lies in the box.
    ///
    /// Only masters varying along exactly the same axes take part. The box is
    /// cut on the axes where the earlier peak removes the largest share of
    /// the range.
    fn narrow_against(&mut self, earlier: &Region) {
        if !self.same_axes(earlier) {
            return;
        }
        let inside = self.axes.iter().zip(earlier.peak()).all(|(&(lower, peak, upper), value)| {
            peak == 0.0 || same_position(value, peak) || (lower < value && value < upper)
        });
        if !inside {
            return;
        }

        let mut best_ratio = -1.0;
        let mut best: Vec<(usize, (f64, f64, f64))> = Vec::new();
        for (axis_idx, (&(lower, peak, upper), value)) in
            self.axes.iter().zip(earlier.peak()).enumerate()
        {
            if peak == 0.0 || same_position(value, peak) {
                continue;
            }
            let (split, ratio) = if value < peak {
                ((value, peak, upper), (value - peak) / (lower - peak))
            } else {
                ((lower, peak, value), (value - peak) / (upper - peak))
            };
            if ratio > best_ratio {
                best.clear();
                best_ratio = ratio;
            }
            if ratio == best_ratio {
                best.push((axis_idx, split));
            }
        }

        for (axis_idx, split) in best {
            self.axes[axis_idx] = split;
        }
    }

    /// Compute the scalar contribution of this region at a given location.
    ///
    /// Returns a value between 0 and 1.
    pub fn scalar_at(&self, location: &[f64]) -> f64 {
        let mut scalar = 1.0;

        for (i, &(min, peak, max)) in self.axes.iter().enumerate() {
            let loc = location.get(i).copied().unwrap_or(0.0);

            // Axes the region ignores, and malformed tents, do not restrict it
            if peak == 0.0 || loc == peak || min > peak || peak > max || (min < 0.0 && max > 0.0) {
                continue;
            }

            if loc <= min || loc >= max {
                return 0.0;
            }

            if loc < peak {
                scalar *= (loc - min) / (peak - min);
            } else {
                scalar *= (max - loc) / (max - peak);
            }
        }

        scalar
    }
}

/// A master-varying value: the default plus one delta per model region.
#[derive(Debug, Clone, PartialEq)]
pub struct Varied<T> {
    pub default: T,
    pub deltas: Vec<T>,
}

impl<T> Varied<T>
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
{
    /// Evaluate at a location given the region scalars from [`VariationModel::scalars_at`].
    pub fn at(&self, scalars: &[f64]) -> T {
        self.deltas
            .iter()
            .zip(scalars)
            .filter(|(_, scalar)| **scalar != 0.0)
            .fold(self.default, |acc, (&delta, &scalar)| acc + delta * scalar)
    }
}

/// Variation model for computing deltas from master values.
#[derive(Debug, Clone)]
pub struct VariationModel {
    /// Regions for each master (excluding default)
    pub regions: Vec<Region>,
    /// Index of the default master in the original source list
    pub default_idx: usize,
    /// Order in which to process masters for delta computation
    pub master_order: Vec<usize>,
    /// Precomputed scalars: region_scalars[i][j] = scalar of region j at region i's peak
    /// Only lower triangle is used (j < i)
    region_scalars: Vec<Vec<f64>>,
}

impl VariationModel {
    /// Create a variation model from normalized master locations.
    pub fn new(locations: &[Vec<f64>], default_idx: usize) -> Self {
        let axis_count = locations.iter().map(Vec::len).max().unwrap_or(0);
        let position = |loc: &[f64], axis: usize| loc.get(axis).copied().unwrap_or(0.0);

        let mut order: Vec<usize> = (0..locations.len()).filter(|&i| i != default_idx).collect();
        let on_axis = on_axis_positions(locations, axis_count);
        order.sort_by(|&a, &b| master_sort_key(&locations[a], &locations[b], &on_axis));

        let (mut min, mut max) = (vec![0.0; axis_count], vec![0.0; axis_count]);
        for loc in locations {
            for axis in 0..axis_count {
                min[axis] = f64::min(min[axis], position(loc, axis));
                max[axis] = f64::max(max[axis], position(loc, axis));
            }
        }

        let mut regions_with_idx: Vec<(usize, Region)> = Vec::with_capacity(order.len());
        for &idx in &order {
            let peak: Vec<f64> = (0..axis_count).map(|axis| position(&locations[idx], axis)).collect();
            let mut region = Region::from_peak(&peak, &min, &max);
            for (_, earlier) in &regions_with_idx {
                region.narrow_against(earlier);
            }
            regions_with_idx.push((idx, region));
        }

        let master_order: Vec<usize> = once(default_idx)
            .chain(regions_with_idx.iter().map(|(idx, _)| *idx))
            .collect();

        let regions: Vec<Region> = regions_with_idx.into_iter().map(|(_, r)| r).collect();

        let region_scalars: Vec<Vec<f64>> = regions
            .iter()
            .enumerate()
            .map(|(i, region_i)| {
                let peak_i: Vec<f64> = region_i.peak().collect();
                regions[..i]
                    .iter()
                    .map(|region_j| region_j.scalar_at(&peak_i))
                    .collect()
            })
            .collect();

        Self { regions, default_idx, master_order, region_scalars }
    }

    /// Create a variation model from a designspace's sources.
    pub fn from_designspace(designspace: &DesignSpace) -> Option<Self> {
        let default_idx = designspace.default_source_index()?;
        Some(Self::new(&designspace.master_locations(), default_idx))
    }

    /// Compute deltas from master values.
    ///
    /// `master_values` is indexed by original source index. The returned
    /// deltas correspond to `self.regions`.
    pub fn compute_deltas<T>(&self, master_values: &[T]) -> Varied<T>
    where
        T: Copy + Sub<Output = T> + Mul<f64, Output = T>,
    {
        let default = master_values[self.default_idx];
        let mut deltas: Vec<T> = Vec::with_capacity(self.regions.len());

        for (region_idx, scalars) in self.region_scalars.iter().enumerate() {
            let master_value = master_values[self.master_order[region_idx + 1]];
            let mut delta = master_value - default;

            for (prev_idx, &scalar) in scalars.iter().enumerate() {
                if scalar != 0.0 {
                    delta = delta - deltas[prev_idx] * scalar;
                }
            }

            deltas.push(delta);
        }

        Varied { default, deltas }
    }

    /// Scalars of every region at a normalized location.
    pub fn scalars_at(&self, location: &[f64]) -> Vec<f64> {
        self.regions.iter().map(|region| region.scalar_at(location)).collect()
    }

    /// Interpolate master values directly at a location.
    pub fn interpolate(&self, master_values: &[f64], location: &[f64]) -> f64 {
        self.compute_deltas(master_values).at(&self.scalars_at(location))
    }
}

/// Positions of masters that vary along a single axis, plus the origin.
fn on_axis_positions(locations: &[Vec<f64>], axis_count: usize) -> Vec<Vec<f64>> {
    let mut on_axis = vec![vec![0.0]; axis_count];
    for loc in locations {
        let mut active = loc.iter().enumerate().filter(|(_, v)| **v != 0.0);
        if let (Some((axis, &value)), None) = (active.next(), active.next()) {
            on_axis[axis].push(value);
        }
    }
    on_axis
}

/// Masters touching fewer axes come first, then those sitting on positions
/// of single-axis masters, then by axis order, direction and distance.
fn master_sort_key(a: &[f64], b: &[f64], on_axis: &[Vec<f64>]) -> Ordering {
    let active = |loc: &[f64]| -> Vec<(usize, f64)> {
        loc.iter().copied().enumerate().filter(|(_, v)| *v != 0.0).collect()
    };
    let on_point = |axes: &[(usize, f64)]| {
        axes.iter()
            .filter(|(axis, v)| on_axis[*axis].iter().any(|p| same_position(*p, *v)))
            .count()
    };
    let (a, b) = (active(a), active(b));

    a.len()
        .cmp(&b.len())
        .then_with(|| on_point(&b[..]).cmp(&on_point(&a[..])))
        .then_with(|| a.iter().map(|(axis, _)| axis).cmp(b.iter().map(|(axis, _)| axis)))
        .then_with(|| {
            a.iter()
                .map(|(_, v)| v.signum() as i8)
                .cmp(b.iter().map(|(_, v)| v.signum() as i8))
        })
        .then_with(|| {
            a.iter()
                .map(|(_, v)| v.abs())
                .zip(b.iter().map(|(_, v)| v.abs()))
                .map(|(x, y)| x.total_cmp(&y))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
}

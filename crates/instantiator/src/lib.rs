//! # Instantiator
//!
//! Generate static TrueType instances by interpolating compatible masters.
//!
//! Building an [`Instantiator`] is the expensive step: every master is read,
//! checked for compatibility and turned into per-point deltas. After that,
//! each instance is a cheap evaluation of those deltas plus table assembly.
//!
//! ## Example
//!
//! ```no_run
//! use designspace::DesignSpace;
//! use instantiator::Instantiator;
//!
//! let designspace = DesignSpace::load("MyFamily.designspace").unwrap();
//! let instantiator = Instantiator::from_designspace(&designspace).unwrap();
//! for instance in &designspace.instances {
//!     let generated = instantiator.generate_instance(instance).unwrap();
//!     std::fs::write(generated.file_name(), &generated.data).unwrap();
//! }
//! ```

mod error;
mod font_writer;
mod instantiator;
mod master;
mod outline;
mod variation_model;

pub use error::{Error, Result};
pub use font_writer::{InstanceNames, InstanceOutlines, assemble_font};
pub use instantiator::{GeneratedInstance, Instantiator};
pub use master::{ComponentGeometry, GlyphGeometry, Master, Metric, load_masters};
pub use outline::{VariedGlyph, ot_round};
pub use variation_model::{Region, Varied, VariationModel};

//! # Designspace
//!
//! Read `.designspace` documents and pick out the instances worth exporting.
//!
//! Mirrors the parts of fontTools designspaceLib needed to drive instance
//! generation: axes (with user→design maps), sources, instances and the
//! instance `lib` dictionary.
//!
//! ## Example
//!
//! ```no_run
//! use designspace::DesignSpace;
//!
//! let mut designspace = DesignSpace::load("MyFamily.designspace").unwrap();
//! let dropped = designspace.retain_exportable();
//! println!("{} instances to export, {dropped} skipped", designspace.instances.len());
//! ```

mod error;
mod lib_dict;
mod model;
mod parse;

pub use error::{Error, Result};
pub use lib_dict::{InstanceLib, LibValue};
pub use model::{Axis, DesignSpace, Instance, Location, Source};

/// Instance lib key marking an instance as (non-)exportable.
///
/// Written by Glyphs; a missing key means the instance is exported.
pub const EXPORT_LIB_KEY: &str = "com.schriftgestaltung.export";

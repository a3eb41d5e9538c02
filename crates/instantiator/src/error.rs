//! Error types for instance generation.

use std::path::PathBuf;

/// Result type for instantiator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building the instantiator or generating instances.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The designspace failed validation.
    #[error(transparent)]
    Designspace(#[from] designspace::Error),

    /// Failed to read a master font file.
    #[error("Failed to read font file '{path}': {source}")]
    ReadFont {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse a master font.
    #[error("Failed to parse font '{path}': {message}")]
    ParseFont { path: PathBuf, message: String },

    /// Master font is missing a required table.
    #[error("Font '{path}' is missing required table '{table}'")]
    MissingTable { path: PathBuf, table: &'static str },

    /// Two sources share the same location.
    #[error("Sources '{first}' and '{second}' share the same location")]
    DuplicateLocation { first: PathBuf, second: PathBuf },

    /// Glyph count mismatch between masters.
    #[error("Glyph count mismatch: master '{path}' has {actual} glyphs, expected {expected}")]
    GlyphCountMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// A glyph is simple in one master and composite (or empty) in another.
    #[error("Glyph {glyph_id} in master '{path}' is {actual}, expected {expected}")]
    GlyphKindMismatch {
        path: PathBuf,
        glyph_id: u32,
        expected: &'static str,
        actual: &'static str,
    },

    /// Contour count mismatch for a glyph between masters.
    #[error("Contour count mismatch for glyph {glyph_id}: master '{path}' has {actual} contours, expected {expected}")]
    ContourCountMismatch {
        path: PathBuf,
        glyph_id: u32,
        expected: usize,
        actual: usize,
    },

    /// Point count mismatch for a glyph between masters.
    #[error("Point count mismatch for glyph {glyph_id}: master '{path}' has {actual} points, expected {expected}")]
    PointCountMismatch {
        path: PathBuf,
        glyph_id: u32,
        expected: usize,
        actual: usize,
    },

    /// Component count mismatch for a composite glyph between masters.
    #[error("Component count mismatch for glyph {glyph_id}: master '{path}' has {actual} components, expected {expected}")]
    ComponentCountMismatch {
        path: PathBuf,
        glyph_id: u32,
        expected: usize,
        actual: usize,
    },

    /// No family name could be resolved for an instance.
    #[error("Instance '{0}' has no family name and the default master provides none")]
    MissingFamilyName(String),

    /// Font read error.
    #[error("Font read error: {0}")]
    Read(#[from] read_fonts::ReadError),

    /// Font builder error.
    #[error("Font builder error: {0}")]
    FontBuilder(#[from] write_fonts::BuilderError),

    /// Write error.
    #[error("Font write error: {0}")]
    Write(#[from] write_fonts::error::Error),
}

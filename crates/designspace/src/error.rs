//! Error types for designspace loading.

use std::path::PathBuf;

/// Result type for designspace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or validating a designspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to read the designspace file.
    #[error("Failed to read designspace '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is not well-formed XML.
    #[error("Malformed designspace XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The root element is not `<designspace>`.
    #[error("Expected <designspace> root element, found <{0}>")]
    NotDesignspace(String),

    /// A required attribute is missing.
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// An attribute that must be numeric could not be parsed.
    #[error("Invalid number '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidNumber {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    /// Discrete axes (`values=` instead of a range) are not interpolatable.
    #[error("Discrete axis '{0}' is not supported")]
    DiscreteAxis(String),

    /// A location dimension names an axis that does not exist.
    #[error("Location refers to unknown axis '{0}'")]
    UnknownAxis(String),

    /// No source sits at the default location.
    #[error("No source at default location found in designspace")]
    NoDefaultSource,

    /// Structural problem found during validation.
    #[error("Invalid designspace: {0}")]
    Invalid(String),
}

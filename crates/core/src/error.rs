//! Error types for presentation loading and export.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing a presentation package.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read the input or write the output.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input is not a presentation package we can open.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// A part the package must contain is missing.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error inside a slide or relationship part.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// The in-memory document no longer matches the package it came from.
    #[error("Export error: {0}")]
    ExportError(String),
}

//! PPTX (Office Open XML) adapter for deck translation.
//!
//! Opens .pptx packages (ZIP archives of XML parts), parses slides into the
//! shape tree and writes edited text back into a new package.

pub mod export;
pub mod package;
pub mod parser;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use export::{ExportedDeck, OUTPUT_FILE_NAME, PPTX_MIME_TYPE};
pub use package::{is_zip, PptxPackage};
pub use parser::SlideParser;

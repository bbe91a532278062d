//! Core document model, shape walker and translation passes
//! for translating presentation decks.

pub mod error;
pub mod progress;
pub mod translate;
pub mod types;
pub mod walk;

pub use error::{Error, Result};
pub use progress::{NoProgress, Progress, ProgressObserver};
pub use translate::{
    count_units, tally_slide, tally_units, translate_presentation, TranslationReport, Translator, UnitCount,
};
pub use types::{
    Cell, OpaqueKind, Paragraph, Presentation, Run, Shape, Slide, Table, TableRow, TextFrame,
    TextSpan,
};
pub use walk::{visit_slide_units, visit_units, visit_units_mut, Unit, UnitMut};

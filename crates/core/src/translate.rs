//! Counting and translation passes over a presentation.

use crate::progress::{Progress, ProgressObserver};
use crate::types::{Presentation, Slide};
use crate::walk::{visit_slide_units, visit_units_mut, Unit};

/// Turns one piece of text into its translation.
pub trait Translator {
    type Error;

    /// Translate a non-empty string.
    fn translate(&mut self, text: &str) -> Result<String, Self::Error>;
}

/// Unit totals for a presentation, as found by the counting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitCount {
    pub runs: usize,
    pub cells: usize,
    pub opaque: usize,
    /// Runs and cells whose text is empty.
    pub empty: usize,
}

impl UnitCount {
    /// Every unit, empty or not.
    pub fn total(&self) -> usize {
        self.runs + self.cells + self.opaque
    }

    /// Units that will be sent to the translator.
    pub fn translatable(&self) -> usize {
        self.runs + self.cells - self.empty
    }

    fn add(&mut self, other: UnitCount) {
        self.runs += other.runs;
        self.cells += other.cells;
        self.opaque += other.opaque;
        self.empty += other.empty;
    }
}

/// Count units by kind.
pub fn tally_units(presentation: &Presentation) -> UnitCount {
    let mut count = UnitCount::default();
    for slide in &presentation.slides {
        count.add(tally_slide(slide));
    }
    count
}

/// Count the units of one slide by kind.
pub fn tally_slide(slide: &Slide) -> UnitCount {
    let mut count = UnitCount::default();
    visit_slide_units(slide, |unit| match unit {
        Unit::Run(run) => {
            count.runs += 1;
            if run.text().is_empty() {
                count.empty += 1;
            }
        }
        Unit::Cell(cell) => {
            count.cells += 1;
            if cell.text().is_empty() {
                count.empty += 1;
            }
        }
        Unit::Opaque(_) => count.opaque += 1,
    });
    count
}

/// Total number of units, empty ones included. Sizes the progress bar.
pub fn count_units(presentation: &Presentation) -> usize {
    tally_units(presentation).total()
}

/// What the translation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationReport {
    pub total: usize,
    pub translated: usize,
    pub skipped_empty: usize,
    pub opaque: usize,
}

/// Translate every non-empty run and table cell in place.
///
/// `total` is the result of [`count_units`] on the same presentation.
/// The observer is notified after every unit, so the last update is
/// exactly 1.0 when the pass finishes. The first translator error aborts
/// the pass; units translated before it keep their new text.
pub fn translate_presentation<T, O>(
    presentation: &mut Presentation,
    total: usize,
    translator: &mut T,
    observer: &mut O,
) -> Result<TranslationReport, T::Error>
where
    T: Translator + ?Sized,
    O: ProgressObserver + ?Sized,
{
    let mut progress = Progress::new(total);
    let mut report = TranslationReport {
        total,
        ..TranslationReport::default()
    };

    visit_units_mut(presentation, |mut unit| -> Result<(), T::Error> {
        match unit.text() {
            Some(text) if text.is_empty() => report.skipped_empty += 1,
            Some(text) => {
                log::debug!("Translating unit {}/{}: {:?}", progress.processed + 1, total, text);
                let translated = translator.translate(&text)?;
                unit.set_text(translated);
                report.translated += 1;
            }
            None => report.opaque += 1,
        }
        progress.advance();
        observer.update(progress);
        Ok(())
    })?;

    log::info!(
        "Translated {} of {} units ({} empty, {} opaque)",
        report.translated,
        report.total,
        report.skipped_empty,
        report.opaque
    );
    Ok(report)
}

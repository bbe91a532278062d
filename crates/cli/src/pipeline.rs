//! One run over one deck: count, translate, export.

use anyhow::{Context, Result};
use deck_core::{
    count_units, tally_slide, translate_presentation, Presentation, ProgressObserver,
    TranslationReport, Translator, UnitCount,
};
use deck_pptx::{ExportedDeck, PptxPackage};

/// Unit counts of one slide, for `--dry-run`.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideCount {
    pub number: usize,
    pub part: String,
    pub count: UnitCount,
}

fn open_deck(bytes: &[u8]) -> Result<(PptxPackage, Presentation)> {
    let package = PptxPackage::from_bytes(bytes).context("Failed to open presentation")?;
    let presentation = package
        .presentation()
        .context("Failed to read slides")?;
    log::debug!("Opened deck with {} slides", presentation.slide_count());
    Ok((package, presentation))
}

/// Translate every unit of the deck and export the result.
///
/// Nothing is exported unless every unit was translated.
pub fn translate_deck<T, O>(
    bytes: &[u8],
    translator: &mut T,
    observer: &mut O,
) -> Result<(ExportedDeck, TranslationReport)>
where
    T: Translator,
    T::Error: std::error::Error + Send + Sync + 'static,
    O: ProgressObserver,
{
    let (package, mut presentation) = open_deck(bytes)?;

    let total = count_units(&presentation);
    log::info!("Found {} units in {} slides", total, presentation.slide_count());

    let report = translate_presentation(&mut presentation, total, translator, observer)
        .context("Translation aborted")?;

    let deck = package
        .export(&presentation)
        .context("Failed to export translated deck")?;
    Ok((deck, report))
}

/// Per-slide unit counts, without translating anything.
pub fn count_report(bytes: &[u8]) -> Result<Vec<SlideCount>> {
    let (_, presentation) = open_deck(bytes)?;
    Ok(presentation
        .slides
        .iter()
        .map(|slide| SlideCount {
            number: slide.number,
            part: slide.part.clone(),
            count: tally_slide(slide),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{visit_units, Progress, Unit};
    use deck_pptx::test_utils::{group, picture, table, text_box, DeckBuilder};
    use std::io;

    /// Prefixes "zh:" and can be told to fail on the n-th call.
    #[derive(Default)]
    struct FakeTranslator {
        calls: Vec<String>,
        fail_on: Option<usize>,
    }

    impl Translator for FakeTranslator {
        type Error = io::Error;

        fn translate(&mut self, text: &str) -> std::result::Result<String, io::Error> {
            self.calls.push(text.to_string());
            if self.fail_on == Some(self.calls.len()) {
                return Err(io::Error::new(io::ErrorKind::Other, "rate limit exceeded"));
            }
            Ok(format!("zh:{}", text))
        }
    }

    fn unit_texts(bytes: &[u8]) -> Vec<String> {
        let presentation = PptxPackage::from_bytes(bytes)
            .unwrap()
            .presentation()
            .unwrap();
        let mut texts = Vec::new();
        visit_units(&presentation, |unit| match unit {
            Unit::Run(run) => texts.push(run.text().to_string()),
            Unit::Cell(cell) => texts.push(cell.text()),
            Unit::Opaque(kind) => texts.push(format!("[{}]", kind)),
        });
        texts
    }

    #[test]
    fn test_translated_deck_round_trips() {
        let bytes = DeckBuilder::new()
            .slide(&text_box(&["Hello", "", "World"]))
            .slide(&format!(
                "{}{}",
                table(&[&["A", "B"], &["C", "D"]]),
                group(&[text_box(&["Inner"]), picture()])
            ))
            .build();

        let mut translator = FakeTranslator::default();
        let mut updates = Vec::new();
        let mut observer = |p: Progress| updates.push(p.fraction());

        let (deck, report) = translate_deck(&bytes, &mut translator, &mut observer).unwrap();

        assert_eq!(deck.file_name, "translated.pptx");
        assert_eq!(report.total, 9);
        assert_eq!(report.translated, 7);
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(report.opaque, 1);
        assert_eq!(translator.calls, vec!["Hello", "World", "A", "B", "C", "D", "Inner"]);
        assert_eq!(updates.len(), 9);
        assert_eq!(updates.last().copied(), Some(1.0));

        assert_eq!(
            unit_texts(&deck.data),
            vec![
                "zh:Hello", "", "zh:World", "zh:A", "zh:B", "zh:C", "zh:D", "zh:Inner",
                "[picture]"
            ]
        );
    }

    #[test]
    fn test_failure_produces_no_deck() {
        let bytes = DeckBuilder::new()
            .slide(&text_box(&["one", "two", "three", "four", "five"]))
            .build();
        let mut translator = FakeTranslator {
            fail_on: Some(3),
            ..FakeTranslator::default()
        };

        let err = translate_deck(&bytes, &mut translator, &mut deck_core::NoProgress).unwrap_err();

        assert_eq!(translator.calls.len(), 3);
        assert!(format!("{:#}", err).contains("rate limit exceeded"));
    }

    #[test]
    fn test_rejects_non_pptx_input() {
        let mut translator = FakeTranslator::default();
        let err = translate_deck(b"%PDF-1.7", &mut translator, &mut deck_core::NoProgress)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open presentation"));
        assert!(translator.calls.is_empty());
    }

    #[test]
    fn test_count_report() {
        let bytes = DeckBuilder::new()
            .slide(&text_box(&["a", ""]))
            .slide(&format!("{}{}", table(&[&["x", "y"]]), picture()))
            .build();

        let counts = count_report(&bytes).unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].number, 1);
        assert_eq!(counts[0].part, "ppt/slides/slide1.xml");
        assert_eq!(counts[0].count.runs, 2);
        assert_eq!(counts[0].count.empty, 1);
        assert_eq!(counts[1].count.cells, 2);
        assert_eq!(counts[1].count.opaque, 1);
        assert_eq!(counts[1].count.total(), 3);
    }
}

//! Domain types for the slide/shape tree of a presentation.
//!
//! The tree only models what translation needs: which shapes hold text,
//! in which order, and where each run's text lives in its slide part so
//! that an edited document can be written back without touching anything
//! else.

use std::fmt;
use std::ops::Range;

/// An entire presentation, slides in presentation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presentation {
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Create an empty presentation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Number of slides.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}

/// A single slide.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Package part the slide was read from, e.g. `ppt/slides/slide1.xml`.
    pub part: String,

    /// Top-level shapes in document order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new slide with the given number and part name.
    pub fn new(number: usize, part: impl Into<String>) -> Self {
        Self {
            number,
            part: part.into(),
            shapes: Vec::new(),
        }
    }

    /// Add a shape to this slide.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}

/// Any visual element on a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A group shape; children are shapes themselves.
    Group(Vec<Shape>),
    /// A shape with a text frame (text box, placeholder, autoshape).
    Text(TextFrame),
    /// A graphic frame holding a table.
    Table(Table),
    /// Anything else. Counted, never mutated.
    Opaque(OpaqueKind),
}

/// What kind of shape an opaque unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueKind {
    Picture,
    Connector,
    /// Chart, diagram or embedded object frame.
    GraphicFrame,
    ContentPart,
}

impl fmt::Display for OpaqueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Picture => "picture",
            Self::Connector => "connector",
            Self::GraphicFrame => "graphic frame",
            Self::ContentPart => "content part",
        };
        f.write_str(name)
    }
}

/// Text body of a shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    /// Create a text frame from paragraphs.
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }
}

/// A paragraph: an ordered sequence of runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    span: Option<Range<usize>>,
    removed: bool,
    extra_lines: Vec<String>,
}

impl Paragraph {
    /// Create a paragraph from runs.
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    /// Create a paragraph whose whole `<a:p>` element covers `span`.
    pub fn with_span(runs: Vec<Run>, span: Range<usize>) -> Self {
        Self {
            runs,
            span: Some(span),
            ..Self::default()
        }
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(Run::text).collect()
    }

    /// Byte range of the paragraph element in its part, if known.
    pub fn span(&self) -> Option<&Range<usize>> {
        self.span.as_ref()
    }

    /// Whether the paragraph is dropped on export.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Lines written as copies of this paragraph, right after it.
    pub fn extra_lines(&self) -> &[String] {
        &self.extra_lines
    }

    /// Whether the paragraph has a run whose text can be written back.
    fn is_writable(&self) -> bool {
        self.runs.iter().any(|r| r.span().is_some())
    }

    /// Put `line` into the first writable run and clear the others.
    fn write_line(&mut self, line: String) {
        let mut line = Some(line);
        for run in self.runs.iter_mut() {
            if run.span().is_some() {
                if let Some(line) = line.take() {
                    run.set_text(line);
                    continue;
                }
            }
            if !run.text().is_empty() {
                run.set_text("");
            }
        }
    }
}

/// Where a run's text sits inside its slide part.
///
/// Offsets are byte offsets into the part's XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSpan {
    /// Content between `<a:t>` and `</a:t>`.
    Content { start: usize, end: usize },
    /// A self-closing `<a:t/>` element, spanning the whole tag.
    /// `name` is the qualified element name used when expanding it.
    EmptyElement {
        start: usize,
        end: usize,
        name: String,
    },
}

impl TextSpan {
    /// Byte offset where the span starts.
    pub fn start(&self) -> usize {
        match self {
            Self::Content { start, .. } | Self::EmptyElement { start, .. } => *start,
        }
    }

    /// Byte offset one past the end of the span.
    pub fn end(&self) -> usize {
        match self {
            Self::Content { end, .. } | Self::EmptyElement { end, .. } => *end,
        }
    }
}

/// The smallest unit of styled text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    text: String,
    span: Option<TextSpan>,
    edited: bool,
}

impl Run {
    /// Create a run that is not backed by any XML location.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: None,
            edited: false,
        }
    }

    /// Create a run whose text was read from `span`.
    pub fn with_span(text: impl Into<String>, span: TextSpan) -> Self {
        Self {
            text: text.into(),
            span: Some(span),
            edited: false,
        }
    }

    /// Current text of the run.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the run's text. Identity and formatting are kept.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.edited = true;
    }

    /// Location of the text in the source part, if any.
    pub fn span(&self) -> Option<&TextSpan> {
        self.span.as_ref()
    }

    /// Whether the text was replaced since the run was read.
    pub fn is_edited(&self) -> bool {
        self.edited
    }
}

/// A table: rows of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

/// One table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<Cell>,
}

/// A table cell. Its text body is translated as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

impl Cell {
    /// Create a cell from paragraphs.
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }

    /// Cell text: paragraph texts joined with `\n`.
    pub fn text(&self) -> String {
        let mut lines = Vec::new();
        for paragraph in self.paragraphs.iter().filter(|p| !p.is_removed()) {
            lines.push(paragraph.text());
            lines.extend(paragraph.extra_lines.iter().cloned());
        }
        lines.join("\n")
    }

    /// Replace the whole cell text, one paragraph per `\n`-separated line.
    ///
    /// Line `i` goes into the `i`-th paragraph that has a writable run.
    /// Leftover paragraphs are dropped; lines beyond the last writable
    /// paragraph become copies of it. The cell then reads as exactly `text`.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        let writable: Vec<usize> = self
            .paragraphs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_writable())
            .map(|(idx, _)| idx)
            .collect();
        let Some(&last) = writable.last() else {
            log::warn!("Table cell has no writable run; translation dropped");
            return;
        };

        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let mut overflow = if lines.len() > writable.len() {
            lines.split_off(writable.len())
        } else {
            Vec::new()
        };
        if !overflow.is_empty() && self.paragraphs[last].span.is_none() {
            // Nowhere to copy the paragraph from; keep the text in its last line.
            let mut joined = lines.pop().unwrap_or_default();
            for line in overflow.drain(..) {
                joined.push('\n');
                joined.push_str(&line);
            }
            lines.push(joined);
        }

        let mut lines = lines.into_iter();
        for (idx, paragraph) in self.paragraphs.iter_mut().enumerate() {
            paragraph.extra_lines.clear();
            let line = if paragraph.is_writable() { lines.next() } else { None };
            match line {
                Some(line) => {
                    paragraph.removed = false;
                    paragraph.write_line(line);
                    if idx == last {
                        paragraph.extra_lines = std::mem::take(&mut overflow);
                    }
                }
                None if paragraph.span.is_some() => paragraph.removed = true,
                None => {}
            }
        }
    }
}

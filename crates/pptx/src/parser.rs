//! Slide XML parser.
//!
//! Builds the shape tree of one slide part and records, for every run, the
//! byte span of its text so the export can splice translations back in.
//! Text is read without trimming: whitespace inside `<a:t>` is content.

use std::ops::Range;

use deck_core::{
    Cell, Error, OpaqueKind, Paragraph, Result, Run, Shape, Table, TableRow, TextFrame, TextSpan,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parser for a single slide part.
pub struct SlideParser<'a> {
    xml: &'a str,
    reader: Reader<&'a [u8]>,
}

impl<'a> SlideParser<'a> {
    /// Create a parser over the slide XML.
    pub fn new(xml: &'a str) -> Self {
        Self {
            xml,
            reader: Reader::from_str(xml),
        }
    }

    /// Parse the slide's shape tree. A slide without one has no shapes.
    pub fn parse(mut self) -> Result<Vec<Shape>> {
        loop {
            match self.next_event()? {
                Event::Start(e) if local_name(e.name().as_ref()) == b"spTree" => {
                    return self.parse_shape_tree(b"spTree");
                }
                Event::Eof => return Ok(Vec::new()),
                _ => {}
            }
        }
    }

    fn next_event(&mut self) -> Result<Event<'a>> {
        self.reader.read_event().map_err(|e| {
            Error::XmlError(format!(
                "at byte {}: {}",
                self.reader.buffer_position(),
                e
            ))
        })
    }

    /// Skip the subtree of an element whose start tag was just read.
    fn skip(&mut self, start: &BytesStart<'_>) -> Result<()> {
        self.reader
            .read_to_end(start.name())
            .map_err(|e| Error::XmlError(format!("at byte {}: {}", self.reader.buffer_position(), e)))?;
        Ok(())
    }

    /// Byte offset of the `<` opening the tag that was just read.
    fn tag_start(&self) -> usize {
        let end = self.reader.buffer_position();
        self.xml[..end].rfind('<').unwrap_or(end)
    }

    /// Shapes of an `spTree` or `grpSp`, up to its end tag.
    fn parse_shape_tree(&mut self, end: &[u8]) -> Result<Vec<Shape>> {
        let mut shapes = Vec::new();

        loop {
            match self.next_event()? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"sp" => shapes.push(self.parse_text_shape()?),
                    b"grpSp" => shapes.push(Shape::Group(self.parse_shape_tree(b"grpSp")?)),
                    b"graphicFrame" => shapes.push(self.parse_graphic_frame()?),
                    name => {
                        let kind = opaque_kind(name);
                        self.skip(&e)?;
                        if let Some(kind) = kind {
                            shapes.push(Shape::Opaque(kind));
                        }
                    }
                },
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"sp" => shapes.push(Shape::Text(TextFrame::default())),
                    b"grpSp" => shapes.push(Shape::Group(Vec::new())),
                    b"graphicFrame" => shapes.push(Shape::Opaque(OpaqueKind::GraphicFrame)),
                    name => {
                        if let Some(kind) = opaque_kind(name) {
                            shapes.push(Shape::Opaque(kind));
                        }
                    }
                },
                Event::End(e) if local_name(e.name().as_ref()) == end => return Ok(shapes),
                Event::Eof => return Err(unexpected_eof(end)),
                _ => {}
            }
        }
    }

    /// An `sp` element. Shapes without a text body have no paragraphs.
    fn parse_text_shape(&mut self) -> Result<Shape> {
        let mut frame = TextFrame::default();

        loop {
            match self.next_event()? {
                Event::Start(e) => {
                    if local_name(e.name().as_ref()) == b"txBody" {
                        frame.paragraphs = self.parse_text_body()?;
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"sp" => {
                    return Ok(Shape::Text(frame));
                }
                Event::Eof => return Err(unexpected_eof(b"sp")),
                _ => {}
            }
        }
    }

    /// A `graphicFrame`: a table when it holds `a:tbl`, opaque otherwise.
    fn parse_graphic_frame(&mut self) -> Result<Shape> {
        let mut table = None;

        loop {
            match self.next_event()? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"tbl" => table = Some(self.parse_table()?),
                    b"nvGraphicFramePr" | b"xfrm" | b"extLst" => self.skip(&e)?,
                    _ => {}
                },
                Event::End(e) if local_name(e.name().as_ref()) == b"graphicFrame" => {
                    return Ok(match table {
                        Some(table) => Shape::Table(table),
                        None => Shape::Opaque(OpaqueKind::GraphicFrame),
                    });
                }
                Event::Eof => return Err(unexpected_eof(b"graphicFrame")),
                _ => {}
            }
        }
    }

    fn parse_table(&mut self) -> Result<Table> {
        let mut table = Table::default();

        loop {
            match self.next_event()? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"tr" => table.rows.push(TableRow::default()),
                    b"tc" => {
                        let cell = self.parse_cell()?;
                        current_row(&mut table).cells.push(cell);
                    }
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"tr" => table.rows.push(TableRow::default()),
                    b"tc" => current_row(&mut table).cells.push(Cell::default()),
                    _ => {}
                },
                Event::End(e) if local_name(e.name().as_ref()) == b"tbl" => return Ok(table),
                Event::Eof => return Err(unexpected_eof(b"tbl")),
                _ => {}
            }
        }
    }

    fn parse_cell(&mut self) -> Result<Cell> {
        let mut cell = Cell::default();

        loop {
            match self.next_event()? {
                Event::Start(e) => {
                    if local_name(e.name().as_ref()) == b"txBody" {
                        cell.paragraphs = self.parse_text_body()?;
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"tc" => return Ok(cell),
                Event::Eof => return Err(unexpected_eof(b"tc")),
                _ => {}
            }
        }
    }

    /// Paragraphs of a `txBody`, up to its end tag.
    fn parse_text_body(&mut self) -> Result<Vec<Paragraph>> {
        let mut paragraphs = Vec::new();

        loop {
            match self.next_event()? {
                Event::Start(e) => {
                    if local_name(e.name().as_ref()) == b"p" {
                        let start = self.tag_start();
                        paragraphs.push(self.parse_paragraph(start)?);
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"p" => {
                    let span = self.tag_start()..self.reader.buffer_position();
                    paragraphs.push(Paragraph::with_span(Vec::new(), span));
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"txBody" => {
                    return Ok(paragraphs);
                }
                Event::Eof => return Err(unexpected_eof(b"txBody")),
                _ => {}
            }
        }
    }

    /// Runs of an `a:p`. Fields and line breaks are not runs.
    fn parse_paragraph(&mut self, start: usize) -> Result<Paragraph> {
        let mut runs = Vec::new();

        loop {
            match self.next_event()? {
                Event::Start(e) => {
                    if local_name(e.name().as_ref()) == b"r" {
                        runs.push(self.parse_run()?);
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"p" => {
                    let span: Range<usize> = start..self.reader.buffer_position();
                    return Ok(Paragraph::with_span(runs, span));
                }
                Event::Eof => return Err(unexpected_eof(b"p")),
                _ => {}
            }
        }
    }

    /// An `a:r`. A run without `a:t` has empty, unwritable text.
    fn parse_run(&mut self) -> Result<Run> {
        let mut run = Run::new("");

        loop {
            match self.next_event()? {
                Event::Start(e) => {
                    if local_name(e.name().as_ref()) == b"t" {
                        run = self.parse_text()?;
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"t" => {
                    let span = TextSpan::EmptyElement {
                        start: self.tag_start(),
                        end: self.reader.buffer_position(),
                        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    };
                    run = Run::with_span("", span);
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"r" => return Ok(run),
                Event::Eof => return Err(unexpected_eof(b"r")),
                _ => {}
            }
        }
    }

    /// Content of an `a:t` whose start tag was just read.
    fn parse_text(&mut self) -> Result<Run> {
        let start = self.reader.buffer_position();
        let mut text = String::new();

        loop {
            match self.next_event()? {
                Event::Text(e) => {
                    let unescaped = e
                        .unescape()
                        .map_err(|e| Error::XmlError(format!("bad text at byte {}: {}", start, e)))?;
                    text.push_str(&unescaped);
                }
                Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                Event::Start(e) => self.skip(&e)?,
                Event::End(e) if local_name(e.name().as_ref()) == b"t" => {
                    let end = self.tag_start();
                    return Ok(Run::with_span(text, TextSpan::Content { start, end }));
                }
                Event::Eof => return Err(unexpected_eof(b"t")),
                _ => {}
            }
        }
    }
}

fn current_row(table: &mut Table) -> &mut TableRow {
    if table.rows.is_empty() {
        table.rows.push(TableRow::default());
    }
    let last = table.rows.len() - 1;
    &mut table.rows[last]
}

/// Shape elements that hold no translatable text.
fn opaque_kind(name: &[u8]) -> Option<OpaqueKind> {
    match name {
        b"pic" => Some(OpaqueKind::Picture),
        b"cxnSp" => Some(OpaqueKind::Connector),
        b"contentPart" => Some(OpaqueKind::ContentPart),
        _ => None,
    }
}

fn unexpected_eof(element: &[u8]) -> Error {
    Error::XmlError(format!(
        "unexpected end of document inside <{}>",
        String::from_utf8_lossy(element)
    ))
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{group, picture, slide_xml, table, text_box};
    use deck_core::{count_units, Presentation, Slide, Unit};

    fn parse(shapes: &str) -> Vec<Shape> {
        SlideParser::new(&slide_xml(shapes)).parse().unwrap()
    }

    fn units(shapes: Vec<Shape>) -> Vec<String> {
        let mut slide = Slide::new(1, "ppt/slides/slide1.xml");
        slide.shapes = shapes;
        let mut presentation = Presentation::new();
        presentation.add_slide(slide);

        let mut seen = Vec::new();
        deck_core::visit_units(&presentation, |unit| {
            seen.push(match unit {
                Unit::Run(r) => r.text().to_string(),
                Unit::Cell(c) => c.text(),
                Unit::Opaque(kind) => format!("<{}>", kind),
            })
        });
        seen
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_text_box_runs() {
        let shapes = parse(&text_box(&["Hello", " world"]));
        assert_eq!(units(shapes), vec!["Hello", " world"]);
    }

    #[test]
    fn test_run_span_points_at_text() {
        let xml = slide_xml(&text_box(&["Fish &amp; chips"]));
        let shapes = SlideParser::new(&xml).parse().unwrap();

        let Shape::Text(frame) = &shapes[0] else {
            panic!("expected text shape");
        };
        let run = &frame.paragraphs[0].runs[0];
        assert_eq!(run.text(), "Fish & chips");
        let span = run.span().unwrap();
        assert_eq!(&xml[span.start()..span.end()], "Fish &amp; chips");
    }

    #[test]
    fn test_paragraph_span_covers_element() {
        let xml = slide_xml(&text_box(&["x"]));
        let shapes = SlideParser::new(&xml).parse().unwrap();

        let Shape::Text(frame) = &shapes[0] else {
            panic!("expected text shape");
        };
        let span = frame.paragraphs[0].span().unwrap().clone();
        assert!(xml[span.clone()].starts_with("<a:p>"));
        assert!(xml[span].ends_with("</a:p>"));
    }

    #[test]
    fn test_table_cells_row_major() {
        let shapes = parse(&table(&[&["a", "b"], &["c", "d"]]));
        assert_eq!(units(shapes.clone()), vec!["a", "b", "c", "d"]);
        assert!(matches!(shapes[0], Shape::Table(ref t) if t.rows.iter().map(|r| r.cells.len()).sum::<usize>() == 4));
    }

    #[test]
    fn test_nested_groups() {
        let inner = group(&[text_box(&["deep"])]);
        let outer = group(&[text_box(&["g1"]), inner, picture()]);
        let shapes = parse(&format!("{}{}", outer, text_box(&["after"])));

        assert_eq!(units(shapes), vec!["g1", "deep", "<picture>", "after"]);
    }

    #[test]
    fn test_fields_and_breaks_are_not_runs() {
        let shape = r#"<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:t>Page </a:t></a:r><a:br/><a:fld id="{1}" type="slidenum"><a:t>3</a:t></a:fld></a:p></p:txBody></p:sp>"#;
        assert_eq!(units(parse(shape)), vec!["Page "]);
    }

    #[test]
    fn test_shape_without_text_body_has_no_units() {
        let shape = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Rect"/></p:nvSpPr><p:spPr/></p:sp>"#;
        let shapes = parse(shape);
        assert_eq!(shapes.len(), 1);
        assert!(units(shapes).is_empty());
    }

    #[test]
    fn test_chart_frame_is_opaque() {
        let frame = r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="4" name="Chart"/></p:nvGraphicFramePr><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart r:id="rId2"/></a:graphicData></a:graphic></p:graphicFrame>"#;
        assert_eq!(units(parse(frame)), vec!["<graphic frame>"]);
    }

    #[test]
    fn test_empty_text_element() {
        let shape = r#"<p:sp><p:txBody><a:p><a:r><a:rPr lang="en-US"/><a:t/></a:r></a:p></p:txBody></p:sp>"#;
        let xml = slide_xml(shape);
        let shapes = SlideParser::new(&xml).parse().unwrap();
        let Shape::Text(frame) = &shapes[0] else {
            panic!("expected text shape");
        };
        let run = &frame.paragraphs[0].runs[0];
        assert_eq!(run.text(), "");
        let span = run.span().unwrap();
        assert_eq!(&xml[span.start()..span.end()], "<a:t/>");
    }

    #[test]
    fn test_whitespace_is_kept() {
        assert_eq!(units(parse(&text_box(&["  padded  "]))), vec!["  padded  "]);
    }

    #[test]
    fn test_alternate_content_is_skipped() {
        let shapes = format!(
            "<mc:AlternateContent><mc:Choice Requires=\"p14\">{}</mc:Choice></mc:AlternateContent>{}",
            text_box(&["hidden"]),
            text_box(&["shown"])
        );
        assert_eq!(units(parse(&shapes)), vec!["shown"]);
    }

    #[test]
    fn test_counts_match_scenarios() {
        let mut slide = Slide::new(1, "ppt/slides/slide1.xml");
        slide.shapes = parse(&format!(
            "{}{}",
            group(&[text_box(&["a"]), text_box(&["b"])]),
            text_box(&["x", "", "y"])
        ));
        let mut presentation = Presentation::new();
        presentation.add_slide(slide);
        assert_eq!(count_units(&presentation), 5);
    }

    #[test]
    fn test_truncated_xml_is_an_error() {
        let xml = "<p:sld><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>cut";
        assert!(matches!(
            SlideParser::new(xml).parse(),
            Err(Error::XmlError(_))
        ));
    }
}

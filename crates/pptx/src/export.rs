//! Writing translated text back into slide parts.

use std::borrow::Cow;
use std::ops::Range;

use deck_core::{Error, Paragraph, Result, Shape, Slide, TextSpan};
use quick_xml::escape::escape;

/// File name offered for the translated deck.
pub const OUTPUT_FILE_NAME: &str = "translated.pptx";

/// MIME type of a PPTX file.
pub const PPTX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// A serialized deck, ready to be saved or downloaded.
#[derive(Debug, Clone)]
pub struct ExportedDeck {
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl ExportedDeck {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            file_name: OUTPUT_FILE_NAME.to_string(),
            mime_type: PPTX_MIME_TYPE,
            data,
        }
    }
}

/// A replacement of one byte range of the part.
#[derive(Debug)]
struct Edit<'a> {
    range: Range<usize>,
    replacement: Cow<'a, str>,
}

/// Apply the slide's edited runs and removed paragraphs to its part XML.
///
/// Returns `None` when nothing on the slide changed.
pub fn apply_edits(xml: &str, slide: &Slide) -> Result<Option<String>> {
    let mut paragraphs = Vec::new();
    for shape in &slide.shapes {
        collect_paragraphs(shape, &mut paragraphs);
    }

    let mut edits = Vec::new();
    for paragraph in paragraphs {
        paragraph_edits(xml, &slide.part, paragraph, &mut edits)?;
    }
    if edits.is_empty() {
        return Ok(None);
    }

    let count = edits.len();
    let out = splice(xml, 0..xml.len(), edits, &slide.part)?;
    log::debug!("{}: applied {} edits", slide.part, count);
    Ok(Some(out))
}

/// Replace the edit ranges inside `region` of `xml`.
fn splice(xml: &str, region: Range<usize>, mut edits: Vec<Edit<'_>>, part: &str) -> Result<String> {
    if region.start > region.end
        || region.end > xml.len()
        || !xml.is_char_boundary(region.start)
        || !xml.is_char_boundary(region.end)
    {
        return Err(Error::ExportError(format!(
            "{}: paragraph span {}..{} does not fit the part",
            part, region.start, region.end
        )));
    }
    edits.sort_by_key(|e| e.range.start);

    let mut out = String::with_capacity(region.len());
    let mut cursor = region.start;
    for edit in &edits {
        let Range { start, end } = edit.range;
        if start < cursor
            || end > region.end
            || !xml.is_char_boundary(start)
            || !xml.is_char_boundary(end)
        {
            return Err(Error::ExportError(format!(
                "{}: text span {}..{} does not fit the part",
                part, start, end
            )));
        }
        out.push_str(&xml[cursor..start]);
        out.push_str(&edit.replacement);
        cursor = end;
    }
    out.push_str(&xml[cursor..region.end]);
    Ok(out)
}

fn collect_paragraphs<'a>(shape: &'a Shape, out: &mut Vec<&'a Paragraph>) {
    match shape {
        Shape::Group(children) => {
            for child in children {
                collect_paragraphs(child, out);
            }
        }
        Shape::Text(frame) => out.extend(frame.paragraphs.iter()),
        Shape::Table(table) => {
            for cell in table.rows.iter().flat_map(|r| r.cells.iter()) {
                out.extend(cell.paragraphs.iter());
            }
        }
        Shape::Opaque(_) => {}
    }
}

fn paragraph_edits<'a>(
    xml: &str,
    part: &str,
    paragraph: &'a Paragraph,
    edits: &mut Vec<Edit<'a>>,
) -> Result<()> {
    if paragraph.is_removed() {
        if let Some(span) = paragraph.span() {
            edits.push(Edit {
                range: span.clone(),
                replacement: Cow::Borrowed(""),
            });
        }
        return Ok(());
    }

    let span = match paragraph.span() {
        Some(span) if !paragraph.extra_lines().is_empty() => span,
        _ => {
            edits.extend(run_edits(paragraph, None));
            return Ok(());
        }
    };

    // The paragraph is followed by copies of itself, one per extra line.
    let mut replacement = splice(xml, span.clone(), run_edits(paragraph, None), part)?;
    for line in paragraph.extra_lines() {
        replacement.push_str(&splice(
            xml,
            span.clone(),
            run_edits(paragraph, Some(line.as_str())),
            part,
        )?);
    }
    edits.push(Edit {
        range: span.clone(),
        replacement: Cow::Owned(replacement),
    });
    Ok(())
}

/// Edits for the paragraph's runs. With `line`, the first writable run
/// gets `line` instead of its own text.
fn run_edits<'a>(paragraph: &'a Paragraph, mut line: Option<&'a str>) -> Vec<Edit<'a>> {
    let mut edits = Vec::new();

    for run in &paragraph.runs {
        let Some(span) = run.span() else {
            if run.is_edited() {
                log::warn!("Edited run has no location; text not written");
            }
            continue;
        };
        let text = match line.take() {
            Some(line) => line,
            None if run.is_edited() => run.text(),
            None => continue,
        };

        match span {
            TextSpan::Content { start, end } => edits.push(Edit {
                range: *start..*end,
                replacement: encode_text(text),
            }),
            TextSpan::EmptyElement { start, end, name } => {
                if !text.is_empty() {
                    edits.push(Edit {
                        range: *start..*end,
                        replacement: Cow::Owned(format!(
                            "<{}>{}</{}>",
                            name,
                            encode_text(text),
                            name
                        )),
                    });
                }
            }
        }
    }
    edits
}

/// Escape text for an `<a:t>` element.
///
/// Control characters that XML 1.0 does not allow are written in the
/// `_xHHHH_` form Office uses; tab, line feed and the markup characters
/// are left to `escape`.
fn encode_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_escaped_control) {
        return escape(text);
    }

    let mut encoded = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if is_escaped_control(c) {
            encoded.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            encoded.push(c);
        }
    }
    Cow::Owned(escape(&encoded).into_owned())
}

fn is_escaped_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}'..='\u{1f}')
}

//! Shared test utilities for deck-pptx and its dependents.
//!
//! Builds minimal but well-formed PPTX packages in memory, plus helpers
//! producing the XML of common shapes.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const SLIDE_NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

const SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Wrap shape XML into a complete slide part.
pub fn slide_xml(shapes: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n<p:sld {}><p:cSld><p:spTree>",
            r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
            "<p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"
        ),
        SLIDE_NAMESPACES, shapes
    )
}

fn run_xml(text: &str) -> String {
    if text.is_empty() {
        r#"<a:r><a:rPr lang="en-US"/><a:t></a:t></a:r>"#.to_string()
    } else {
        format!(r#"<a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r>"#, escape(text))
    }
}

/// A text box with one paragraph holding one run per entry.
pub fn text_box(runs: &[&str]) -> String {
    let runs: String = runs.iter().map(|t| run_xml(t)).collect();
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="TextBox"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            "<p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p>{}</a:p></p:txBody></p:sp>"
        ),
        runs
    )
}

/// A table frame. Each cell's text becomes one run per `\n`-separated line.
pub fn table(rows: &[&[&str]]) -> String {
    let mut body = String::new();
    for row in rows {
        body.push_str(r#"<a:tr h="370840">"#);
        for cell in *row {
            body.push_str("<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>");
            for line in cell.split('\n') {
                body.push_str("<a:p>");
                body.push_str(&run_xml(line));
                body.push_str("</a:p>");
            }
            body.push_str("</a:txBody><a:tcPr/></a:tc>");
        }
        body.push_str("</a:tr>");
    }

    format!(
        concat!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="3" name="Table"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>"#,
            r#"<p:xfrm><a:off x="0" y="0"/><a:ext cx="100" cy="100"/></p:xfrm>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">"#,
            r#"<a:tbl><a:tblPr firstRow="1"/><a:tblGrid><a:gridCol w="100"/></a:tblGrid>{}</a:tbl>"#,
            "</a:graphicData></a:graphic></p:graphicFrame>"
        ),
        body
    )
}

/// A group shape around the given child shapes.
pub fn group(children: &[String]) -> String {
    format!(
        concat!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="5" name="Group"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
            "<p:grpSpPr/>{}</p:grpSp>"
        ),
        children.concat()
    )
}

/// A picture shape.
pub fn picture() -> String {
    concat!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="6" name="Picture"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>"#,
        r#"<p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr/></p:pic>"#
    )
    .to_string()
}

/// Builder for an in-memory PPTX package.
#[derive(Debug)]
pub struct DeckBuilder {
    slides: Vec<String>,
    reverse_order: bool,
    with_id_list: bool,
    with_main_part: bool,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self {
            slides: Vec::new(),
            reverse_order: false,
            with_id_list: true,
            with_main_part: true,
        }
    }

    /// Add a slide holding the given shape XML.
    pub fn slide(mut self, shapes: &str) -> Self {
        self.slides.push(slide_xml(shapes));
        self
    }

    /// List slides in the id list in reverse part order.
    pub fn reverse_slide_order(mut self) -> Self {
        self.reverse_order = true;
        self
    }

    /// Leave `p:sldIdLst` out of the presentation part.
    pub fn without_slide_id_list(mut self) -> Self {
        self.with_id_list = false;
        self
    }

    /// Leave `ppt/presentation.xml` out of the package.
    pub fn without_main_part(mut self) -> Self {
        self.with_main_part = false;
        self
    }

    /// Serialize the package.
    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut add = |name: &str, content: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };

        let overrides: String = (1..=self.slides.len())
            .map(|n| {
                format!(
                    r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                    n
                )
            })
            .collect();
        add(
            "[Content_Types].xml",
            &format!(
                concat!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                    r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
                    "{}</Types>"
                ),
                overrides
            ),
        );

        add(
            "_rels/.rels",
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>"#,
                "</Relationships>"
            ),
        );

        let mut numbers: Vec<usize> = (1..=self.slides.len()).collect();
        if self.reverse_order {
            numbers.reverse();
        }

        if self.with_main_part {
            let id_list = if self.with_id_list {
                let ids: String = numbers
                    .iter()
                    .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
                    .collect();
                format!("<p:sldIdLst>{}</p:sldIdLst>", ids)
            } else {
                String::new()
            };
            add(
                "ppt/presentation.xml",
                &format!(
                    concat!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                        "<p:presentation {}>{}",
                        r#"<p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#
                    ),
                    SLIDE_NAMESPACES, id_list
                ),
            );
        }

        let rels: String = (1..=self.slides.len())
            .map(|n| {
                format!(
                    r#"<Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
                    n + 1,
                    SLIDE_REL_TYPE,
                    n
                )
            })
            .collect();
        add(
            "ppt/_rels/presentation.xml.rels",
            &format!(
                concat!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
                    "{}</Relationships>"
                ),
                rels
            ),
        );

        for (idx, slide) in self.slides.iter().enumerate() {
            add(&format!("ppt/slides/slide{}.xml", idx + 1), slide);
        }

        drop(add);
        zip.finish().unwrap().into_inner()
    }
}

impl Default for DeckBuilder {
    fn default() -> Self {
        Self::new()
    }
}

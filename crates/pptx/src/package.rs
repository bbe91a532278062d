//! PPTX package handling.
//!
//! A PPTX file is a ZIP archive of XML parts. The package keeps every entry
//! in its original order so that export only changes the slide parts whose
//! text was replaced.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};

use deck_core::{Error, Presentation, Result, Slide};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::export::{apply_edits, ExportedDeck};
use crate::parser::{local_name, SlideParser};

const PACKAGE_RELS: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "ppt/presentation.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const SLIDE_REL: &str = "/slide";

/// ZIP local file header magic.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Check whether `bytes` start like a ZIP archive.
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_MAGIC)
}

/// One entry of the archive.
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// An opened PPTX package.
#[derive(Debug, Clone)]
pub struct PptxPackage {
    entries: Vec<PackageEntry>,
    index: HashMap<String, usize>,
}

impl PptxPackage {
    /// Open a package from its raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if !is_zip(bytes) {
            return Err(Error::UnsupportedFormat(
                "expected a .pptx (ZIP) package".to_string(),
            ));
        }
        Self::from_reader(Cursor::new(bytes))
    }

    /// Open a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(zip_error)?;
        let mut entries = Vec::with_capacity(archive.len());
        let mut index = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(zip_error)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let compression = file.compression();

            let mut data = Vec::new();
            if !is_dir {
                file.read_to_end(&mut data)
                    .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            }

            index.insert(name.clone(), entries.len());
            entries.push(PackageEntry {
                name,
                data,
                compression,
                is_dir,
            });
        }

        log::debug!("Opened package with {} entries", entries.len());
        Ok(Self { entries, index })
    }

    /// Raw bytes of a part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].data.as_slice())
    }

    /// A part decoded as UTF-8 XML.
    pub fn part_str(&self, name: &str) -> Result<&str> {
        let bytes = self
            .part(name)
            .ok_or_else(|| Error::MissingPart(name.to_string()))?;
        std::str::from_utf8(bytes)
            .map_err(|e| Error::XmlError(format!("'{}' is not valid UTF-8: {}", name, e)))
    }

    /// Names of all parts, in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// The main presentation part, as named by the package relationships.
    pub fn main_part(&self) -> Result<String> {
        if self.part(PACKAGE_RELS).is_some() {
            let rels = parse_relationships(self.part_str(PACKAGE_RELS)?)?;
            if let Some(rel) = rels
                .iter()
                .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL))
            {
                return Ok(resolve_target("", &rel.target));
            }
        }
        Ok(DEFAULT_MAIN_PART.to_string())
    }

    /// Slide part names in presentation order.
    ///
    /// The order comes from the slide id list of the main part; when that
    /// list is absent the slide relationships are ordered by slide number.
    pub fn slide_parts(&self) -> Result<Vec<String>> {
        let main = self.main_part()?;
        let main_xml = self.part_str(&main)?;
        let rels_part = rels_part_for(&main);
        let rels = parse_relationships(self.part_str(&rels_part)?)?;
        let base = parent_dir(&main);

        let slide_rels: HashMap<&str, &Relationship> = rels
            .iter()
            .filter(|r| r.rel_type.ends_with(SLIDE_REL))
            .map(|r| (r.id.as_str(), r))
            .collect();

        let slide_ids = parse_slide_id_list(main_xml)?;
        if !slide_ids.is_empty() {
            let mut parts = Vec::with_capacity(slide_ids.len());
            for id in &slide_ids {
                let rel = slide_rels.get(id.as_str()).ok_or_else(|| {
                    Error::MissingPart(format!("slide relationship '{}' in {}", id, rels_part))
                })?;
                parts.push(resolve_target(base, &rel.target));
            }
            return Ok(parts);
        }

        log::warn!("No slide id list in {}; ordering slides by part number", main);
        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .values()
            .map(|rel| {
                let path = resolve_target(base, &rel.target);
                let number = extract_slide_number(&path);
                (path, number)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse every slide into the shape tree.
    pub fn presentation(&self) -> Result<Presentation> {
        let mut presentation = Presentation::new();

        for (idx, part) in self.slide_parts()?.into_iter().enumerate() {
            let xml = self.part_str(&part)?;
            let shapes = SlideParser::new(xml)
                .parse()
                .map_err(|e| match e {
                    Error::XmlError(msg) => Error::XmlError(format!("{}: {}", part, msg)),
                    other => other,
                })?;

            let mut slide = Slide::new(idx + 1, part);
            slide.shapes = shapes;
            log::debug!(
                "Slide {} ({}): {} top-level shapes",
                slide.number,
                slide.part,
                slide.shapes.len()
            );
            presentation.add_slide(slide);
        }

        Ok(presentation)
    }

    /// Write the package with the presentation's edited text applied.
    pub fn export(&self, presentation: &Presentation) -> Result<ExportedDeck> {
        let mut replaced: HashMap<&str, String> = HashMap::new();
        for slide in &presentation.slides {
            let xml = self.part_str(&slide.part).map_err(|_| {
                Error::ExportError(format!("slide part '{}' is not in the package", slide.part))
            })?;
            if let Some(updated) = apply_edits(xml, slide)? {
                replaced.insert(slide.part.as_str(), updated);
            }
        }
        log::debug!("Rewriting {} slide parts", replaced.len());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default().compression_method(method);

            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)
                    .map_err(zip_error)?;
                continue;
            }

            zip.start_file(entry.name.as_str(), options)
                .map_err(zip_error)?;
            let data = replaced
                .get(entry.name.as_str())
                .map(|xml| xml.as_bytes())
                .unwrap_or(entry.data.as_slice());
            zip.write_all(data)?;
        }

        let data = zip.finish().map_err(zip_error)?.into_inner();
        Ok(ExportedDeck::new(data))
    }
}

fn zip_error(e: ZipError) -> Error {
    match e {
        ZipError::Io(io) => Error::IoError(io),
        other => Error::ZipError(other.to_string()),
    }
}

/// A `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, Default, PartialEq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationship ids of `<p:sldId>` entries, in list order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref().ends_with(b":id"))
                    .map(|a| String::from_utf8_lossy(&a.value).to_string());
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing slide id list: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// `ppt/presentation.xml` -> `ppt/_rels/presentation.xml.rels`.
fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

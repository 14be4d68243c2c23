//! XML parsing utilities for OOXML package parts calamine does not expose

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const DRAWING_REL: &str = "/drawing";
const IMAGE_REL: &str = "/image";

/// Names of the sheets whose drawing part references at least one image
pub fn sheets_with_images_in_file(path: &Path) -> Result<HashSet<String>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Not an OOXML package: {}", path.display()))?;
    sheets_with_images(&mut archive)
}

/// Walk workbook -> sheet -> drawing -> image relationships.
///
/// A sheet counts as having images when any of its drawings has an image
/// relationship. Charts and shapes without pictures do not count.
pub fn sheets_with_images(
    archive: &mut ZipArchive<impl Read + Seek>,
) -> Result<HashSet<String>> {
    let mut result = HashSet::new();

    let sheet_ids = read_sheet_ids(archive)?;
    let workbook_rels = read_relationships(archive, "xl/_rels/workbook.xml.rels")?;

    for (sheet_name, rid) in sheet_ids {
        let Some((_, target)) = workbook_rels.get(&rid) else {
            continue;
        };
        let sheet_part = resolve_part("xl", target);

        let sheet_rels = read_relationships(archive, &rels_path_for(&sheet_part))?;
        let drawings = sheet_rels
            .values()
            .filter(|(kind, _)| kind.ends_with(DRAWING_REL))
            .map(|(_, target)| resolve_part(parent_dir(&sheet_part), target))
            .collect::<Vec<_>>();

        for drawing_part in drawings {
            let drawing_rels = read_relationships(archive, &rels_path_for(&drawing_part))?;
            if drawing_rels
                .values()
                .any(|(kind, _)| kind.ends_with(IMAGE_REL))
            {
                result.insert(sheet_name.clone());
                break;
            }
        }
    }

    Ok(result)
}

/// Read `(sheet name, r:id)` pairs from xl/workbook.xml
fn read_sheet_ids(archive: &mut ZipArchive<impl Read + Seek>) -> Result<Vec<(String, String)>> {
    let workbook_xml = archive
        .by_name("xl/workbook.xml")
        .context("Failed to find xl/workbook.xml")?;
    let mut reader = Reader::from_reader(BufReader::new(workbook_xml));
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let mut name = String::new();
                let mut r_id = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr.unescape_value()?.to_string(),
                        b"r:id" => r_id = attr.unescape_value()?.to_string(),
                        _ => {}
                    }
                }
                if !name.is_empty() && !r_id.is_empty() {
                    sheets.push((name, r_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Read a relationships part into `Id -> (Type, Target)`.
///
/// A missing part is not an error: most sheets have no relationships.
fn read_relationships(
    archive: &mut ZipArchive<impl Read + Seek>,
    part: &str,
) -> Result<HashMap<String, (String, String)>> {
    let mut rels = HashMap::new();

    let rels_xml = match archive.by_name(part) {
        Ok(file) => file,
        Err(_) => return Ok(rels),
    };
    let mut reader = Reader::from_reader(BufReader::new(rels_xml));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = String::new();
                let mut kind = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value()?.to_string(),
                        b"Type" => kind = attr.unescape_value()?.to_string(),
                        b"Target" => target = attr.unescape_value()?.to_string(),
                        _ => {}
                    }
                }
                rels.insert(id, (kind, target));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_part(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

//! PDF normalization applied to every stored document

use crate::error::{CacheError, Result};
use lopdf::Document;
use regex::bytes::{Match, Regex};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

/// Parse `bytes` as a PDF and re-serialize it with renumbered objects and
/// compressed streams.
///
/// A document whose cross-reference table is unreadable is reloaded from a
/// table rebuilt out of its object headers. Fails if the payload is not a
/// PDF at all. The output is deterministic for a given input.
pub fn normalize_pdf(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut doc = load_document(bytes)?;

    doc.renumber_objects();
    doc.compress();

    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out)?;
    Ok(out)
}

fn load_document(bytes: &[u8]) -> Result<Document> {
    let err = match Document::load_mem(bytes) {
        Ok(doc) => return Ok(doc),
        Err(err) => err,
    };

    let Some(repaired) = rebuild_xref(bytes) else {
        return Err(CacheError::Pdf(err));
    };
    match Document::load_mem(&repaired) {
        Ok(doc) => {
            warn!(error = %err, "Rebuilt unreadable cross-reference table");
            Ok(doc)
        }
        Err(_) => Err(CacheError::Pdf(err)),
    }
}

fn object_header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"(?:^|[\r\n])[ \t]*([0-9]{1,10})[ \t\r\n]+([0-9]{1,5})[ \t\r\n]+obj(?-u:\b)")
            .expect("static regex is valid")
    })
}

fn trailer_reference() -> &'static Regex {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    REFERENCE.get_or_init(|| {
        Regex::new(r"/(Root|Info)[ \t\r\n]*([0-9]{1,10})[ \t\r\n]+([0-9]{1,5})[ \t\r\n]+R")
            .expect("static regex is valid")
    })
}

fn number<T: FromStr>(m: Option<Match<'_>>) -> Option<T> {
    std::str::from_utf8(m?.as_bytes()).ok()?.parse().ok()
}

/// Last `/{name} N G R` reference in the file
fn last_reference(bytes: &[u8], name: &str) -> Option<(u32, u16)> {
    trailer_reference()
        .captures_iter(bytes)
        .filter(|caps| caps.get(1).is_some_and(|m| m.as_bytes() == name.as_bytes()))
        .filter_map(|caps| Some((number(caps.get(2))?, number(caps.get(3))?)))
        .last()
}

/// Append a fresh cross-reference table and trailer built from the
/// `N G obj` headers found in `bytes`. Later definitions of an object win.
///
/// lopdf reads the last `startxref` in the file, so the appended section
/// replaces whatever the original one pointed at.
fn rebuild_xref(bytes: &[u8]) -> Option<Vec<u8>> {
    if !bytes.starts_with(b"%PDF-") {
        return None;
    }

    let objects: BTreeMap<u32, (usize, u16)> = object_header()
        .captures_iter(bytes)
        .filter_map(|caps| {
            let id_match = caps.get(1)?;
            let id: u32 = number(Some(id_match))?;
            let generation: u16 = number(caps.get(2))?;
            (id > 0).then_some((id, (id_match.start(), generation)))
        })
        .collect();
    let max_id = *objects.keys().next_back()?;
    let (root_id, root_generation) = last_reference(bytes, "Root")?;

    let mut out = bytes.to_vec();
    if !out.ends_with(b"\n") && !out.ends_with(b"\r") {
        out.push(b'\n');
    }
    let xref_start = out.len();

    let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", max_id + 1);
    for id in 1..=max_id {
        match objects.get(&id) {
            Some((offset, generation)) => {
                table.push_str(&format!("{:010} {:05} n \n", offset, generation))
            }
            None => table.push_str("0000000000 00000 f \n"),
        }
    }

    let info = last_reference(bytes, "Info")
        .filter(|(id, _)| objects.contains_key(id))
        .map(|(id, generation)| format!(" /Info {} {} R", id, generation))
        .unwrap_or_default();
    table.push_str(&format!(
        "trailer\n<< /Size {} /Root {} {} R{} >>\nstartxref\n{}\n%%EOF\n",
        max_id + 1,
        root_id,
        root_generation,
        info,
        xref_start
    ));

    out.extend_from_slice(table.as_bytes());
    Some(out)
}

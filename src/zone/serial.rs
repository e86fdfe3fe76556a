//! Serial Maintenance
//!
//! The serial is the first value line after the line holding `IN SOA`:
//!
//! ```text
//! @ IN SOA a.gtld-servers.chn. master.hostname.com. (
//!         2024010101 ; serial
//! ```
//!
//! Its leading number is bumped by one on every mutation. The line is
//! rewritten with the standard indentation and keeps its annotation.

use super::document::{Entry, ZoneDocument, AUTHORITY_INDENT, AUTHORITY_MARKER};
use super::error::{ZoneError, ZoneResult};

/// Read the current serial
pub fn current(doc: &ZoneDocument) -> ZoneResult<u32> {
    let (_, line) = serial_entry(doc)?;
    parse_serial(line).map(|(serial, _)| serial)
}

/// Increment the serial in place and return the new value
pub fn increment(doc: &mut ZoneDocument) -> ZoneResult<u32> {
    let (id, line) = serial_entry(doc)?;
    let (serial, annotation) = parse_serial(line)?;

    let next = serial.checked_add(1).ok_or(ZoneError::SerialOverflow)?;
    let rewritten = match annotation {
        Some(annotation) => format!("{}{} ;{}", AUTHORITY_INDENT, next, annotation),
        None => format!("{}{}", AUTHORITY_INDENT, next),
    };

    doc.replace(id, Entry::Raw(rewritten));
    Ok(next)
}

fn serial_entry(doc: &ZoneDocument) -> ZoneResult<(usize, &str)> {
    let authority = doc
        .authority()
        .ok_or_else(|| ZoneError::MarkerNotFound(AUTHORITY_MARKER.to_string()))?;
    let id = doc
        .next(authority)
        .ok_or_else(|| ZoneError::MarkerNotFound("serial after authority marker".to_string()))?;
    let line = doc
        .get(id)
        .map(|entry| entry.line())
        .ok_or_else(|| ZoneError::MarkerNotFound("serial after authority marker".to_string()))?;
    Ok((id, line))
}

/// Split a serial line into its number and the text after `;`
fn parse_serial(line: &str) -> ZoneResult<(u32, Option<&str>)> {
    let (value, annotation) = match line.split_once(';') {
        Some((value, annotation)) => (value, Some(annotation)),
        None => (line, None),
    };

    let serial = value
        .trim()
        .parse::<u32>()
        .map_err(|_| ZoneError::MarkerNotFound(format!("serial is not numeric: {}", line.trim())))?;

    Ok((serial, annotation))
}

//! Field Validation
//!
//! Pure checks applied to record fields before anything touches the zone.
//!
//! ## A9 addresses
//!
//! A9 data is an 8-segment address with segments separated by `[`. Each
//! segment is either a decimal number or a dotted-quad IPv4 address. Runs of
//! segments can be compressed: a segment written `N]rest` stands for `N`
//! elided segments followed by `rest`, so `1[2[3[4]5` expands to 8 segments.

use std::net::Ipv4Addr;

use super::error::{ZoneError, ZoneResult};

/// Number of segments in a fully expanded A9 address
pub const A9_SEGMENTS: usize = 8;

/// Separator between A9 segments
pub const A9_SEPARATOR: char = '[';

/// Marks a compressed A9 segment (`count]segment`)
pub const A9_COMPRESSION: char = ']';

/// Check that a TTL is a positive integer
pub fn check_ttl(ttl: &str) -> ZoneResult<u32> {
    match ttl.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(ZoneError::InvalidField("TTL must be greater than 0".to_string())),
        Err(_) => Err(ZoneError::InvalidField(format!("TTL is not a valid number: {}", ttl))),
    }
}

/// Check that an MX priority is a positive integer
pub fn check_priority(priority: &str) -> ZoneResult<u16> {
    match priority.parse::<u16>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(ZoneError::InvalidField("priority must be greater than 0".to_string())),
        Err(_) => Err(ZoneError::InvalidField(format!(
            "priority is not a valid number: {}",
            priority
        ))),
    }
}

/// Check that data is a dotted-quad IPv4 address
pub fn check_ipv4(data: &str) -> ZoneResult<Ipv4Addr> {
    data.parse::<Ipv4Addr>()
        .map_err(|_| ZoneError::InvalidField(format!("data is not a valid IPv4 address: {}", data)))
}

/// Check that data is a well-formed A9 address
pub fn check_custom_address(data: &str) -> ZoneResult<()> {
    if data.contains(' ') {
        return Err(invalid_a9(data, "must not contain spaces"));
    }
    if !data.contains(A9_SEPARATOR) {
        return Err(invalid_a9(data, "missing segment separator"));
    }

    let segments: Vec<&str> = data.split(A9_SEPARATOR).collect();

    if segments.len() > A9_SEGMENTS {
        return Err(invalid_a9(data, "more than 8 segments"));
    }

    if segments.len() == A9_SEGMENTS {
        for segment in &segments {
            check_segment(data, segment)?;
        }
        return Ok(());
    }

    if !data.contains(A9_COMPRESSION) {
        return Err(invalid_a9(data, "fewer than 8 segments without compression"));
    }

    let mut compressed = 0usize;
    for segment in &segments {
        let segment = match segment.split_once(A9_COMPRESSION) {
            Some((count, rest)) => {
                compressed += compression_count(data, count)?;
                rest
            }
            None => segment,
        };
        check_segment(data, segment)?;
    }

    if segments.len() + compressed != A9_SEGMENTS {
        return Err(invalid_a9(data, "segments do not expand to exactly 8"));
    }

    Ok(())
}

/// A single segment is a decimal number or a dotted-quad
fn check_segment(data: &str, segment: &str) -> ZoneResult<()> {
    if is_decimal(segment) {
        return segment
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| invalid_a9(data, "segment value out of range"));
    }
    if segment.parse::<Ipv4Addr>().is_ok() {
        return Ok(());
    }
    Err(invalid_a9(data, "segment is neither numeric nor IPv4"))
}

fn compression_count(data: &str, count: &str) -> ZoneResult<usize> {
    let value = count
        .parse::<usize>()
        .map_err(|_| invalid_a9(data, "compression count is not a number"))?;
    if !(1..=A9_SEGMENTS).contains(&value) {
        return Err(invalid_a9(data, "compression count must be between 1 and 8"));
    }
    Ok(value)
}

fn is_decimal(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn invalid_a9(data: &str, reason: &str) -> ZoneError {
    ZoneError::InvalidField(format!("data is not a valid A9 address ({}): {}", reason, data))
}

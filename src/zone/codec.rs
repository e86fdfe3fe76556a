//! Record Codec
//!
//! Converts records to and from their canonical zone file lines.
//!
//! ```text
//! www.example.chn 120 IN A 192.0.2.10
//! mail.example.chn 300 IN MX 10 mx1.example.chn
//! example.chn 120 IN NS ns1.example.chn.
//! info.example.chn 120 IN TXT "some text"
//! ```
//!
//! NS and CNAME targets are written fully qualified (trailing `.`) and read
//! back without it. TXT data is the text between the first pair of quotes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use super::document::Section;
use super::error::{ZoneError, ZoneResult};

/// Record class written on every line
pub const RECORD_CLASS: &str = "IN";

/// Token positions in a tokenized record line
const POS_NAME: usize = 0;
const POS_TTL: usize = 1;
const POS_TYPE: usize = 3;
const POS_DATA: usize = 4;
const POS_MX_DATA: usize = 5;

/// Supported record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "NS")]
    Ns,
    #[serde(rename = "MX")]
    Mx,
    #[serde(rename = "PTR")]
    Ptr,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A9")]
    A9,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::Ns,
        RecordType::Mx,
        RecordType::Ptr,
        RecordType::Cname,
        RecordType::Txt,
        RecordType::A,
        RecordType::A9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Ns => "NS",
            RecordType::Mx => "MX",
            RecordType::Ptr => "PTR",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::A => "A",
            RecordType::A9 => "A9",
        }
    }

    /// Section new records of this type are inserted into
    pub fn section(&self) -> Section {
        match self {
            RecordType::Ns => Section::Nameservers,
            RecordType::Mx => Section::Mailservers,
            RecordType::Ptr => Section::ReversePtr,
            RecordType::Cname => Section::Cname,
            RecordType::Txt => Section::Txt,
            RecordType::A | RecordType::A9 => Section::HostRecords,
        }
    }
}

impl FromStr for RecordType {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| ZoneError::UnsupportedType(s.to_string()))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific record data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// Nameserver host, stored without the trailing dot
    Ns(String),
    /// Mail exchange with its preference
    Mx { priority: u16, exchange: String },
    /// Reverse pointer target
    Ptr(String),
    /// Canonical name, stored without the trailing dot
    Cname(String),
    /// Unquoted text
    Txt(String),
    /// IPv4 host address
    A(Ipv4Addr),
    /// A9 address, kept verbatim
    A9(String),
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::Ns(_) => RecordType::Ns,
            RecordData::Mx { .. } => RecordType::Mx,
            RecordData::Ptr(_) => RecordType::Ptr,
            RecordData::Cname(_) => RecordType::Cname,
            RecordData::Txt(_) => RecordType::Txt,
            RecordData::A(_) => RecordType::A,
            RecordData::A9(_) => RecordType::A9,
        }
    }

    /// The data value as callers see it (no quotes, no trailing dot, no priority)
    pub fn value(&self) -> String {
        match self {
            RecordData::Ns(host) | RecordData::Cname(host) => host.clone(),
            RecordData::Mx { exchange, .. } => exchange.clone(),
            RecordData::Ptr(target) => target.clone(),
            RecordData::Txt(text) => text.clone(),
            RecordData::A(addr) => addr.to_string(),
            RecordData::A9(addr) => addr.clone(),
        }
    }

    pub fn priority(&self) -> Option<u16> {
        match self {
            RecordData::Mx { priority, .. } => Some(*priority),
            _ => None,
        }
    }

    /// Render the data portion of a record line
    fn encode(&self) -> String {
        match self {
            RecordData::Ns(host) | RecordData::Cname(host) => format!("{}.", host),
            RecordData::Mx { priority, exchange } => format!("{} {}", priority, exchange),
            RecordData::Ptr(target) => target.clone(),
            RecordData::Txt(text) => format!("\"{}\"", text),
            RecordData::A(addr) => addr.to_string(),
            RecordData::A9(addr) => addr.clone(),
        }
    }

    /// Parse the data portion of a tokenized record line
    fn decode(rtype: RecordType, line: &str, tokens: &[&str]) -> ZoneResult<Self> {
        let data = || {
            tokens
                .get(POS_DATA)
                .copied()
                .ok_or_else(|| ZoneError::Decode(format!("missing data field: {}", line)))
        };

        match rtype {
            RecordType::Ns => Ok(RecordData::Ns(strip_root(data()?))),
            RecordType::Cname => Ok(RecordData::Cname(strip_root(data()?))),
            RecordType::Ptr => Ok(RecordData::Ptr(data()?.to_string())),
            RecordType::A9 => Ok(RecordData::A9(data()?.to_string())),
            RecordType::A => data()?
                .parse::<Ipv4Addr>()
                .map(RecordData::A)
                .map_err(|_| ZoneError::Decode(format!("invalid A address: {}", line))),
            RecordType::Mx => {
                let priority = data()?
                    .parse::<u16>()
                    .map_err(|_| ZoneError::Decode(format!("invalid MX priority: {}", line)))?;
                let exchange = tokens
                    .get(POS_MX_DATA)
                    .ok_or_else(|| ZoneError::Decode(format!("missing MX exchange: {}", line)))?;
                Ok(RecordData::Mx {
                    priority,
                    exchange: exchange.to_string(),
                })
            }
            RecordType::Txt => quoted_text(line)
                .map(|text| RecordData::Txt(text.to_string()))
                .ok_or_else(|| ZoneError::Decode(format!("TXT data is not quoted: {}", line))),
        }
    }
}

/// A single resource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
}

impl Record {
    pub fn new(name: impl Into<String>, ttl: u32, data: RecordData) -> Self {
        Self {
            name: name.into(),
            ttl,
            data,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    /// Render the canonical zone file line
    pub fn encode(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.name,
            self.ttl,
            RECORD_CLASS,
            self.record_type(),
            self.data.encode()
        )
    }

    /// Parse a record line
    ///
    /// Markers, comments and blank lines must be filtered out by the caller.
    pub fn decode(line: &str) -> ZoneResult<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() <= POS_DATA {
            return Err(ZoneError::Decode(format!("too few fields: {}", line)));
        }

        let rtype = tokens[POS_TYPE]
            .parse::<RecordType>()
            .map_err(|_| ZoneError::Decode(format!("unsupported type {}: {}", tokens[POS_TYPE], line)))?;

        let ttl = tokens[POS_TTL]
            .parse::<u32>()
            .map_err(|_| ZoneError::Decode(format!("invalid TTL: {}", line)))?;

        Ok(Self {
            name: tokens[POS_NAME].to_string(),
            ttl,
            data: RecordData::decode(rtype, line, &tokens)?,
        })
    }

    /// Equality rule used for duplicate detection, deletion and exact queries
    ///
    /// Name and type must match and the data values must be equal; TTL and
    /// MX priority are not compared. Data is compared in decoded form on
    /// purpose, so NS and CNAME targets match with or without their root dot
    /// and no two stored records can differ only by that dot.
    pub fn matches(&self, name: &str, rtype: RecordType, data: &str) -> bool {
        self.name == name && self.record_type() == rtype && self.data.value() == data
    }

    /// True if `other` would be a duplicate of this record
    pub fn is_duplicate_of(&self, other: &Record) -> bool {
        self.matches(&other.name, other.record_type(), &other.data.value())
    }
}

fn strip_root(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_string()
}

/// Text between the first pair of double quotes on the line
fn quoted_text(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}

//! Record Queries
//!
//! Scans the record lines from the Nameservers marker onward, decodes each
//! one and keeps those matching the filter, in document order.

use tracing::warn;

use super::codec::{Record, RecordType};
use super::document::ZoneDocument;

/// Conjunctive filter over record type, name and data
///
/// An empty filter matches every record. Data is compared with the same
/// rule used for duplicate detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub record_type: Option<RecordType>,
    pub domain_name: Option<String>,
    pub data: Option<String>,
}

impl QueryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_type(record_type: RecordType) -> Self {
        Self {
            record_type: Some(record_type),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.domain_name = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(rtype) = self.record_type {
            if record.record_type() != rtype {
                return false;
            }
        }
        if let Some(name) = &self.domain_name {
            if &record.name != name {
                return false;
            }
        }
        if let Some(data) = &self.data {
            if &record.data.value() != data {
                return false;
            }
        }
        true
    }
}

/// Decoded records from the Nameservers marker onward
///
/// Lines that fail to decode are skipped.
pub fn records(doc: &ZoneDocument) -> impl Iterator<Item = (usize, Record)> + '_ {
    doc.record_lines().filter_map(|(id, line)| match Record::decode(line) {
        Ok(record) => Some((id, record)),
        Err(e) => {
            warn!("Skipping undecodable record line: {}", e);
            None
        }
    })
}

/// Run a query against a document
pub fn run(doc: &ZoneDocument, filter: &QueryFilter) -> Vec<Record> {
    records(doc)
        .map(|(_, record)| record)
        .filter(|record| filter.matches(record))
        .collect()
}

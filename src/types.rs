//! Request and response envelopes
//!
//! These types define the JSON exchanged with API clients. Record fields are
//! strings on the wire, matching the zone file representation; numeric TTL
//! and priority values are accepted too.

use serde::{Deserialize, Serialize};

use crate::zone::{QueryFilter, Record, RecordType, ZoneError, ZoneResult};

/// Helper module accepting either a JSON string or a number for a string field
mod lenient_string {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<StringOrNumber> = Option::deserialize(deserializer)?;
        Ok(match value {
            Some(StringOrNumber::String(s)) => s,
            Some(StringOrNumber::Number(n)) => n.to_string(),
            None => String::new(),
        })
    }
}

// =============================================================================
// RECORD ENVELOPE
// =============================================================================

/// A record as sent by and returned to API clients
///
/// Used for Add, Delete and as the Query filter. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DnsRecord {
    pub domain_name: String,

    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient_string::deserialize")]
    pub ttl: String,

    #[serde(rename = "type")]
    pub record_type: String,

    /// Only meaningful for MX records
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient_string::deserialize")]
    pub priority: String,

    pub data: String,
}

impl DnsRecord {
    /// Copy with every field trimmed
    pub fn trimmed(&self) -> Self {
        Self {
            domain_name: self.domain_name.trim().to_string(),
            ttl: self.ttl.trim().to_string(),
            record_type: self.record_type.trim().to_string(),
            priority: self.priority.trim().to_string(),
            data: self.data.trim().to_string(),
        }
    }

    /// Interpret this envelope as a query filter
    ///
    /// Empty fields are not filtered on; TTL and priority are ignored.
    pub fn to_filter(&self) -> ZoneResult<QueryFilter> {
        let req = self.trimmed();
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

        let record_type = match non_empty(req.record_type) {
            Some(t) => Some(t.parse::<RecordType>()?),
            None => None,
        };

        Ok(QueryFilter {
            record_type,
            domain_name: non_empty(req.domain_name),
            data: non_empty(req.data),
        })
    }

    /// Parse a JSON request body
    pub fn from_json(body: &str) -> ZoneResult<Self> {
        serde_json::from_str(body).map_err(|e| ZoneError::Decode(e.to_string()))
    }
}

impl From<&Record> for DnsRecord {
    fn from(record: &Record) -> Self {
        Self {
            domain_name: record.name.clone(),
            ttl: record.ttl.to_string(),
            record_type: record.record_type().to_string(),
            priority: record
                .data
                .priority()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            data: record.data.value(),
        }
    }
}

// =============================================================================
// API RESPONSES
// =============================================================================

/// Response to mutations and service commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub msg: String,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self::message("ok")
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            success: true,
            msg: msg.into(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
        }
    }
}

/// Response to record queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    pub msg: String,
    pub total_count: usize,
    pub record_list_json: Vec<DnsRecord>,
}

impl QueryResponse {
    pub fn new(records: &[Record]) -> Self {
        Self {
            success: true,
            msg: "ok".to_string(),
            total_count: records.len(),
            record_list_json: records.iter().map(DnsRecord::from).collect(),
        }
    }
}

//! Zone Engine Errors
//!
//! Field, type, conflict and lookup errors are raised before the document is
//! touched. Structural and I/O errors can surface after the in-memory
//! document has already changed; they are reported, not rolled back.

use super::document::Section;

/// Errors produced by the zone engine
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Unsupported record type: {0}")]
    UnsupportedType(String),

    #[error("A matching record already exists")]
    Conflict,

    #[error("No matching record found")]
    NotFound,

    #[error("Section marker not found: {0}")]
    SectionNotFound(Section),

    #[error("Marker not found: {0}")]
    MarkerNotFound(String),

    #[error("Serial would overflow")]
    SerialOverflow,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZoneError {
    /// True for errors that indicate a corrupted document rather than bad input
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ZoneError::SectionNotFound(_) | ZoneError::MarkerNotFound(_) | ZoneError::SerialOverflow
        )
    }

    /// True for errors caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ZoneError::InvalidField(_)
                | ZoneError::UnsupportedType(_)
                | ZoneError::Conflict
                | ZoneError::NotFound
                | ZoneError::Decode(_)
        )
    }
}

pub type ZoneResult<T> = Result<T, ZoneError>;

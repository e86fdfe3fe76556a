//! Zone Engine Module
//!
//! Owns the zone file. The document keeps every line of the file in order;
//! records are decoded from it on demand and written back in place.
//!
//! ## Flow
//!
//! ```text
//! Request ─▶ validator ─▶ duplicate/lookup ─▶ document ─▶ serial ─▶ persist
//! ```

pub mod codec;
pub mod document;
pub mod engine;
pub mod error;
pub mod persist;
pub mod query;
pub mod serial;
pub mod validator;

pub use codec::{Record, RecordData, RecordType};
pub use document::{Section, Skeleton, ZoneDocument};
pub use engine::ZoneEngine;
pub use error::{ZoneError, ZoneResult};
pub use persist::ZoneFile;
pub use query::QueryFilter;

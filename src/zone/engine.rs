//! Zone Engine
//!
//! Single entry point for reading and changing the zone. Every mutation runs
//! the same pipeline under the engine's write lock:
//!
//! 1. Validate the request (no side effects on failure)
//! 2. Check for a duplicate / locate the record to delete
//! 3. Change the document
//! 4. Bump the serial
//! 5. Rewrite the zone file
//!
//! Failures in steps 4 and 5 leave the in-memory document changed; they are
//! reported to the caller without rollback.

use std::path::Path;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::types::DnsRecord;

use super::codec::{Record, RecordData, RecordType};
use super::document::{Section, Skeleton, ZoneDocument};
use super::error::{ZoneError, ZoneResult};
use super::persist::ZoneFile;
use super::query::{self, QueryFilter};
use super::serial;
use super::validator;

/// Identifies the record a delete request refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub name: String,
    pub record_type: RecordType,
    pub data: String,
}

/// The zone engine
///
/// Holds the runtime document behind a lock so that mutations are serialized
/// and queries never observe a half-applied change.
pub struct ZoneEngine {
    /// Backing zone file
    file: ZoneFile,

    /// Runtime document
    document: RwLock<ZoneDocument>,

    /// Default skeleton, never persisted by the engine
    skeleton: ZoneDocument,
}

impl ZoneEngine {
    /// Load the zone file, optionally creating it from the skeleton
    pub async fn open(file: ZoneFile, skeleton: &Skeleton, create_if_missing: bool) -> ZoneResult<Self> {
        let skeleton = skeleton.to_document();

        let document = if create_if_missing && !file.exists().await? {
            warn!("Zone file {:?} not found, creating it from the default skeleton", file.path());
            file.save(&skeleton).await?;
            skeleton.clone()
        } else {
            file.load().await?
        };

        check_structure(&document);
        info!("📖 Zone loaded from {:?}: {} lines", file.path(), document.len());

        Ok(Self::with_document(file, document, skeleton))
    }

    /// Build an engine around an already loaded document
    pub fn with_document(file: ZoneFile, document: ZoneDocument, skeleton: ZoneDocument) -> Self {
        Self {
            file,
            document: RwLock::new(document),
            skeleton,
        }
    }

    /// Add a record; returns the new serial
    pub async fn add(&self, request: &DnsRecord) -> ZoneResult<u32> {
        let record = validate_add(request)?;

        let mut document = self.document.write().await;
        let serial = apply_add(&mut document, &record)?;
        self.file.save(&document).await?;

        info!("➕ Added {} (serial {})", record.encode(), serial);
        Ok(serial)
    }

    /// Delete the first matching record; returns the new serial
    pub async fn delete(&self, request: &DnsRecord) -> ZoneResult<u32> {
        let key = validate_delete(request)?;

        let mut document = self.document.write().await;
        let (removed, serial) = apply_delete(&mut document, &key)?;
        self.file.save(&document).await?;

        info!("➖ Deleted {} (serial {})", removed, serial);
        Ok(serial)
    }

    /// Records matching a filter, in document order
    pub async fn query(&self, filter: &QueryFilter) -> Vec<Record> {
        let document = self.document.read().await;
        query::run(&document, filter)
    }

    /// Current serial
    pub async fn serial(&self) -> ZoneResult<u32> {
        let document = self.document.read().await;
        serial::current(&document)
    }

    /// Number of decodable records
    pub async fn record_count(&self) -> usize {
        let document = self.document.read().await;
        query::records(&document).count()
    }

    /// Current zone file content as it was last written
    pub async fn render(&self) -> String {
        self.document.read().await.render()
    }

    /// The default skeleton document
    pub fn skeleton(&self) -> &ZoneDocument {
        &self.skeleton
    }

    pub fn zone_file(&self) -> &Path {
        self.file.path()
    }
}

/// Validate an add request and build the record
pub fn validate_add(request: &DnsRecord) -> ZoneResult<Record> {
    let req = request.trimmed();

    if req.domain_name.is_empty() || req.ttl.is_empty() || req.record_type.is_empty() || req.data.is_empty() {
        return Err(ZoneError::InvalidField(
            "domainName, ttl, type and data are required".to_string(),
        ));
    }
    if req.record_type == RecordType::Mx.as_str() && req.priority.is_empty() {
        return Err(ZoneError::InvalidField("priority is required for MX records".to_string()));
    }

    let record_type = req.record_type.parse::<RecordType>()?;
    let ttl = validator::check_ttl(&req.ttl)?;
    check_owner_name(&req.domain_name)?;

    if record_type != RecordType::Txt {
        check_no_whitespace("data", &req.data)?;
    }

    let data = match record_type {
        RecordType::Ns => RecordData::Ns(relative_target(req.data)),
        RecordType::Mx => RecordData::Mx {
            priority: validator::check_priority(&req.priority)?,
            exchange: req.data,
        },
        RecordType::Ptr => RecordData::Ptr(req.data),
        RecordType::Cname => RecordData::Cname(relative_target(req.data)),
        RecordType::Txt => {
            if req.data.contains('"') {
                return Err(ZoneError::InvalidField("TXT data must not contain quotes".to_string()));
            }
            if req.data.chars().any(char::is_control) {
                return Err(ZoneError::InvalidField(
                    "TXT data must not contain control characters".to_string(),
                ));
            }
            RecordData::Txt(req.data)
        }
        RecordType::A => RecordData::A(validator::check_ipv4(&req.data)?),
        RecordType::A9 => {
            validator::check_custom_address(&req.data)?;
            RecordData::A9(req.data)
        }
    };

    Ok(Record::new(req.domain_name, ttl, data))
}

/// Validate a delete request
pub fn validate_delete(request: &DnsRecord) -> ZoneResult<RecordKey> {
    let req = request.trimmed();

    if req.domain_name.is_empty() || req.record_type.is_empty() || req.data.is_empty() {
        return Err(ZoneError::InvalidField(
            "domainName, type and data are required".to_string(),
        ));
    }

    let record_type = req.record_type.parse::<RecordType>()?;
    let data = match record_type {
        RecordType::Ns | RecordType::Cname => relative_target(req.data),
        _ => req.data,
    };

    Ok(RecordKey {
        name: req.domain_name,
        record_type,
        data,
    })
}

/// Insert a validated record and bump the serial
pub fn apply_add(document: &mut ZoneDocument, record: &Record) -> ZoneResult<u32> {
    if query::records(document).any(|(_, existing)| existing.is_duplicate_of(record)) {
        return Err(ZoneError::Conflict);
    }

    document.insert_record(record.record_type().section(), record.encode())?;
    serial::increment(document)
}

/// Remove the first record matching `key` and bump the serial
///
/// Returns the removed line and the new serial.
pub fn apply_delete(document: &mut ZoneDocument, key: &RecordKey) -> ZoneResult<(String, u32)> {
    let id = query::records(document)
        .find(|(_, record)| record.matches(&key.name, key.record_type, &key.data))
        .map(|(id, _)| id)
        .ok_or(ZoneError::NotFound)?;

    let removed = document
        .remove(id)
        .map(|entry| entry.line().to_string())
        .ok_or(ZoneError::NotFound)?;

    let serial = serial::increment(document)?;
    Ok((removed, serial))
}

/// NS and CNAME targets are stored without the root dot
fn relative_target(target: String) -> String {
    match target.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => target,
    }
}

/// A name must read back as the first token of a record line
///
/// Lines starting with `;` or `$` are comments and directives, and a `"`
/// would be taken for the start of TXT data.
fn check_owner_name(name: &str) -> ZoneResult<()> {
    check_no_whitespace("domainName", name)?;
    if name.starts_with(';') || name.starts_with('$') {
        return Err(ZoneError::InvalidField(
            "domainName must not start with ';' or '$'".to_string(),
        ));
    }
    if name.contains('"') || name.chars().any(char::is_control) {
        return Err(ZoneError::InvalidField(
            "domainName must not contain quotes or control characters".to_string(),
        ));
    }
    Ok(())
}

fn check_no_whitespace(field: &str, value: &str) -> ZoneResult<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(ZoneError::InvalidField(format!("{} must not contain whitespace", field)));
    }
    Ok(())
}

/// Warn about structural problems in a freshly loaded zone
fn check_structure(document: &ZoneDocument) {
    for section in Section::ALL {
        if document.section(section).is_none() {
            warn!("Zone has no '{}' section marker; adds of that type will fail", section);
        }
    }
    if let Err(e) = serial::current(document) {
        warn!("Zone serial is unusable, mutations will fail: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn empty_skeleton() -> Skeleton {
        Skeleton {
            serial: Some(2024010101),
            nameservers: vec![],
            ..Skeleton::default()
        }
    }

    async fn create_engine(skeleton: Skeleton) -> (TempDir, ZoneEngine) {
        let dir = tempdir().unwrap();
        let file = ZoneFile::new(dir.path().join("chn.zone"));
        let engine = ZoneEngine::open(file, &skeleton, true).await.unwrap();
        (dir, engine)
    }

    fn request(name: &str, ttl: &str, rtype: &str, priority: &str, data: &str) -> DnsRecord {
        DnsRecord {
            domain_name: name.to_string(),
            ttl: ttl.to_string(),
            record_type: rtype.to_string(),
            priority: priority.to_string(),
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_zone_query() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        assert!(engine.query(&QueryFilter::all()).await.is_empty());
        assert_eq!(engine.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_a_record_and_query() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;

        let serial = engine
            .add(&request("www.example.chn", "120", "A", "", "192.0.2.10"))
            .await
            .unwrap();
        assert_eq!(serial, 2024010102);

        let found = engine.query(&QueryFilter::by_type(RecordType::A)).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data.value(), "192.0.2.10");

        let exact = QueryFilter::by_type(RecordType::A)
            .with_name("www.example.chn")
            .with_data("192.0.2.10");
        assert_eq!(engine.query(&exact).await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_persists_to_disk() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        engine
            .add(&request("www.example.chn", "120", "A", "", "192.0.2.10"))
            .await
            .unwrap();

        let on_disk = tokio::fs::read_to_string(engine.zone_file()).await.unwrap();
        assert!(on_disk.contains("; HOST RECORDS\nwww.example.chn 120 IN A 192.0.2.10\n"));
        assert!(on_disk.contains("2024010102 ; serial"));
        assert_eq!(on_disk, engine.render().await);
    }

    #[tokio::test]
    async fn test_duplicate_add_conflicts() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        let req = request("mail.example.chn", "300", "MX", "10", "mx1.example.chn");

        engine.add(&req).await.unwrap();
        let serial = engine.serial().await.unwrap();

        let again = request("mail.example.chn", "60", "MX", "20", "mx1.example.chn");
        assert!(matches!(engine.add(&again).await, Err(ZoneError::Conflict)));
        assert_eq!(engine.serial().await.unwrap(), serial);
    }

    #[tokio::test]
    async fn test_mx_requires_priority() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        let before = engine.render().await;

        let result = engine
            .add(&request("mail.example.chn", "300", "MX", "", "mx1.example.chn"))
            .await;
        assert!(matches!(result, Err(ZoneError::InvalidField(_))));
        assert_eq!(engine.render().await, before);
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        let before = engine.render().await;

        let result = engine
            .delete(&request("www.example.chn", "", "A", "", "192.0.2.10"))
            .await;
        assert!(matches!(result, Err(ZoneError::NotFound)));
        assert_eq!(engine.render().await, before);
    }

    #[tokio::test]
    async fn test_add_then_delete_restores_records() {
        let (_dir, engine) = create_engine(Skeleton {
            serial: Some(100),
            ..Skeleton::default()
        })
        .await;

        let before = engine.query(&QueryFilter::all()).await;

        let requests = [
            request("example.chn", "120", "NS", "", "ns1.example.chn"),
            request("mail.example.chn", "300", "MX", "5", "mx1.example.chn"),
            request("10.2.0.192.in-addr.arpa", "120", "PTR", "", "www.example.chn."),
            request("ftp.example.chn", "120", "CNAME", "", "www.example.chn"),
            request("info.example.chn", "120", "TXT", "", "v=spf1 include:example.chn -all"),
            request("www.example.chn", "120", "A", "", "192.0.2.10"),
            request("v9.example.chn", "120", "A9", "", "86[10[1[4]5"),
        ];

        for req in &requests {
            engine.add(req).await.unwrap();
        }
        assert_eq!(engine.record_count().await, before.len() + requests.len());

        for req in &requests {
            engine.delete(req).await.unwrap();
        }

        assert_eq!(engine.query(&QueryFilter::all()).await, before);
        assert_eq!(engine.serial().await.unwrap(), 100 + 2 * requests.len() as u32);
    }

    #[tokio::test]
    async fn test_newest_record_is_nearest_marker() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        engine.add(&request("a.example.chn", "120", "A", "", "192.0.2.1")).await.unwrap();
        engine.add(&request("b.example.chn", "120", "A9", "", "1[2[3[4[5[6[7[8")).await.unwrap();

        let hosts: Vec<String> = engine
            .query(&QueryFilter::all())
            .await
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(hosts, vec!["b.example.chn", "a.example.chn"]);
    }

    #[tokio::test]
    async fn test_delete_removes_first_match_only() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        let mut document = engine.document.write().await;
        document
            .insert_record(Section::HostRecords, "www.example.chn 60 IN A 192.0.2.10".to_string())
            .unwrap();
        document
            .insert_record(Section::HostRecords, "www.example.chn 120 IN A 192.0.2.10".to_string())
            .unwrap();
        drop(document);

        engine
            .delete(&request("www.example.chn", "", "A", "", "192.0.2.10"))
            .await
            .unwrap();

        let left = engine.query(&QueryFilter::by_type(RecordType::A)).await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].ttl, 60);
    }

    #[tokio::test]
    async fn test_open_missing_file_without_create() {
        let dir = tempdir().unwrap();
        let file = ZoneFile::new(dir.path().join("chn.zone"));
        let result = ZoneEngine::open(file, &empty_skeleton(), false).await;
        assert!(matches!(result, Err(ZoneError::Io(_))));
    }

    #[tokio::test]
    async fn test_open_existing_file_keeps_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chn.zone");
        let text = empty_skeleton().to_document().render()
            .replace("; TXT\n", "; TXT\ninfo.example.chn 120 IN TXT \"kept\"\n");
        tokio::fs::write(&path, &text).await.unwrap();

        let engine = ZoneEngine::open(ZoneFile::new(&path), &Skeleton::default(), true)
            .await
            .unwrap();
        assert_eq!(engine.render().await, text);
        assert_eq!(engine.record_count().await, 1);
        // The skeleton is independent of the runtime document
        assert_eq!(query::run(engine.skeleton(), &QueryFilter::all()).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_section_fails_without_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chn.zone");
        let text = "@ IN SOA a.chn. b.chn. (\n\t\t\t1 ; serial\n\t)\n; Nameservers\n\n";
        tokio::fs::write(&path, text).await.unwrap();

        let engine = ZoneEngine::open(ZoneFile::new(&path), &empty_skeleton(), false)
            .await
            .unwrap();
        let result = engine.add(&request("t.example.chn", "120", "TXT", "", "x")).await;
        assert!(matches!(result, Err(ZoneError::SectionNotFound(Section::Txt))));
        assert_eq!(engine.render().await, text);
    }

    #[test]
    fn test_validate_add_errors() {
        let cases = [
            (request("", "120", "A", "", "192.0.2.1"), "empty name"),
            (request("www", "", "A", "", "192.0.2.1"), "empty ttl"),
            (request("www", "0", "A", "", "192.0.2.1"), "zero ttl"),
            (request("www", "120", "A", "", "300.0.2.1"), "bad ipv4"),
            (request("www", "120", "A9", "", "1[2[3"), "bad a9"),
            (request("www", "120", "MX", "0", "mx"), "zero priority"),
            (request("w w", "120", "A", "", "192.0.2.1"), "space in name"),
            (request("www", "120", "CNAME", "", "a b"), "space in data"),
            (request("www", "120", "TXT", "", "say \"hi\""), "quote in txt"),
            (request("t", "120", "TXT", "", "line1\nline2"), "newline in txt"),
            (request("t", "120", "TXT", "", "line1\rline2"), "carriage return in txt"),
            (request("t", "120", "TXT", "", "bell\u{7}"), "control char in txt"),
            (request(";www", "120", "A", "", "192.0.2.1"), "comment name"),
            (request("$www", "120", "A", "", "192.0.2.1"), "directive name"),
            (request("a\"b", "120", "TXT", "", "hello"), "quote in name"),
            (request("a\u{0}b", "120", "A", "", "192.0.2.1"), "control char in name"),
        ];

        for (req, label) in cases {
            assert!(
                matches!(validate_add(&req), Err(ZoneError::InvalidField(_))),
                "expected InvalidField for {}",
                label
            );
        }

        assert!(matches!(
            validate_add(&request("www", "120", "AAAA", "", "::1")),
            Err(ZoneError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_validate_add_trims_fields() {
        let record = validate_add(&request(" www.example.chn ", " 120", "A ", "", " 192.0.2.10 ")).unwrap();
        assert_eq!(record.encode(), "www.example.chn 120 IN A 192.0.2.10");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chn.zone");
        let engine = ZoneEngine::open(ZoneFile::new(&path), &empty_skeleton(), true)
            .await
            .unwrap();

        let requests = [
            request("example.chn", "120", "NS", "", "ns1.example.chn."),
            request("mail.example.chn", "300", "MX", "5", "mx1.example.chn"),
            request("10.2.0.192.in-addr.arpa", "120", "PTR", "", "www.example.chn."),
            request("ftp.example.chn", "120", "CNAME", "", "www.example.chn"),
            request("info.example.chn", "120", "TXT", "", "v=spf1 include:example.chn -all"),
            request("www.example.chn", "120", "A", "", "192.0.2.10"),
            request("v9.example.chn", "120", "A9", "", "86[6]1"),
        ];
        for req in &requests {
            engine.add(req).await.unwrap();
        }

        let rejected = [
            request("t.example.chn", "120", "TXT", "", "line1\nwww.example.chn 120 IN A 192.0.2.66"),
            request(";www.example.chn", "120", "A", "", "192.0.2.1"),
            request("a\"b.example.chn", "120", "TXT", "", "hello"),
        ];
        for req in &rejected {
            assert!(matches!(engine.add(req).await, Err(ZoneError::InvalidField(_))));
        }

        let in_memory = engine.query(&QueryFilter::all()).await;
        assert_eq!(in_memory.len(), requests.len());

        let reopened = ZoneEngine::open(ZoneFile::new(&path), &empty_skeleton(), false)
            .await
            .unwrap();
        assert_eq!(reopened.query(&QueryFilter::all()).await, in_memory);
        assert_eq!(reopened.serial().await.unwrap(), engine.serial().await.unwrap());
    }

    #[tokio::test]
    async fn test_trailing_dot_is_same_target() {
        let (_dir, engine) = create_engine(empty_skeleton()).await;
        engine
            .add(&request("ftp.example.chn", "120", "CNAME", "", "www.example.chn."))
            .await
            .unwrap();

        let dotless = request("ftp.example.chn", "120", "CNAME", "", "www.example.chn");
        assert!(matches!(engine.add(&dotless).await, Err(ZoneError::Conflict)));
        assert!(engine.render().await.contains("ftp.example.chn 120 IN CNAME www.example.chn.\n"));

        engine.delete(&dotless).await.unwrap();
        assert_eq!(engine.record_count().await, 0);
    }

    #[test]
    fn test_validate_delete() {
        let key = validate_delete(&request("mail.example.chn", "", "MX", "", "mx1.example.chn")).unwrap();
        assert_eq!(key.record_type, RecordType::Mx);

        assert!(matches!(
            validate_delete(&request("mail.example.chn", "", "MX", "", "")),
            Err(ZoneError::InvalidField(_))
        ));
        assert!(matches!(
            validate_delete(&request("x", "", "SRV", "", "y")),
            Err(ZoneError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_apply_add_serial_failure_keeps_insert() {
        let mut document = ZoneDocument::parse("; Nameservers\n; HOST RECORDS\n");
        let record = validate_add(&request("www", "120", "A", "", "192.0.2.1")).unwrap();

        assert!(matches!(apply_add(&mut document, &record), Err(ZoneError::MarkerNotFound(_))));
        assert_eq!(query::records(&document).count(), 1);
    }
}

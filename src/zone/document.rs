//! Zone Document
//!
//! Ordered in-memory form of the zone file. Every line is an entry; entries
//! live in an arena and are chained into document order, so inserting after a
//! known entry or removing one is O(1). A side table maps each section to its
//! marker entry and remembers where the authority block starts.
//!
//! ```text
//! $ORIGIN chn.                        Raw
//! $TTL 120                            Raw
//! @ IN SOA ... (                      Raw   <- authority marker
//!         2024010101 ; serial         Raw   <- serial
//!         ...
//! ; Nameservers                       Marker(Nameservers)
//! @ 120 IN NS a.gtld-servers.chn.     Record
//!                                     Raw
//! ; Mailservers                       Marker(Mailservers)
//! ...
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::codec::{Record, RecordData};
use super::error::{ZoneError, ZoneResult};

/// Token identifying the line that opens the authority block
pub const AUTHORITY_MARKER: &str = "IN SOA";

/// Indentation used for the lines inside the authority block
pub const AUTHORITY_INDENT: &str = "\t\t\t";

/// Regions of the zone file, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Nameservers,
    Mailservers,
    ReversePtr,
    Cname,
    Txt,
    HostRecords,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Nameservers,
        Section::Mailservers,
        Section::ReversePtr,
        Section::Cname,
        Section::Txt,
        Section::HostRecords,
    ];

    /// The comment line that opens this section
    pub fn marker(&self) -> &'static str {
        match self {
            Section::Nameservers => "; Nameservers",
            Section::Mailservers => "; Mailservers",
            Section::ReversePtr => "; Reverse DNS Records (PTR)",
            Section::Cname => "; CNAME",
            Section::Txt => "; TXT",
            Section::HostRecords => "; HOST RECORDS",
        }
    }

    /// Recognize a marker line, ignoring trailing whitespace
    pub fn from_marker(line: &str) -> Option<Section> {
        let line = line.trim_end();
        Section::ALL.iter().find(|s| s.marker() == line).copied()
    }

    fn slot(&self) -> usize {
        match self {
            Section::Nameservers => 0,
            Section::Mailservers => 1,
            Section::ReversePtr => 2,
            Section::Cname => 3,
            Section::Txt => 4,
            Section::HostRecords => 5,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// One line of the zone file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Directives, comments, blank lines and the authority block
    Raw(String),
    /// A section marker comment
    Marker { section: Section, line: String },
    /// A record line, decoded on demand
    Record(String),
}

impl Entry {
    pub fn line(&self) -> &str {
        match self {
            Entry::Raw(line) | Entry::Record(line) => line,
            Entry::Marker { line, .. } => line,
        }
    }

    pub fn record_line(&self) -> Option<&str> {
        match self {
            Entry::Record(line) => Some(line),
            _ => None,
        }
    }

    /// Classify a line read from disk
    ///
    /// Record lines are only recognized once the first section has been seen;
    /// everything above it belongs to the header and authority block.
    fn classify(line: &str, in_sections: bool) -> Entry {
        if let Some(section) = Section::from_marker(line) {
            return Entry::Marker {
                section,
                line: line.to_string(),
            };
        }

        let trimmed = line.trim();
        if !in_sections || trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('$') {
            Entry::Raw(line.to_string())
        } else {
            Entry::Record(line.to_string())
        }
    }
}

/// Handle to an entry in a document
pub type EntryId = usize;

#[derive(Debug, Clone)]
struct Node {
    entry: Entry,
    prev: Option<EntryId>,
    next: Option<EntryId>,
}

/// The whole zone file as an ordered sequence of entries
#[derive(Debug, Clone, Default)]
pub struct ZoneDocument {
    nodes: Vec<Option<Node>>,
    free: Vec<EntryId>,
    head: Option<EntryId>,
    tail: Option<EntryId>,
    len: usize,
    sections: [Option<EntryId>; 6],
    authority: Option<EntryId>,
}

impl ZoneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from zone file text
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::new();
        let mut in_sections = false;

        for line in text.lines() {
            let entry = Entry::classify(line, in_sections);
            if matches!(entry, Entry::Marker { .. }) {
                in_sections = true;
            }
            doc.push_back(entry);
        }

        doc
    }

    /// Render the document back to zone file text
    pub fn render(&self) -> String {
        let mut output = String::new();
        for (_, entry) in self.iter() {
            output.push_str(entry.line());
            output.push('\n');
        }
        output
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.node(id).map(|n| &n.entry)
    }

    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        self.node(id).and_then(|n| n.next)
    }

    /// Marker entry of a section
    pub fn section(&self, section: Section) -> Option<EntryId> {
        self.sections[section.slot()]
    }

    /// Line opening the authority block
    pub fn authority(&self) -> Option<EntryId> {
        self.authority
    }

    /// Append an entry at the end of the document
    pub fn push_back(&mut self, entry: Entry) -> EntryId {
        let id = self.alloc(entry, self.tail, None);
        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Insert an entry directly after `after`
    pub fn insert_after(&mut self, after: EntryId, entry: Entry) -> Option<EntryId> {
        let next = self.node(after)?.next;
        let id = self.alloc(entry, Some(after), next);
        self.node_mut(after).next = Some(id);
        match next {
            Some(next) => self.node_mut(next).prev = Some(id),
            None => self.tail = Some(id),
        }
        Some(id)
    }

    /// Insert a record line directly after a section's marker
    pub fn insert_record(&mut self, section: Section, line: String) -> ZoneResult<EntryId> {
        let marker = self
            .section(section)
            .ok_or(ZoneError::SectionNotFound(section))?;
        self.insert_after(marker, Entry::Record(line))
            .ok_or(ZoneError::SectionNotFound(section))
    }

    /// Replace the content of an entry in place
    pub fn replace(&mut self, id: EntryId, entry: Entry) -> Option<Entry> {
        let node = self.nodes.get_mut(id)?.as_mut()?;
        let old = std::mem::replace(&mut node.entry, entry);
        self.unindex(id, &old);
        self.index(id);
        Some(old)
    }

    /// Remove an entry from the document
    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let node = self.nodes.get_mut(id)?.take()?;

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        self.unindex(id, &node.entry);
        self.free.push(id);
        self.len -= 1;
        Some(node.entry)
    }

    /// All entries in document order
    pub fn iter(&self) -> Entries<'_> {
        Entries {
            doc: self,
            cursor: self.head,
        }
    }

    /// Entries in document order, starting at `id`
    pub fn iter_from(&self, id: EntryId) -> Entries<'_> {
        Entries {
            doc: self,
            cursor: self.node(id).map(|_| id),
        }
    }

    /// Record lines from the Nameservers marker onward
    ///
    /// The header and authority block are never part of this view. A document
    /// without a Nameservers marker has no records.
    pub fn record_lines(&self) -> impl Iterator<Item = (EntryId, &str)> + '_ {
        let cursor = self.section(Section::Nameservers);
        Entries { doc: self, cursor }.filter_map(|(id, entry)| entry.record_line().map(|line| (id, line)))
    }

    fn alloc(&mut self, entry: Entry, prev: Option<EntryId>, next: Option<EntryId>) -> EntryId {
        let node = Node { entry, prev, next };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.len += 1;
        self.index(id);
        id
    }

    /// Record marker and authority positions for a new entry
    fn index(&mut self, id: EntryId) {
        let (section, is_authority) = match self.get(id) {
            Some(Entry::Marker { section, .. }) => (Some(*section), false),
            Some(Entry::Raw(line)) => (None, line.contains(AUTHORITY_MARKER)),
            _ => (None, false),
        };

        if let Some(section) = section {
            let slot = section.slot();
            if self.sections[slot].map_or(true, |existing| self.comes_before(id, existing)) {
                self.sections[slot] = Some(id);
            }
        }

        if is_authority && self.authority.map_or(true, |existing| self.comes_before(id, existing)) {
            self.authority = Some(id);
        }
    }

    fn unindex(&mut self, id: EntryId, entry: &Entry) {
        match entry {
            Entry::Marker { section, .. } if self.sections[section.slot()] == Some(id) => {
                let section = *section;
                self.sections[section.slot()] = self
                    .iter()
                    .find(|(other, e)| {
                        *other != id && matches!(e, Entry::Marker { section: s, .. } if *s == section)
                    })
                    .map(|(other, _)| other);
            }
            Entry::Raw(_) if self.authority == Some(id) => {
                self.authority = self
                    .iter()
                    .find(|(other, e)| {
                        *other != id && matches!(e, Entry::Raw(line) if line.contains(AUTHORITY_MARKER))
                    })
                    .map(|(other, _)| other);
            }
            _ => {}
        }
    }

    /// True if `a` appears before `b` in document order
    fn comes_before(&self, a: EntryId, b: EntryId) -> bool {
        let mut cursor = self.node(a).and_then(|n| n.next);
        while let Some(id) = cursor {
            if id == b {
                return true;
            }
            cursor = self.node(id).and_then(|n| n.next);
        }
        false
    }

    fn node(&self, id: EntryId) -> Option<&Node> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: EntryId) -> &mut Node {
        self.nodes[id]
            .as_mut()
            .unwrap_or_else(|| unreachable!("linked entry {} is not allocated", id))
    }
}

/// Iterator over document entries
pub struct Entries<'a> {
    doc: &'a ZoneDocument,
    cursor: Option<EntryId>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (EntryId, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.doc.node(id)?;
        self.cursor = node.next;
        Some((id, &node.entry))
    }
}

/// Parameters for the default zone skeleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skeleton {
    /// Zone origin (fully qualified)
    pub origin: String,

    /// Default TTL for the zone
    pub default_ttl: u32,

    /// Primary nameserver in the SOA record
    pub primary_ns: String,

    /// Responsible mailbox in the SOA record
    pub contact: String,

    /// Initial serial; today's date as YYYYMMDD01 when absent
    pub serial: Option<u32>,

    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,

    /// Nameservers listed in the Nameservers section
    pub nameservers: Vec<String>,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self {
            origin: "chn.".to_string(),
            default_ttl: 120,
            primary_ns: "a.gtld-servers.chn.".to_string(),
            contact: "master.hostname.com.".to_string(),
            serial: None,
            refresh: 3600,    // 1 hour
            retry: 600,       // 10 minutes
            expire: 604800,   // 1 week
            minimum: 120,     // 2 minutes
            nameservers: vec!["a.gtld-servers.chn.".to_string()],
        }
    }
}

impl Skeleton {
    /// Serial to start from
    pub fn initial_serial(&self) -> u32 {
        self.serial.unwrap_or_else(date_serial)
    }

    /// Build the skeleton document
    pub fn to_document(&self) -> ZoneDocument {
        let mut doc = ZoneDocument::new();
        let raw = |doc: &mut ZoneDocument, line: String| {
            doc.push_back(Entry::Raw(line));
        };

        raw(&mut doc, format!("$ORIGIN {}", self.origin));
        raw(&mut doc, format!("$TTL {}", self.default_ttl));
        raw(
            &mut doc,
            format!("@ {} {} {} (", AUTHORITY_MARKER, self.primary_ns, self.contact),
        );
        raw(&mut doc, authority_line(self.initial_serial(), "serial"));
        for (value, label) in [
            (self.refresh, "refresh"),
            (self.retry, "retry"),
            (self.expire, "expire"),
            (self.minimum, "minimum"),
        ] {
            raw(
                &mut doc,
                authority_line(value, &format!("{} ({})", label, describe_duration(value))),
            );
        }
        raw(&mut doc, "\t)".to_string());
        raw(&mut doc, String::new());

        for section in Section::ALL {
            doc.push_back(Entry::Marker {
                section,
                line: section.marker().to_string(),
            });
            if section == Section::Nameservers {
                for ns in &self.nameservers {
                    let host = ns.strip_suffix('.').unwrap_or(ns).to_string();
                    let record = Record::new("@", self.default_ttl, RecordData::Ns(host));
                    doc.push_back(Entry::Record(record.encode()));
                }
            }
            raw(&mut doc, String::new());
        }

        doc
    }
}

/// A value line inside the authority block with its trailing annotation
pub fn authority_line(value: u32, annotation: &str) -> String {
    format!("{}{:<10} ; {}", AUTHORITY_INDENT, value, annotation)
}

/// Today's date as a YYYYMMDD01 serial
fn date_serial() -> u32 {
    let date = chrono::Local::now().format("%Y%m%d").to_string();
    date.parse::<u32>().map(|d| d * 100 + 1).unwrap_or(1)
}

/// Human-readable form of a duration in seconds ("1 hour", "10 minutes")
fn describe_duration(secs: u32) -> String {
    const UNITS: [(u32, &str); 4] = [(604800, "week"), (86400, "day"), (3600, "hour"), (60, "minute")];

    let (count, unit) = UNITS
        .iter()
        .find(|(size, _)| secs >= *size && secs % size == 0)
        .map(|(size, unit)| (secs / size, *unit))
        .unwrap_or((secs, "second"));

    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

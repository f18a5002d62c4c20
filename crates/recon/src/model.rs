use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::DuplicateNames;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Opaque content fingerprint. Byte-comparable; serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for b in &self.0 {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// One named entry on either side of the comparison.
///
/// `name` is the matching key (a basename), `location` is an opaque locator
/// used for display and for fetching bytes (`s3://bucket/key`, a local path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

impl Item {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Remote,
    Local,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Local => write!(f, "local"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedPair {
    pub remote: Item,
    pub local: Item,
}

/// An item dropped from matching because a later item on the same side
/// carried the same name (last-write-wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowedItem {
    pub side: Side,
    pub item: Item,
    /// Location of the item that replaced this one.
    pub shadowed_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ItemUnreadable,
}

/// Non-fatal problem surfaced alongside the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub side: Side,
    pub location: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} item unreadable: {} ({})", self.side, self.location, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub remote_items: usize,
    pub local_items: usize,
    pub matched_by_name: usize,
    pub matched_by_content: usize,
    pub remote_only: usize,
    pub local_only: usize,
    pub shadowed: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub duplicate_names: DuplicateNames,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub matched_by_name: Vec<MatchedPair>,
    pub matched_by_content: Vec<MatchedPair>,
    pub remote_only: Vec<Item>,
    pub local_only: Vec<Item>,
    pub shadowed: Vec<ShadowedItem>,
    pub warnings: Vec<Warning>,
}

impl ReconResult {
    /// True when neither side has anything the other lacks.
    pub fn is_in_sync(&self) -> bool {
        self.remote_only.is_empty() && self.local_only.is_empty()
    }
}

//! # Chunk Versions
//!
//! Generation markers for a namespace's chunk-to-shard routing table.
//! A version is an ordinal pair `major|minor` scoped to an [`Epoch`]; the epoch
//! changes whenever the routing table is rebuilt from scratch, which makes every
//! ordinal from the previous epoch incomparable.
//!
//! The unset version is a sentinel outside the epoch space: it has no epoch at
//! all and means "no routing metadata known for this namespace".

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of one routing-table generation lineage.
///
/// Compared for equality only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(Uuid);

impl Epoch {
    /// Epoch attached to set versions decoded from senders that omitted it.
    /// Never compatible with any epoch, itself included.
    pub const UNKNOWN: Epoch = Epoch(Uuid::nil());

    /// Mint a fresh epoch for a newly built routing table.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for Epoch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Epoch)
            .map_err(|e| format!("Invalid epoch: {}", e))
    }
}

/// Rendered in place of an epoch for the unset version.
const UNSET_EPOCH_LABEL: &str = "unset";

/// Suffix of the companion field holding the epoch in the legacy encoding.
const LEGACY_EPOCH_SUFFIX: &str = "Epoch";

/// Version of a namespace's routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkVersion {
    major: u32,
    minor: u32,
    epoch: Option<Epoch>,
}

impl ChunkVersion {
    /// No routing metadata known yet.
    pub const UNSET: ChunkVersion = ChunkVersion {
        major: 0,
        minor: 0,
        epoch: None,
    };

    /// Create a set version. `0|0` with an epoch is still set.
    pub fn new(major: u32, minor: u32, epoch: Epoch) -> Self {
        Self {
            major,
            minor,
            epoch: Some(epoch),
        }
    }

    /// Create from a combined ordinal: `(major << 32) | minor`
    pub fn from_combined(combined: u64, epoch: Epoch) -> Self {
        Self::new((combined >> 32) as u32, (combined & 0xFFFF_FFFF) as u32, epoch)
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn combined(&self) -> u64 {
        ((self.major as u64) << 32) | (self.minor as u64)
    }

    /// Epoch of a set version, `None` for [`ChunkVersion::UNSET`].
    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    pub fn is_set(&self) -> bool {
        self.epoch.is_some()
    }

    /// True when both versions are unset, or both are set with the same known
    /// epoch.
    pub fn has_compatible_epoch(&self, other: &ChunkVersion) -> bool {
        match (self.epoch, other.epoch) {
            (None, None) => true,
            (Some(mine), Some(theirs)) => !mine.is_unknown() && mine == theirs,
            _ => false,
        }
    }

    /// Strictly older within the same epoch. Always false across epochs.
    pub fn is_older_than(&self, other: &ChunkVersion) -> bool {
        matches!(self.partial_cmp(other), Some(Ordering::Less))
    }

    /// Writes routed with `self` are still valid against `other`: same epoch
    /// and no migration (major bump) in between.
    pub fn is_write_compatible_with(&self, other: &ChunkVersion) -> bool {
        self.is_set() && self.has_compatible_epoch(other) && self.major == other.major
    }

    /// Next version after a chunk migration.
    pub fn inc_major(&self) -> Self {
        Self {
            major: self.major.saturating_add(1),
            minor: 0,
            epoch: self.epoch,
        }
    }

    /// Next version after a split that keeps ownership.
    pub fn inc_minor(&self) -> Self {
        Self {
            major: self.major,
            minor: self.minor.saturating_add(1),
            epoch: self.epoch,
        }
    }

    /// Encode as `[major, minor, epoch]`, with a null epoch when unset.
    pub fn to_document_value(&self) -> Value {
        json!([self.major, self.minor, self.epoch])
    }

    pub fn append_to(&self, doc: &mut Map<String, Value>, field: &str) {
        doc.insert(field.to_string(), self.to_document_value());
    }

    /// Decode the version stored under `field`.
    ///
    /// Absent or malformed values resolve to [`ChunkVersion::UNSET`]. A
    /// non-zero ordinal sent without any epoch decodes with [`Epoch::UNKNOWN`].
    pub fn from_document(doc: &Map<String, Value>, field: &str) -> Self {
        match doc.get(field) {
            Some(Value::Array(parts)) => Self::from_array(parts),
            Some(Value::Number(combined)) => {
                let epoch_field = format!("{}{}", field, LEGACY_EPOCH_SUFFIX);
                let epoch = EpochField::read(doc.get(&epoch_field));
                combined
                    .as_u64()
                    .map(|combined| Self::from_parts(combined, epoch))
                    .unwrap_or(Self::UNSET)
            }
            _ => Self::UNSET,
        }
    }

    fn from_array(parts: &[Value]) -> Self {
        let ordinal = |idx: usize| {
            parts
                .get(idx)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
        };
        match (ordinal(0), ordinal(1)) {
            (Some(major), Some(minor)) => {
                let epoch = EpochField::read(parts.get(2));
                Self::from_parts(((major as u64) << 32) | minor as u64, epoch)
            }
            _ => Self::UNSET,
        }
    }

    fn from_parts(combined: u64, epoch: EpochField) -> Self {
        match epoch {
            EpochField::Present(epoch) => Self::from_combined(combined, epoch),
            EpochField::Malformed => Self::UNSET,
            EpochField::Missing if combined == 0 => Self::UNSET,
            EpochField::Missing => Self::from_combined(combined, Epoch::UNKNOWN),
        }
    }
}

/// Epoch element of an encoded version.
enum EpochField {
    /// Absent, null, or the nil id.
    Missing,
    Present(Epoch),
    Malformed,
}

impl EpochField {
    fn read(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => EpochField::Missing,
            Some(value) => match serde_json::from_value::<Epoch>(value.clone()) {
                Ok(epoch) if epoch.is_unknown() => EpochField::Missing,
                Ok(epoch) => EpochField::Present(epoch),
                Err(_) => EpochField::Malformed,
            },
        }
    }
}

impl PartialOrd for ChunkVersion {
    /// Ordinal order within one epoch; no order across epochs.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        if !self.has_compatible_epoch(other) {
            return None;
        }
        Some((self.major, self.minor).cmp(&(other.major, other.minor)))
    }
}

impl fmt::Display for ChunkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epoch {
            Some(epoch) => write!(f, "{}|{}||{}", self.major, self.minor, epoch),
            None => write!(f, "{}|{}||{}", self.major, self.minor, UNSET_EPOCH_LABEL),
        }
    }
}

impl FromStr for ChunkVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ordinal, epoch) = s
            .trim()
            .split_once("||")
            .ok_or_else(|| format!("Invalid chunk version: {}", s))?;
        let (major, minor) = ordinal
            .split_once('|')
            .ok_or_else(|| format!("Invalid chunk version ordinal: {}", ordinal))?;
        let major = major
            .parse::<u32>()
            .map_err(|e| format!("Invalid major version: {}", e))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|e| format!("Invalid minor version: {}", e))?;
        if epoch == UNSET_EPOCH_LABEL {
            if major != 0 || minor != 0 {
                return Err(format!("Unset chunk version with ordinal: {}", s));
            }
            return Ok(Self::UNSET);
        }
        Ok(Self::new(major, minor, epoch.parse()?))
    }
}

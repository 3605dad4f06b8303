//! # Stale Sharding Config Errors
//!
//! Raised when two nodes disagree on a namespace's [`ChunkVersion`]. The
//! direction says whose metadata is behind:
//!
//! - [`StaleDirection::Send`]: the caller sent a version the responder
//!   considers outdated.
//! - [`StaleDirection::Recv`]: the responder's own cached version is behind
//!   what the caller expects.
//!
//! Errors travel between nodes either as a structured document
//! (`code`, `errmsg`, `ns`, `vReceived`, `vWanted`) or, for older peers, as a
//! composed `[<ns>]<message>` string. Decoding never fails: missing fields fall
//! back to an empty namespace and unset versions.

use crate::legacy;
use crate::reload;
use crate::version::ChunkVersion;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub const SEND_STALE_CONFIG_CODE: i32 = 9996;
pub const RECV_STALE_CONFIG_CODE: i32 = 9997;

pub const NS_FIELD: &str = "ns";
pub const RECEIVED_FIELD: &str = "vReceived";
pub const WANTED_FIELD: &str = "vWanted";
pub const CODE_FIELD: &str = "code";
pub const ERRMSG_FIELD: &str = "errmsg";

/// Rendered in the message when a document carried no namespace.
const UNKNOWN_NS: &str = "<unknown>";

/// Which side of the exchange holds the stale version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaleDirection {
    /// The caller's version is behind the responder's.
    Send,
    /// The responder's version is behind the caller's.
    Recv,
}

impl StaleDirection {
    pub fn code(self) -> i32 {
        match self {
            StaleDirection::Send => SEND_STALE_CONFIG_CODE,
            StaleDirection::Recv => RECV_STALE_CONFIG_CODE,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            SEND_STALE_CONFIG_CODE => Some(StaleDirection::Send),
            RECV_STALE_CONFIG_CODE => Some(StaleDirection::Recv),
            _ => None,
        }
    }

    /// Literal tag closing a rendered message.
    pub fn tag(self) -> &'static str {
        match self {
            StaleDirection::Send => "send",
            StaleDirection::Recv => "recv",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "send" => Some(StaleDirection::Send),
            "recv" => Some(StaleDirection::Recv),
            _ => None,
        }
    }

    /// True when the side that issued the request is the stale one.
    pub fn caller_is_stale(self) -> bool {
        matches!(self, StaleDirection::Send)
    }
}

impl fmt::Display for StaleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A namespace's routing metadata disagrees between two nodes.
///
/// `Clone` copies every field, including the rendered message and the code.
/// There is no empty form; use `Option<StaleConfigError>` for "not yet known".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stale sharding config exception: {message}")]
pub struct StaleConfigError {
    direction: StaleDirection,
    ns: String,
    received: ChunkVersion,
    wanted: ChunkVersion,
    just_connection: bool,
    message: String,
}

impl StaleConfigError {
    pub fn new(
        ns: impl Into<String>,
        raw: &str,
        direction: StaleDirection,
        received: ChunkVersion,
        wanted: ChunkVersion,
        just_connection: bool,
    ) -> Self {
        Self::build(
            Some(ns.into()),
            raw,
            direction,
            received,
            wanted,
            just_connection,
        )
    }

    /// Rebuild from a structured error document.
    ///
    /// A missing or non-string `ns` becomes `""` and renders as `<unknown>`.
    pub fn from_document(
        raw: &str,
        direction: StaleDirection,
        doc: &Map<String, Value>,
        just_connection: bool,
    ) -> Self {
        let ns = doc.get(NS_FIELD).and_then(Value::as_str).map(str::to_string);
        Self::build(
            ns,
            raw,
            direction,
            ChunkVersion::from_document(doc, RECEIVED_FIELD),
            ChunkVersion::from_document(doc, WANTED_FIELD),
            just_connection,
        )
    }

    /// `None` for `ns` means the sender reported no namespace at all.
    fn build(
        ns: Option<String>,
        raw: &str,
        direction: StaleDirection,
        received: ChunkVersion,
        wanted: ChunkVersion,
        just_connection: bool,
    ) -> Self {
        let rendered_ns = ns.as_deref().unwrap_or(UNKNOWN_NS);
        let message = render_message(raw, rendered_ns, &received, &wanted, direction);
        Self {
            direction,
            ns: ns.unwrap_or_default(),
            received,
            wanted,
            just_connection,
            message,
        }
    }

    /// The caller sent an outdated version.
    pub fn send(
        ns: impl Into<String>,
        raw: &str,
        received: ChunkVersion,
        wanted: ChunkVersion,
        just_connection: bool,
    ) -> Self {
        Self::new(ns, raw, StaleDirection::Send, received, wanted, just_connection)
    }

    /// The responder's own version is outdated.
    pub fn recv(
        ns: impl Into<String>,
        raw: &str,
        received: ChunkVersion,
        wanted: ChunkVersion,
        just_connection: bool,
    ) -> Self {
        Self::new(ns, raw, StaleDirection::Recv, received, wanted, just_connection)
    }

    pub fn send_from_document(raw: &str, doc: &Map<String, Value>, just_connection: bool) -> Self {
        Self::from_document(raw, StaleDirection::Send, doc, just_connection)
    }

    pub fn recv_from_document(raw: &str, doc: &Map<String, Value>, just_connection: bool) -> Self {
        Self::from_document(raw, StaleDirection::Recv, doc, just_connection)
    }

    /// Decode a reply document produced by [`StaleConfigError::to_document`].
    ///
    /// Returns `None` unless `code` is one of the stale config codes. The
    /// rendered tail already present in `errmsg` is not wrapped a second time.
    pub fn decode(doc: &Map<String, Value>, just_connection: bool) -> Option<Self> {
        let direction = doc
            .get(CODE_FIELD)
            .and_then(Value::as_i64)
            .and_then(|code| i32::try_from(code).ok())
            .and_then(StaleDirection::from_code)?;
        let errmsg = doc.get(ERRMSG_FIELD).and_then(Value::as_str).unwrap_or_default();
        let raw = legacy::split_rendered(errmsg)
            .map(|tail| tail.diagnostic)
            .unwrap_or(errmsg);
        Some(Self::from_document(raw, direction, doc, just_connection))
    }

    /// Rebuild from a composed `[<ns>]<message>` string.
    ///
    /// The namespace falls back to `""`, rendered `<unknown>`, when no brackets
    /// are found. Versions are recovered from the rendered tail when present,
    /// unset otherwise.
    pub fn from_legacy_message(
        direction: StaleDirection,
        composed: &str,
        just_connection: bool,
    ) -> Self {
        let (ns, remainder) = match legacy::parse(composed) {
            Some((ns, remainder)) => (Some(ns.to_string()), remainder),
            None => (None, composed),
        };
        match legacy::split_rendered(remainder) {
            Some(tail) => Self::build(
                ns,
                tail.diagnostic,
                direction,
                tail.received,
                tail.wanted,
                just_connection,
            ),
            None => Self::build(
                ns,
                remainder,
                direction,
                ChunkVersion::UNSET,
                ChunkVersion::UNSET,
                just_connection,
            ),
        }
    }

    pub fn direction(&self) -> StaleDirection {
        self.direction
    }

    pub fn code(&self) -> i32 {
        self.direction.code()
    }

    /// Only this connection's routing state is stale, not the shared metadata.
    pub fn just_connection(&self) -> bool {
        self.just_connection
    }

    /// Affected namespace; empty when the sender did not report one.
    pub fn ns(&self) -> &str {
        &self.ns
    }

    pub fn version_received(&self) -> ChunkVersion {
        self.received
    }

    pub fn version_wanted(&self) -> ChunkVersion {
        self.wanted
    }

    /// Rendered message without the standalone prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether resolving this error needs the namespace's whole routing table.
    pub fn requires_full_reload(&self) -> bool {
        reload::requires_full_reload(&self.received, &self.wanted)
    }

    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(CODE_FIELD.to_string(), Value::from(self.code()));
        doc.insert(ERRMSG_FIELD.to_string(), Value::from(self.message.clone()));
        doc.insert(NS_FIELD.to_string(), Value::from(self.ns.clone()));
        self.received.append_to(&mut doc, RECEIVED_FIELD);
        self.wanted.append_to(&mut doc, WANTED_FIELD);
        doc
    }

    /// `[<ns>]<message>` for peers that only understand free text.
    pub fn legacy_message(&self) -> String {
        legacy::compose(&self.ns, &self.message)
    }
}

fn render_message(
    raw: &str,
    ns: &str,
    received: &ChunkVersion,
    wanted: &ChunkVersion,
    direction: StaleDirection,
) -> String {
    format!(
        "{} ( ns : {}, received : {}, wanted : {}, {} )",
        raw,
        ns,
        received,
        wanted,
        direction.tag()
    )
}

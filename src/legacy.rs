//! Free-text stale config messages.
//!
//! Older peers report staleness as a composed string `[<ns>]<message>`, where
//! `<message>` usually ends with the rendered tail
//! `( ns : <ns>, received : <version>, wanted : <version>, send|recv )`.
//! Everything here is best effort: malformed input yields `None`, never an error.
//! Prefer the structured document whenever one is available.

use crate::stale::StaleDirection;
use crate::version::ChunkVersion;

const TAIL_OPEN: &str = " ( ns : ";
const TAIL_CLOSE: &str = " )";

/// Split `...[<ns>]<remainder>` into `(ns, remainder)`.
pub fn parse(composed: &str) -> Option<(&str, &str)> {
    let start = composed.find('[')?;
    let end = start + composed[start..].find(']')?;
    Some((&composed[start + 1..end], &composed[end + 1..]))
}

pub fn compose(ns: &str, message: &str) -> String {
    format!("[{}]{}", ns, message)
}

/// Parts recovered from a rendered stale config message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTail<'a> {
    pub diagnostic: &'a str,
    pub ns: &'a str,
    pub received: ChunkVersion,
    pub wanted: ChunkVersion,
    pub direction: StaleDirection,
}

/// Separate the diagnostic from the rendered tail.
///
/// Versions that fail to parse come back unset.
pub fn split_rendered(message: &str) -> Option<RenderedTail<'_>> {
    let open = message.rfind(TAIL_OPEN)?;
    let diagnostic = &message[..open];
    let body = message[open + TAIL_OPEN.len()..].strip_suffix(TAIL_CLOSE)?;

    // ns : X, received : V, wanted : V, tag
    let mut fields = body.rsplitn(4, ", ");
    let direction = StaleDirection::from_tag(fields.next()?)?;
    let wanted = fields.next()?.strip_prefix("wanted : ")?;
    let received = fields.next()?.strip_prefix("received : ")?;
    let ns = fields.next()?;

    Some(RenderedTail {
        diagnostic,
        ns,
        received: received.parse().unwrap_or(ChunkVersion::UNSET),
        wanted: wanted.parse().unwrap_or(ChunkVersion::UNSET),
        direction,
    })
}

/// The `send`/`recv` tag at the end of a rendered message.
pub fn direction_tag(message: &str) -> Option<StaleDirection> {
    split_rendered(message).map(|tail| tail.direction)
}

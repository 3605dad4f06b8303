use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::stale::{StaleDirection, CODE_FIELD, ERRMSG_FIELD, NS_FIELD, RECEIVED_FIELD, WANTED_FIELD};
use crate::version::{ChunkVersion, Epoch};

/// Deterministic epoch for a seed.
pub fn epoch(seed: u128) -> Epoch {
    Epoch::from_u128(seed)
}

pub fn version(major: u32, minor: u32, epoch_seed: u128) -> ChunkVersion {
    ChunkVersion::new(major, minor, epoch(epoch_seed))
}

/// Reply document as a responder would send it. `ns: None` omits the field.
pub fn stale_document(
    direction: StaleDirection,
    ns: Option<&str>,
    received: &ChunkVersion,
    wanted: &ChunkVersion,
) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert(CODE_FIELD.to_string(), Value::from(direction.code()));
    doc.insert(ERRMSG_FIELD.to_string(), Value::from("stale routing"));
    if let Some(ns) = ns {
        doc.insert(NS_FIELD.to_string(), Value::from(ns));
    }
    received.append_to(&mut doc, RECEIVED_FIELD);
    wanted.append_to(&mut doc, WANTED_FIELD);
    doc
}

#[derive(Debug, Clone)]
pub struct VersionPair {
    pub received: ChunkVersion,
    pub wanted: ChunkVersion,
}

/// Pairs of versions as seen by a router and a shard. A fraction of pairs
/// straddle an epoch change and a few have one side unset.
pub fn generate_version_pairs(
    count: u32,
    epoch_change_probability: f64,
    seed: u64,
) -> Vec<VersionPair> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairs = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let epoch_seed = rng.random_range(1..1_000u128);
        let wanted = version(
            rng.random_range(1..100),
            rng.random_range(0..20),
            epoch_seed,
        );
        let received = if rng.random_bool(0.05) {
            ChunkVersion::UNSET
        } else if rng.random_bool(epoch_change_probability) {
            version(wanted.major(), wanted.minor(), epoch_seed + 1_000)
        } else {
            version(
                rng.random_range(1..=wanted.major()),
                rng.random_range(0..20),
                epoch_seed,
            )
        };
        pairs.push(VersionPair { received, wanted });
    }

    pairs
}

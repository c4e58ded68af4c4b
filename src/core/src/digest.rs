//! Stable trust-map digest
//!
//! Peers compare trust maps by hash before pulling full snapshots, and
//! the quorum restore groups candidate snapshots by this same key. The
//! hash must therefore be identical across nodes and platforms for
//! identical maps: sorted names, exact f64 bit patterns, Sha256.

use crate::NodeName;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Hash a trust map into a hex digest stable across nodes.
pub fn stable_trust_hash(trust: &HashMap<NodeName, f64>) -> String {
    let mut names: Vec<&NodeName> = trust.keys().collect();
    names.sort();

    let mut hasher = Sha256::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(trust[name].to_bits().to_be_bytes());
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

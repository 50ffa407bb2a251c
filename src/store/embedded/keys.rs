//! Key encoding for the embedded store.

use crate::schema::{NodeLabel, RelType};

/// Meta key holding the last issued edge sequence number.
pub const SEQ_KEY: &[u8] = b"seq";

/// Encode node key: node:{label}:{key}
pub fn encode_node_key(label: NodeLabel, key: &str) -> Vec<u8> {
    format!("node:{}:{}", label, key).into_bytes()
}

/// Encode label prefix for iteration: node:{label}:
pub fn encode_label_prefix(label: NodeLabel) -> Vec<u8> {
    format!("node:{}:", label).into_bytes()
}

/// Encode edge key: edge:{seq} (zero padded so iteration follows insertion order)
pub fn encode_edge_key(seq: u64) -> Vec<u8> {
    format!("edge:{:020}", seq).into_bytes()
}

/// Encode constraint key: constraint:{name}
pub fn encode_constraint_key(name: &str) -> Vec<u8> {
    format!("constraint:{}", name).into_bytes()
}

/// Encode merged-edge marker: merged: followed by length-prefixed rel,
/// source label, source key, destination label and destination key.
///
/// Present once a merged (create-if-absent) relationship exists between two
/// nodes. Every component carries a u64 big-endian length so free-text keys
/// cannot run into each other.
pub fn encode_merge_key(
    rel: RelType,
    src: (NodeLabel, &str),
    dst: (NodeLabel, &str),
) -> Vec<u8> {
    let mut key = MERGE_PREFIX.to_vec();
    for part in [rel.as_str(), src.0.as_str(), src.1, dst.0.as_str(), dst.1] {
        key.extend_from_slice(&(part.len() as u64).to_be_bytes());
        key.extend_from_slice(part.as_bytes());
    }
    key
}

/// Prefix of all merged-edge markers.
pub const MERGE_PREFIX: &[u8] = b"merged:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefix_matches_node_keys() {
        let prefix = encode_label_prefix(NodeLabel::City);
        assert!(encode_node_key(NodeLabel::City, "İzmir").starts_with(&prefix));
        assert!(!encode_node_key(NodeLabel::Hotel, "İzmir").starts_with(&prefix));
    }

    #[test]
    fn test_edge_keys_sort_by_sequence() {
        assert!(encode_edge_key(9) < encode_edge_key(10));
        assert!(encode_edge_key(99) < encode_edge_key(1000));
    }

    #[test]
    fn test_merge_keys_do_not_collide_across_components() {
        let a = encode_merge_key(
            RelType::LocatedIn,
            (NodeLabel::Hotel, "A->City:B"),
            (NodeLabel::City, "C"),
        );
        let b = encode_merge_key(
            RelType::LocatedIn,
            (NodeLabel::Hotel, "A"),
            (NodeLabel::City, "B->City:C"),
        );
        assert_ne!(a, b);
        assert!(a.starts_with(MERGE_PREFIX));
        assert!(b.starts_with(MERGE_PREFIX));
    }
}

//! Pattern evaluation over an in-memory snapshot of the embedded graph.
//!
//! Result shapes match the Cypher templates in [`crate::query::patterns`] so
//! callers cannot tell the backends apart.

use crate::query::PatternId;
use crate::schema::{NodeLabel, RelType};
use crate::types::value::properties_to_json;
use crate::types::{Params, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};

/// Reference to a node by label and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }
}

/// Stored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub label: NodeLabel,
    pub key: String,
    pub properties: Params,
}

/// Stored relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub seq: u64,
    pub rel_type: RelType,
    pub src: NodeRef,
    pub dst: NodeRef,
    pub properties: Params,
}

/// Everything pattern evaluation needs: person names and all edges.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Person key -> name
    pub people: HashMap<String, String>,
    /// Edges in insertion order
    pub edges: Vec<EdgeRecord>,
}

/// Pattern arguments.
#[derive(Debug, Clone)]
pub struct PatternArgs<'a> {
    pub name1: &'a str,
    pub name2: &'a str,
    pub limit: usize,
}

impl Snapshot {
    /// Display name of a node: person name, or the key for name-keyed labels.
    fn display_name(&self, node: &NodeRef) -> String {
        match node.label {
            NodeLabel::Person => self.people.get(&node.key).cloned().unwrap_or_default(),
            _ => node.key.clone(),
        }
    }

    /// Outgoing edges of people whose name contains `needle`.
    fn person_edges<'s>(&'s self, needle: &'s str) -> impl Iterator<Item = &'s EdgeRecord> + 's {
        self.edges.iter().filter(move |e| {
            e.src.label == NodeLabel::Person
                && self
                    .people
                    .get(&e.src.key)
                    .map(|name| name.contains(needle))
                    .unwrap_or(false)
        })
    }

    /// Pairs (r1, r2) of distinct relationships from distinct matching people
    /// that end at the same node.
    fn meeting_pairs<'s>(&'s self, args: &PatternArgs<'s>) -> Vec<(&'s EdgeRecord, &'s EdgeRecord)> {
        let mut pairs = Vec::new();
        for r1 in self.person_edges(args.name1) {
            for r2 in self.person_edges(args.name2) {
                if r1.seq != r2.seq && r1.src != r2.src && r1.dst == r2.dst {
                    pairs.push((r1, r2));
                }
            }
        }
        pairs
    }

    /// Evaluate one pattern.
    pub fn evaluate(&self, pattern: PatternId, args: &PatternArgs<'_>) -> Vec<Row> {
        match pattern {
            PatternId::RelationshipPath => self.relationship_path(args),
            PatternId::SharedDestination => self.shared_destination(args),
            PatternId::SharedHotel => self.shared_hotel(args),
        }
    }

    fn relationship_path(&self, args: &PatternArgs<'_>) -> Vec<Row> {
        let mut rows: Vec<Row> = Vec::new();
        for (r1, r2) in self.meeting_pairs(args) {
            for rel in [r1, r2] {
                let row = to_row(json!({
                    "relationship": rel.rel_type.as_str(),
                    "endpoint": self.display_name(&rel.dst),
                    "details": properties_to_json(&rel.properties),
                }));
                if !rows.contains(&row) {
                    rows.push(row);
                }
                if rows.len() >= args.limit {
                    return rows;
                }
            }
        }
        rows
    }

    fn shared_destination(&self, args: &PatternArgs<'_>) -> Vec<Row> {
        let mut by_city: BTreeMap<&str, (Vec<JsonValue>, Vec<JsonValue>)> = BTreeMap::new();
        for (r1, r2) in self.meeting_pairs(args) {
            if r1.dst.label != NodeLabel::City {
                continue;
            }
            let entry = by_city.entry(r1.dst.key.as_str()).or_default();
            push_distinct(&mut entry.0, trip_json(r1));
            push_distinct(&mut entry.1, trip_json(r2));
        }

        by_city
            .into_iter()
            .take(args.limit)
            .map(|(city, (trips1, trips2))| {
                to_row(json!({ "city": city, "trips1": trips1, "trips2": trips2 }))
            })
            .collect()
    }

    fn shared_hotel(&self, args: &PatternArgs<'_>) -> Vec<Row> {
        let mut by_hotel: BTreeMap<&str, (Vec<JsonValue>, Vec<JsonValue>)> = BTreeMap::new();
        for (r1, r2) in self.meeting_pairs(args) {
            if r1.rel_type != RelType::StayedAt || r2.rel_type != RelType::StayedAt {
                continue;
            }
            let entry = by_hotel.entry(r1.dst.key.as_str()).or_default();
            push_distinct(&mut entry.0, properties_to_json(&r1.properties));
            push_distinct(&mut entry.1, properties_to_json(&r2.properties));
        }

        by_hotel
            .into_iter()
            .take(args.limit)
            .map(|(hotel, (stays1, stays2))| {
                let cities: Vec<&str> = self
                    .edges
                    .iter()
                    .filter(|e| {
                        e.rel_type == RelType::LocatedIn
                            && e.src.label == NodeLabel::Hotel
                            && e.src.key == hotel
                    })
                    .map(|e| e.dst.key.as_str())
                    .collect();
                to_row(json!({
                    "hotel": hotel,
                    "cities": cities,
                    "stays1": stays1,
                    "stays2": stays2,
                }))
            })
            .collect()
    }
}

fn trip_json(edge: &EdgeRecord) -> JsonValue {
    json!({
        "relationship": edge.rel_type.as_str(),
        "details": properties_to_json(&edge.properties),
    })
}

fn push_distinct(list: &mut Vec<JsonValue>, value: JsonValue) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn to_row(value: JsonValue) -> Row {
    match value {
        JsonValue::Object(map) => map,
        _ => Row::new(),
    }
}

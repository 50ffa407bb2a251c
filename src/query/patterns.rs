//! Query pattern library.
//!
//! A fixed, versioned set of parameterized Cypher templates. Every template
//! binds exactly `$name1`, `$name2` (substring match against `Person.name`)
//! and `$limit` (result cap). Nothing else is ever substituted.

use crate::store::{Statement, StatementKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog version reported to the planner.
pub const CATALOG_VERSION: &str = "1";

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternId {
    /// Any relationship within two hops between two people
    RelationshipPath,
    /// Cities both people travelled to
    SharedDestination,
    /// Hotels both people stayed at
    SharedHotel,
}

impl PatternId {
    pub const ALL: [PatternId; 3] = [
        PatternId::RelationshipPath,
        PatternId::SharedDestination,
        PatternId::SharedHotel,
    ];

    /// Canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelationshipPath => "relationship_path",
            Self::SharedDestination => "shared_destination",
            Self::SharedHotel => "shared_hotel",
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternId {
    type Err = String;

    /// Accepts `shared_hotel`, `shared-hotel` and any ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        PatternId::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("unknown pattern '{}'", s))
    }
}

const RELATIONSHIP_PATH: &str = "\
MATCH path = (p1:Person)-[*1..2]-(p2:Person)
WHERE p1.name CONTAINS $name1 AND p2.name CONTAINS $name2 AND p1 <> p2
UNWIND relationships(path) AS rel
RETURN DISTINCT type(rel) AS relationship,
       endNode(rel).name AS endpoint,
       properties(rel) AS details
LIMIT $limit";

const SHARED_DESTINATION: &str = "\
MATCH (p1:Person)-[r1]->(c:City)<-[r2]-(p2:Person)
WHERE p1.name CONTAINS $name1 AND p2.name CONTAINS $name2 AND p1 <> p2
WITH c,
     collect(DISTINCT {relationship: type(r1), details: properties(r1)}) AS trips1,
     collect(DISTINCT {relationship: type(r2), details: properties(r2)}) AS trips2
RETURN c.name AS city, trips1, trips2
ORDER BY city
LIMIT $limit";

const SHARED_HOTEL: &str = "\
MATCH (p1:Person)-[r1:STAYED_AT]->(h:Hotel)<-[r2:STAYED_AT]-(p2:Person)
WHERE p1.name CONTAINS $name1 AND p2.name CONTAINS $name2 AND p1 <> p2
WITH h,
     collect(DISTINCT properties(r1)) AS stays1,
     collect(DISTINCT properties(r2)) AS stays2
OPTIONAL MATCH (h)-[:LOCATED_IN]->(c:City)
RETURN h.name AS hotel, collect(c.name) AS cities, stays1, stays2
ORDER BY hotel
LIMIT $limit";

/// One catalog entry.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: PatternId,
    /// What kind of question the pattern answers
    pub description: &'static str,
    /// Example question
    pub example: &'static str,
    /// Columns each result row carries
    pub columns: &'static [&'static str],
    /// Cypher template
    pub cypher: &'static str,
}

static PATTERNS: [Pattern; 3] = [
    Pattern {
        id: PatternId::RelationshipPath,
        description: "Any direct or indirect relationship (up to two hops) between two people: \
                      hotels they both stayed at, cities they both travelled to.",
        example: "What is the relationship between Ali Veli and Ayşe Kaya?",
        columns: &["relationship", "endpoint", "details"],
        cypher: RELATIONSHIP_PATH,
    },
    Pattern {
        id: PatternId::SharedDestination,
        description: "Cities both people travelled to by plane or bus, with each trip's details.",
        example: "Which cities did Ali Veli and Ayşe Kaya both travel to?",
        columns: &["city", "trips1", "trips2"],
        cypher: SHARED_DESTINATION,
    },
    Pattern {
        id: PatternId::SharedHotel,
        description: "Hotels both people stayed at, with both stays' details.",
        example: "Ali Veli ve Ayşe Kaya nerede birlikte kaldı?",
        columns: &["hotel", "cities", "stays1", "stays2"],
        cypher: SHARED_HOTEL,
    },
];

/// The pattern catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternCatalog;

impl PatternCatalog {
    /// Catalog version.
    pub fn version(&self) -> &'static str {
        CATALOG_VERSION
    }

    /// All patterns.
    pub fn all(&self) -> &'static [Pattern] {
        &PATTERNS
    }

    /// Look up a pattern by id.
    pub fn get(&self, id: PatternId) -> &'static Pattern {
        // PATTERNS is declared in PatternId::ALL order
        &PATTERNS[PatternId::ALL.iter().position(|p| *p == id).unwrap_or(0)]
    }

    /// Pattern ids accepted by the planner.
    pub fn ids(&self) -> Vec<&'static str> {
        PATTERNS.iter().map(|p| p.id.as_str()).collect()
    }

    /// Render the catalog as grounding context for the planner.
    pub fn describe(&self) -> String {
        let mut out = format!("Query patterns (catalog v{}):\n", CATALOG_VERSION);
        for p in &PATTERNS {
            out.push_str(&format!(
                "- {}: {}\n  returns: {}\n  example question: {}\n",
                p.id,
                p.description,
                p.columns.join(", "),
                p.example
            ));
        }
        out
    }

    /// Instantiate a pattern.
    pub fn instantiate(&self, id: PatternId, name1: &str, name2: &str, limit: usize) -> PatternQuery {
        PatternQuery {
            pattern: id,
            name1: name1.to_string(),
            name2: name2.to_string(),
            limit,
        }
    }
}

/// A filled-in pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternQuery {
    pub pattern: PatternId,
    pub name1: String,
    pub name2: String,
    pub limit: usize,
}

impl PatternQuery {
    /// Build the executable statement.
    pub fn to_statement(&self) -> Statement {
        let pattern = PatternCatalog.get(self.pattern);
        Statement::new(StatementKind::Pattern(self.pattern), pattern.cypher)
            .param("name1", self.name1.as_str())
            .param("name2", self.name2.as_str())
            .param("limit", i64::try_from(self.limit).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyValue;

    #[test]
    fn test_pattern_id_parsing() {
        assert_eq!("shared_hotel".parse::<PatternId>(), Ok(PatternId::SharedHotel));
        assert_eq!("shared-destination".parse::<PatternId>(), Ok(PatternId::SharedDestination));
        assert_eq!(" Relationship-Path ".parse::<PatternId>(), Ok(PatternId::RelationshipPath));
        assert!("shortest_path".parse::<PatternId>().is_err());
        assert!("MATCH (n) RETURN n".parse::<PatternId>().is_err());
    }

    #[test]
    fn test_catalog_order_matches_ids() {
        for id in PatternId::ALL {
            assert_eq!(PatternCatalog.get(id).id, id);
        }
    }

    #[test]
    fn test_templates_bind_only_known_parameters() {
        for p in PatternCatalog.all() {
            assert!(p.cypher.contains("$name1"));
            assert!(p.cypher.contains("$name2"));
            assert!(p.cypher.contains("LIMIT $limit"));
            assert!(!p.cypher.contains('\''), "template must not embed string literals");
        }
    }

    #[test]
    fn test_names_are_bound_not_interpolated() {
        let query = PatternCatalog.instantiate(PatternId::SharedHotel, "O'Hara", "x\" OR 1=1", 10);
        let stmt = query.to_statement();
        assert_eq!(stmt.text, SHARED_HOTEL);
        assert_eq!(stmt.params["name1"], PropertyValue::from("O'Hara"));
        assert_eq!(stmt.params["name2"], PropertyValue::from("x\" OR 1=1"));
        assert_eq!(stmt.params["limit"], PropertyValue::Int(10));
    }

    #[test]
    fn test_describe_mentions_every_pattern() {
        let text = PatternCatalog.describe();
        for id in PatternCatalog.ids() {
            assert!(text.contains(id));
        }
    }
}

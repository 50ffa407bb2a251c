//! Graph schema: node labels, relationship types and uniqueness constraints.
//!
//! The schema is fixed. It is rendered once into the grounding text handed
//! to the query planner and into the constraint statements issued by the
//! [`SchemaBootstrapper`].

pub mod bootstrap;

pub use bootstrap::{ConstraintReport, SchemaBootstrapper};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    Person,
    Hotel,
    City,
    /// Referenced only through `FLEW.airline`
    Airline,
    /// Referenced only through `TOOK_BUS.company`
    BusCompany,
}

impl NodeLabel {
    /// All labels in constraint issuance order.
    pub const ALL: [NodeLabel; 5] = [
        NodeLabel::Person,
        NodeLabel::Hotel,
        NodeLabel::City,
        NodeLabel::Airline,
        NodeLabel::BusCompany,
    ];

    /// Label as it appears in the graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Hotel => "Hotel",
            Self::City => "City",
            Self::Airline => "Airline",
            Self::BusCompany => "BusCompany",
        }
    }

    /// Unique key property.
    pub fn key_property(&self) -> &'static str {
        match self {
            Self::Person => "id",
            _ => "name",
        }
    }

    /// Intrinsic (non-key) properties.
    pub fn properties(&self) -> &'static [&'static str] {
        match self {
            Self::Person => &["name", "age", "gender", "email", "phone"],
            _ => &[],
        }
    }

    /// Name of the uniqueness constraint on the key property.
    pub fn constraint_name(&self) -> &'static str {
        match self {
            Self::Person => "person_id",
            Self::Hotel => "hotel_name",
            Self::City => "city_name",
            Self::Airline => "airline_name",
            Self::BusCompany => "bus_company_name",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeLabel::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unknown node label '{}'", s))
    }
}

/// Relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelType {
    /// Person -> Hotel
    StayedAt,
    /// Hotel -> City
    LocatedIn,
    /// Person -> destination City
    Flew,
    /// Person -> destination City
    TookBus,
}

impl RelType {
    pub const ALL: [RelType; 4] = [
        RelType::StayedAt,
        RelType::LocatedIn,
        RelType::Flew,
        RelType::TookBus,
    ];

    /// Relationship type as it appears in the graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StayedAt => "STAYED_AT",
            Self::LocatedIn => "LOCATED_IN",
            Self::Flew => "FLEW",
            Self::TookBus => "TOOK_BUS",
        }
    }

    /// (source label, target label)
    pub fn endpoints(&self) -> (NodeLabel, NodeLabel) {
        match self {
            Self::StayedAt => (NodeLabel::Person, NodeLabel::Hotel),
            Self::LocatedIn => (NodeLabel::Hotel, NodeLabel::City),
            Self::Flew | Self::TookBus => (NodeLabel::Person, NodeLabel::City),
        }
    }

    /// Relationship properties (denormalized copies of source fields).
    pub fn properties(&self) -> &'static [&'static str] {
        match self {
            Self::StayedAt => &[
                "check_in",
                "duration",
                "room_type",
                "daily_rate",
                "breakfast_included",
                "all_inclusive",
            ],
            Self::LocatedIn => &[],
            Self::Flew => &[
                "airline",
                "flight_date",
                "class",
                "fare",
                "flight_type",
                "baggage",
                "duration",
                "origin",
                "destination",
            ],
            Self::TookBus => &[
                "company",
                "travel_date",
                "seat_no",
                "fare",
                "bus_type",
                "duration",
                "origin",
                "destination",
            ],
        }
    }

    /// Property holding the date of the stay or trip, if any.
    pub fn date_property(&self) -> Option<&'static str> {
        match self {
            Self::StayedAt => Some("check_in"),
            Self::Flew => Some("flight_date"),
            Self::TookBus => Some("travel_date"),
            Self::LocatedIn => None,
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelType::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown relationship type '{}'", s))
    }
}

/// Render the schema as grounding context for the query planner.
pub fn schema_description() -> String {
    let mut out = String::from("Nodes:\n");
    for label in NodeLabel::ALL {
        let mut props = vec![label.key_property()];
        props.extend_from_slice(label.properties());
        out.push_str(&format!("- {}: {}\n", label, props.join(", ")));
    }

    out.push_str("\nRelationships:\n");
    for rel in RelType::ALL {
        let (src, dst) = rel.endpoints();
        let props = rel.properties();
        if props.is_empty() {
            out.push_str(&format!("- {}: {} -> {}\n", rel, src, dst));
        } else {
            out.push_str(&format!("- {}: {} -> {} ({})\n", rel, src, dst, props.join(", ")));
        }
    }

    out.push_str(
        "\nNotes:\n\
         - FLEW and TOOK_BUS point at the destination city; the origin city is only the `origin` property.\n\
         - Airline and BusCompany are only referenced by the `airline` / `company` relationship properties.\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_description_lists_everything() {
        let text = schema_description();
        for label in NodeLabel::ALL {
            assert!(text.contains(label.as_str()));
        }
        for rel in RelType::ALL {
            assert!(text.contains(rel.as_str()));
        }
        assert!(text.contains("Person: id, name, age, gender, email, phone"));
        assert!(text.contains("LOCATED_IN: Hotel -> City\n"));
    }

    #[test]
    fn test_label_parse() {
        assert_eq!("BusCompany".parse::<NodeLabel>(), Ok(NodeLabel::BusCompany));
        assert!("Bus".parse::<NodeLabel>().is_err());
        assert_eq!("TOOK_BUS".parse::<RelType>(), Ok(RelType::TookBus));
    }
}

//! Normalized source records.
//!
//! One struct per tabular record set. Field names are the English graph
//! property names; the mapping from source columns lives in
//! [`crate::ingest::columns`].

use crate::types::value::{Params, PropertyValue};
use serde::{Deserialize, Serialize};

/// Person row. Materialized as a `Person` node keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Source identifier (unique per person)
    pub id: i64,
    /// Full name (`"{first} {last}"`)
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub email: String,
    pub phone: String,
}

impl PersonRecord {
    /// Node properties for `CREATE (:Person {...})`.
    pub fn params(&self) -> Params {
        let mut p = Params::new();
        p.insert("id".into(), self.id.into());
        p.insert("name".into(), self.name.as_str().into());
        p.insert("age".into(), self.age.into());
        p.insert("gender".into(), self.gender.as_str().into());
        p.insert("email".into(), self.email.as_str().into());
        p.insert("phone".into(), self.phone.as_str().into());
        p
    }
}

/// Hotel stay row. Produces `STAYED_AT` and `LOCATED_IN` edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelStayRecord {
    pub person_id: i64,
    pub hotel: String,
    pub city: String,
    /// ISO date (`YYYY-MM-DD`)
    pub check_in: String,
    /// Length of stay in days
    pub duration: i64,
    pub room_type: String,
    pub daily_rate: f64,
    pub breakfast_included: bool,
    pub all_inclusive: bool,
}

impl HotelStayRecord {
    /// Properties copied onto the `STAYED_AT` relationship.
    pub fn relationship_properties(&self) -> Params {
        let mut p = Params::new();
        p.insert("check_in".into(), self.check_in.as_str().into());
        p.insert("duration".into(), self.duration.into());
        p.insert("room_type".into(), self.room_type.as_str().into());
        p.insert("daily_rate".into(), self.daily_rate.into());
        p.insert("breakfast_included".into(), self.breakfast_included.into());
        p.insert("all_inclusive".into(), self.all_inclusive.into());
        p
    }

    /// Statement parameters (endpoints plus relationship properties).
    pub fn params(&self) -> Params {
        let mut p = self.relationship_properties();
        p.insert("person_id".into(), self.person_id.into());
        p.insert("hotel".into(), self.hotel.as_str().into());
        p.insert("city".into(), self.city.as_str().into());
        p
    }
}

/// Flight row. Produces a `FLEW` edge to the destination city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub person_id: i64,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    /// ISO date (`YYYY-MM-DD`)
    pub flight_date: String,
    pub class: String,
    pub fare: f64,
    pub flight_type: String,
    pub baggage: String,
    pub duration: String,
}

impl FlightRecord {
    /// Properties copied onto the `FLEW` relationship.
    pub fn relationship_properties(&self) -> Params {
        let mut p = Params::new();
        p.insert("airline".into(), self.airline.as_str().into());
        p.insert("flight_date".into(), self.flight_date.as_str().into());
        p.insert("class".into(), self.class.as_str().into());
        p.insert("fare".into(), self.fare.into());
        p.insert("flight_type".into(), self.flight_type.as_str().into());
        p.insert("baggage".into(), self.baggage.as_str().into());
        p.insert("duration".into(), self.duration.as_str().into());
        p.insert("origin".into(), self.origin.as_str().into());
        p.insert("destination".into(), self.destination.as_str().into());
        p
    }

    /// Statement parameters.
    pub fn params(&self) -> Params {
        let mut p = self.relationship_properties();
        p.insert("person_id".into(), self.person_id.into());
        p
    }
}

/// Bus trip row. Produces a `TOOK_BUS` edge to the destination city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusTripRecord {
    pub person_id: i64,
    pub company: String,
    pub origin: String,
    pub destination: String,
    /// ISO date (`YYYY-MM-DD`)
    pub travel_date: String,
    pub seat_no: String,
    pub fare: f64,
    pub bus_type: String,
    pub duration: String,
}

impl BusTripRecord {
    /// Properties copied onto the `TOOK_BUS` relationship.
    pub fn relationship_properties(&self) -> Params {
        let mut p = Params::new();
        p.insert("company".into(), self.company.as_str().into());
        p.insert("travel_date".into(), self.travel_date.as_str().into());
        p.insert("seat_no".into(), self.seat_no.as_str().into());
        p.insert("fare".into(), self.fare.into());
        p.insert("bus_type".into(), self.bus_type.as_str().into());
        p.insert("duration".into(), self.duration.as_str().into());
        p.insert("origin".into(), self.origin.as_str().into());
        p.insert("destination".into(), self.destination.as_str().into());
        p
    }

    /// Statement parameters.
    pub fn params(&self) -> Params {
        let mut p = self.relationship_properties();
        p.insert("person_id".into(), self.person_id.into());
        p
    }
}

/// Read a required text parameter.
pub(crate) fn text_param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(PropertyValue::as_text)
}

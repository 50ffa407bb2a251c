//! Graph-construction statements for ingestion.
//!
//! Every statement starts with `MATCH` on the person so that a missing
//! person creates nothing, and ends with `RETURN count(r) AS created` so the
//! caller can tell "person not found" (0) from success (1). Record values
//! are bound as parameters only.

use crate::store::{Statement, StatementKind};
use crate::types::{BusTripRecord, FlightRecord, HotelStayRecord, PersonRecord, Row};

const CREATE_PERSON: &str = "\
CREATE (p:Person {id: $id, name: $name, age: $age, gender: $gender, email: $email, phone: $phone})
RETURN p.id AS id";

const CREATE_HOTEL_STAY: &str = "\
MATCH (p:Person {id: $person_id})
MERGE (h:Hotel {name: $hotel})
MERGE (c:City {name: $city})
MERGE (h)-[:LOCATED_IN]->(c)
CREATE (p)-[r:STAYED_AT {
    check_in: $check_in,
    duration: $duration,
    room_type: $room_type,
    daily_rate: $daily_rate,
    breakfast_included: $breakfast_included,
    all_inclusive: $all_inclusive
}]->(h)
RETURN count(r) AS created";

const CREATE_FLIGHT: &str = "\
MATCH (p:Person {id: $person_id})
MERGE (:Airline {name: $airline})
MERGE (:City {name: $origin})
MERGE (d:City {name: $destination})
CREATE (p)-[r:FLEW {
    airline: $airline,
    flight_date: $flight_date,
    class: $class,
    fare: $fare,
    flight_type: $flight_type,
    baggage: $baggage,
    duration: $duration,
    origin: $origin,
    destination: $destination
}]->(d)
RETURN count(r) AS created";

const CREATE_BUS_TRIP: &str = "\
MATCH (p:Person {id: $person_id})
MERGE (:BusCompany {name: $company})
MERGE (:City {name: $origin})
MERGE (d:City {name: $destination})
CREATE (p)-[r:TOOK_BUS {
    company: $company,
    travel_date: $travel_date,
    seat_no: $seat_no,
    fare: $fare,
    bus_type: $bus_type,
    duration: $duration,
    origin: $origin,
    destination: $destination
}]->(d)
RETURN count(r) AS created";

/// Strict create of one person.
pub fn create_person(record: &PersonRecord) -> Statement {
    Statement::new(StatementKind::CreatePerson, CREATE_PERSON).with_params(record.params())
}

/// Hotel stay: upsert hotel and city, create `STAYED_AT`, merge `LOCATED_IN`.
pub fn create_hotel_stay(record: &HotelStayRecord) -> Statement {
    Statement::new(StatementKind::CreateHotelStay, CREATE_HOTEL_STAY).with_params(record.params())
}

/// Flight: upsert airline and both cities, create `FLEW` to the destination.
pub fn create_flight(record: &FlightRecord) -> Statement {
    Statement::new(StatementKind::CreateFlight, CREATE_FLIGHT).with_params(record.params())
}

/// Bus trip: upsert company and both cities, create `TOOK_BUS` to the destination.
pub fn create_bus_trip(record: &BusTripRecord) -> Statement {
    Statement::new(StatementKind::CreateBusTrip, CREATE_BUS_TRIP).with_params(record.params())
}

/// `true` if a relationship statement reported a created edge.
pub fn relationship_created(rows: &[Row]) -> bool {
    rows.first()
        .and_then(|row| row.get("created"))
        .and_then(|v| v.as_i64())
        .is_some_and(|n| n > 0)
}

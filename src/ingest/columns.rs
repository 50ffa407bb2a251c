//! Source column mapping.
//!
//! Maps the column names of each source file to record fields, so the
//! ingestion code never depends on the language the source was written in.
//! The default is the Turkish column contract of the travel data export.

use serde::{Deserialize, Serialize};

/// File names of the four record sets inside a data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFiles {
    pub people: String,
    pub hotel_stays: String,
    pub flights: String,
    pub bus_trips: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            people: "kisiler.csv".to_string(),
            hotel_stays: "otel_konaklamalari.csv".to_string(),
            flights: "ucak_seyahatleri.csv".to_string(),
            bus_trips: "otobus_seyahatleri.csv".to_string(),
        }
    }
}

/// Person columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonColumns {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
}

/// Hotel stay columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelStayColumns {
    pub person_id: String,
    pub hotel: String,
    pub city: String,
    pub check_in: String,
    pub duration: String,
    pub room_type: String,
    pub daily_rate: String,
    pub breakfast_included: String,
    pub all_inclusive: String,
}

/// Flight columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightColumns {
    pub person_id: String,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub flight_date: String,
    pub class: String,
    pub fare: String,
    pub flight_type: String,
    pub baggage: String,
    pub duration: String,
}

/// Bus trip columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusTripColumns {
    pub person_id: String,
    pub company: String,
    pub origin: String,
    pub destination: String,
    pub travel_date: String,
    pub seat_no: String,
    pub fare: String,
    pub bus_type: String,
    pub duration: String,
}

/// Column mapping for all four record sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub people: PersonColumns,
    pub hotel_stays: HotelStayColumns,
    pub flights: FlightColumns,
    pub bus_trips: BusTripColumns,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::turkish()
    }
}

fn s(v: &str) -> String {
    v.to_string()
}

impl ColumnMapping {
    /// Column names of the Turkish travel data export.
    pub fn turkish() -> Self {
        Self {
            people: PersonColumns {
                id: s("id"),
                first_name: s("ad"),
                last_name: s("soyad"),
                age: s("yaş"),
                gender: s("cinsiyet"),
                email: s("email"),
                phone: s("telefon"),
            },
            hotel_stays: HotelStayColumns {
                person_id: s("müşteri_id"),
                hotel: s("otel_adı"),
                city: s("şehir"),
                check_in: s("giriş_tarihi"),
                duration: s("kalış_süresi"),
                room_type: s("oda_tipi"),
                daily_rate: s("günlük_ücret"),
                breakfast_included: s("kahvaltı_dahil"),
                all_inclusive: s("all_inclusive"),
            },
            flights: FlightColumns {
                person_id: s("yolcu_id"),
                airline: s("havayolu"),
                origin: s("kalkış_şehri"),
                destination: s("varış_şehri"),
                flight_date: s("uçuş_tarihi"),
                class: s("uçuş_sınıfı"),
                fare: s("bilet_ücreti"),
                flight_type: s("uçuş_tipi"),
                baggage: s("bagaj_hakkı"),
                duration: s("uçuş_süresi"),
            },
            bus_trips: BusTripColumns {
                person_id: s("yolcu_id"),
                company: s("firma"),
                origin: s("kalkış_şehri"),
                destination: s("varış_şehri"),
                travel_date: s("seyahat_tarihi"),
                seat_no: s("koltuk_no"),
                fare: s("bilet_ücreti"),
                bus_type: s("sefer_tipi"),
                duration: s("tahmini_süre"),
            },
        }
    }

    /// Column names equal to the English record field names.
    pub fn english() -> Self {
        Self {
            people: PersonColumns {
                id: s("id"),
                first_name: s("first_name"),
                last_name: s("last_name"),
                age: s("age"),
                gender: s("gender"),
                email: s("email"),
                phone: s("phone"),
            },
            hotel_stays: HotelStayColumns {
                person_id: s("person_id"),
                hotel: s("hotel"),
                city: s("city"),
                check_in: s("check_in"),
                duration: s("duration"),
                room_type: s("room_type"),
                daily_rate: s("daily_rate"),
                breakfast_included: s("breakfast_included"),
                all_inclusive: s("all_inclusive"),
            },
            flights: FlightColumns {
                person_id: s("person_id"),
                airline: s("airline"),
                origin: s("origin"),
                destination: s("destination"),
                flight_date: s("flight_date"),
                class: s("class"),
                fare: s("fare"),
                flight_type: s("flight_type"),
                baggage: s("baggage"),
                duration: s("duration"),
            },
            bus_trips: BusTripColumns {
                person_id: s("person_id"),
                company: s("company"),
                origin: s("origin"),
                destination: s("destination"),
                travel_date: s("travel_date"),
                seat_no: s("seat_no"),
                fare: s("fare"),
                bus_type: s("bus_type"),
                duration: s("duration"),
            },
        }
    }
}

impl PersonColumns {
    /// `(field, column)` pairs.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("id", self.id.as_str()),
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
            ("age", self.age.as_str()),
            ("gender", self.gender.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
        ]
    }
}

impl HotelStayColumns {
    /// `(field, column)` pairs.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("person_id", self.person_id.as_str()),
            ("hotel", self.hotel.as_str()),
            ("city", self.city.as_str()),
            ("check_in", self.check_in.as_str()),
            ("duration", self.duration.as_str()),
            ("room_type", self.room_type.as_str()),
            ("daily_rate", self.daily_rate.as_str()),
            ("breakfast_included", self.breakfast_included.as_str()),
            ("all_inclusive", self.all_inclusive.as_str()),
        ]
    }
}

impl FlightColumns {
    /// `(field, column)` pairs.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("person_id", self.person_id.as_str()),
            ("airline", self.airline.as_str()),
            ("origin", self.origin.as_str()),
            ("destination", self.destination.as_str()),
            ("flight_date", self.flight_date.as_str()),
            ("class", self.class.as_str()),
            ("fare", self.fare.as_str()),
            ("flight_type", self.flight_type.as_str()),
            ("baggage", self.baggage.as_str()),
            ("duration", self.duration.as_str()),
        ]
    }
}

impl BusTripColumns {
    /// `(field, column)` pairs.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("person_id", self.person_id.as_str()),
            ("company", self.company.as_str()),
            ("origin", self.origin.as_str()),
            ("destination", self.destination.as_str()),
            ("travel_date", self.travel_date.as_str()),
            ("seat_no", self.seat_no.as_str()),
            ("fare", self.fare.as_str()),
            ("bus_type", self.bus_type.as_str()),
            ("duration", self.duration.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_turkish_contract() {
        let mapping = ColumnMapping::default();
        assert_eq!(mapping.hotel_stays.hotel, "otel_adı");
        assert_eq!(mapping.flights.destination, "varış_şehri");
        assert_eq!(mapping.bus_trips.duration, "tahmini_süre");
    }

    #[test]
    fn test_partial_yaml_override() {
        let yaml = "people:\n  id: kimlik\n  first_name: ad\n  last_name: soyad\n  age: yaş\n  gender: cinsiyet\n  email: eposta\n  phone: telefon\n";
        let mapping: ColumnMapping = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(mapping.people.id, "kimlik");
        assert_eq!(mapping.people.email, "eposta");
        assert_eq!(mapping.flights, ColumnMapping::turkish().flights);
    }
}

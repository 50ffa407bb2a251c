//! Tabular source reading.
//!
//! Each source file is read with `csv`; headers are resolved through the
//! [`ColumnMapping`] once per file, then every data row is parsed into a
//! typed record. A row that fails to parse is kept as an
//! `IngestionRowError` and the rest of the file is still read.

use crate::ingest::columns::{
    BusTripColumns, ColumnMapping, FlightColumns, HotelStayColumns, PersonColumns, SourceFiles,
};
use crate::types::{
    BusTripRecord, FlightRecord, GraphRagError, HotelStayRecord, PersonRecord, RecordSet, Result,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Parsed rows of one record set.
#[derive(Debug)]
pub struct RecordBatch<T> {
    pub set: RecordSet,
    /// Parsed records with their 1-based row number
    pub records: Vec<(usize, T)>,
    /// Rows that could not be parsed (`IngestionRowError`)
    pub rejected: Vec<GraphRagError>,
}

impl<T> RecordBatch<T> {
    pub fn new(set: RecordSet) -> Self {
        Self {
            set,
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Batch from already-parsed records, numbered from 1.
    pub fn from_records(set: RecordSet, records: Vec<T>) -> Self {
        Self {
            set,
            records: records.into_iter().enumerate().map(|(i, r)| (i + 1, r)).collect(),
            rejected: Vec::new(),
        }
    }

    /// Rows seen, parsed or not.
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Explicit paths of the four source files.
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub people: PathBuf,
    pub hotel_stays: PathBuf,
    pub flights: PathBuf,
    pub bus_trips: PathBuf,
}

impl SourcePaths {
    /// Paths of the configured file names inside `dir`.
    pub fn in_dir(dir: &Path, files: &SourceFiles) -> Self {
        Self {
            people: dir.join(&files.people),
            hotel_stays: dir.join(&files.hotel_stays),
            flights: dir.join(&files.flights),
            bus_trips: dir.join(&files.bus_trips),
        }
    }
}

/// The four record sets of one ingestion run.
#[derive(Debug)]
pub struct RecordSets {
    pub people: RecordBatch<PersonRecord>,
    pub hotel_stays: RecordBatch<HotelStayRecord>,
    pub flights: RecordBatch<FlightRecord>,
    pub bus_trips: RecordBatch<BusTripRecord>,
}

impl RecordSets {
    /// Record sets from in-memory records.
    pub fn from_records(
        people: Vec<PersonRecord>,
        hotel_stays: Vec<HotelStayRecord>,
        flights: Vec<FlightRecord>,
        bus_trips: Vec<BusTripRecord>,
    ) -> Self {
        Self {
            people: RecordBatch::from_records(RecordSet::People, people),
            hotel_stays: RecordBatch::from_records(RecordSet::HotelStays, hotel_stays),
            flights: RecordBatch::from_records(RecordSet::Flights, flights),
            bus_trips: RecordBatch::from_records(RecordSet::BusTrips, bus_trips),
        }
    }

    /// Read the four files of a data directory by their configured names.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::ConfigError` if a file is missing or lacks a mapped column
    pub fn from_dir(dir: &Path, files: &SourceFiles, mapping: &ColumnMapping) -> Result<Self> {
        Self::from_paths(&SourcePaths::in_dir(dir, files), mapping)
    }

    /// Read the four files from explicit paths.
    pub fn from_paths(paths: &SourcePaths, mapping: &ColumnMapping) -> Result<Self> {
        Ok(Self {
            people: read_people(open(&paths.people)?, &mapping.people)?,
            hotel_stays: read_hotel_stays(open(&paths.hotel_stays)?, &mapping.hotel_stays)?,
            flights: read_flights(open(&paths.flights)?, &mapping.flights)?,
            bus_trips: read_bus_trips(open(&paths.bus_trips)?, &mapping.bus_trips)?,
        })
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(|e| GraphRagError::ConfigError(format!("cannot open {}: {}", path.display(), e)))
}

/// Read person rows.
pub fn read_people<R: Read>(reader: R, columns: &PersonColumns) -> Result<RecordBatch<PersonRecord>> {
    read_batch(reader, RecordSet::People, &columns.pairs(), |f| {
        let first = f.text("first_name");
        let last = f.text("last_name");
        Ok(PersonRecord {
            id: f.int("id")?,
            name: format!("{} {}", first, last).trim().to_string(),
            age: f.int("age")?,
            gender: f.text("gender"),
            email: f.text("email"),
            phone: f.text("phone"),
        })
    })
}

/// Read hotel stay rows.
pub fn read_hotel_stays<R: Read>(
    reader: R,
    columns: &HotelStayColumns,
) -> Result<RecordBatch<HotelStayRecord>> {
    read_batch(reader, RecordSet::HotelStays, &columns.pairs(), |f| {
        Ok(HotelStayRecord {
            person_id: f.int("person_id")?,
            hotel: f.required("hotel")?,
            city: f.required("city")?,
            check_in: f.date("check_in"),
            duration: f.int("duration")?,
            room_type: f.text("room_type"),
            daily_rate: f.float("daily_rate")?,
            breakfast_included: f.flag("breakfast_included")?,
            all_inclusive: f.flag("all_inclusive")?,
        })
    })
}

/// Read flight rows.
pub fn read_flights<R: Read>(reader: R, columns: &FlightColumns) -> Result<RecordBatch<FlightRecord>> {
    read_batch(reader, RecordSet::Flights, &columns.pairs(), |f| {
        Ok(FlightRecord {
            person_id: f.int("person_id")?,
            airline: f.required("airline")?,
            origin: f.required("origin")?,
            destination: f.required("destination")?,
            flight_date: f.date("flight_date"),
            class: f.text("class"),
            fare: f.float("fare")?,
            flight_type: f.text("flight_type"),
            baggage: f.text("baggage"),
            duration: f.text("duration"),
        })
    })
}

/// Read bus trip rows.
pub fn read_bus_trips<R: Read>(reader: R, columns: &BusTripColumns) -> Result<RecordBatch<BusTripRecord>> {
    read_batch(reader, RecordSet::BusTrips, &columns.pairs(), |f| {
        Ok(BusTripRecord {
            person_id: f.int("person_id")?,
            company: f.required("company")?,
            origin: f.required("origin")?,
            destination: f.required("destination")?,
            travel_date: f.date("travel_date"),
            seat_no: f.text("seat_no"),
            fare: f.float("fare")?,
            bus_type: f.text("bus_type"),
            duration: f.text("duration"),
        })
    })
}

/// One data row with header positions resolved.
struct Fields<'r> {
    record: &'r csv::StringRecord,
    index: &'r HashMap<&'static str, usize>,
}

impl Fields<'_> {
    fn raw(&self, field: &str) -> &str {
        self.index
            .get(field)
            .and_then(|i| self.record.get(*i))
            .map(str::trim)
            .unwrap_or("")
    }

    fn text(&self, field: &str) -> String {
        self.raw(field).to_string()
    }

    fn required(&self, field: &str) -> std::result::Result<String, String> {
        match self.raw(field) {
            "" => Err(format!("{} is empty", field)),
            v => Ok(v.to_string()),
        }
    }

    fn int(&self, field: &str) -> std::result::Result<i64, String> {
        parse_int(self.raw(field)).ok_or_else(|| format!("{} is not an integer: '{}'", field, self.raw(field)))
    }

    fn float(&self, field: &str) -> std::result::Result<f64, String> {
        parse_float(self.raw(field)).ok_or_else(|| format!("{} is not a number: '{}'", field, self.raw(field)))
    }

    fn flag(&self, field: &str) -> std::result::Result<bool, String> {
        parse_bool(self.raw(field)).ok_or_else(|| format!("{} is not a boolean: '{}'", field, self.raw(field)))
    }

    /// ISO date when the cell parses, otherwise the cell as written.
    fn date(&self, field: &str) -> String {
        let raw = self.raw(field);
        normalize_date(raw).unwrap_or_else(|| raw.to_string())
    }
}

fn read_batch<R, T, F>(
    reader: R,
    set: RecordSet,
    pairs: &[(&'static str, &str)],
    parse: F,
) -> Result<RecordBatch<T>>
where
    R: Read,
    F: Fn(&Fields<'_>) -> std::result::Result<T, String>,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut index = HashMap::new();
    let mut missing = Vec::new();
    for (field, column) in pairs {
        match headers.iter().position(|h| h == *column) {
            Some(pos) => {
                index.insert(*field, pos);
            }
            None => missing.push(*column),
        }
    }
    if !missing.is_empty() {
        return Err(GraphRagError::ConfigError(format!(
            "{}: missing column(s) {}",
            set,
            missing.join(", ")
        )));
    }

    let mut batch = RecordBatch::new(set);
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let parsed = match &result {
            Ok(record) => parse(&Fields { record, index: &index }),
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(record) => batch.records.push((row, record)),
            Err(reason) => batch.rejected.push(GraphRagError::row(set, row, reason)),
        }
    }
    Ok(batch)
}

/// Integer, accepting a float rendering with no fraction (`35.0`).
pub fn parse_int(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        let f = raw.parse::<f64>().ok()?;
        (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
    })
}

/// Float, accepting a decimal comma (`1450,50`).
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .or_else(|| raw.replace(',', ".").parse::<f64>().ok())
        .filter(|f| f.is_finite())
}

/// Boolean in English, Turkish or numeric form.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "evet" | "e" => Some(true),
        "false" | "0" | "no" | "n" | "hayır" | "hayir" | "h" => Some(false),
        _ => None,
    }
}

/// Normalize a date to ISO `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &str = "\
id,ad,soyad,yaş,cinsiyet,email,telefon
1,Ali,Veli,34,E,ali@example.com,5551112233
2,Ayşe,Kaya,otuz,K,ayse@example.com,5554445566
3,Mehmet,O'Brien,41,E,mehmet@example.com,5550001122
";

    #[test]
    fn test_people_skip_bad_rows() {
        let batch = read_people(PEOPLE.as_bytes(), &ColumnMapping::turkish().people).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].1.name, "Ali Veli");
        assert_eq!(batch.records[1].0, 3);
        assert_eq!(batch.records[1].1.name, "Mehmet O'Brien");

        match &batch.rejected[0] {
            GraphRagError::IngestionRowError { record_set, row, reason } => {
                assert_eq!(*record_set, RecordSet::People);
                assert_eq!(*row, 2);
                assert!(reason.contains("age"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_column_fails_whole_file() {
        let csv = "id,ad,soyad\n1,Ali,Veli\n";
        let err = read_people(csv.as_bytes(), &ColumnMapping::turkish().people).unwrap_err();
        assert!(matches!(err, GraphRagError::ConfigError(ref m) if m.contains("yaş")));
    }

    #[test]
    fn test_hotel_stay_normalization() {
        let csv = "\
müşteri_id,otel_adı,şehir,giriş_tarihi,kalış_süresi,oda_tipi,günlük_ücret,kahvaltı_dahil,all_inclusive
1,Grand Otel,İstanbul,15.06.2023,3,Deluxe,\"1250,50\",Evet,False
";
        let batch = read_hotel_stays(csv.as_bytes(), &ColumnMapping::turkish().hotel_stays).unwrap();
        assert!(batch.rejected.is_empty());
        let stay = &batch.records[0].1;
        assert_eq!(stay.check_in, "2023-06-15");
        assert_eq!(stay.daily_rate, 1250.5);
        assert!(stay.breakfast_included);
        assert!(!stay.all_inclusive);
    }

    #[test]
    fn test_unparsed_dates_are_kept_as_written() {
        let csv = "\
yolcu_id,havayolu,kalkış_şehri,varış_şehri,uçuş_tarihi,uçuş_sınıfı,bilet_ücreti,uçuş_tipi,bagaj_hakkı,uçuş_süresi
1,THY,Ankara,İstanbul,2023-06-15T10:00,Economy,1450,Domestic,20kg,1h
2,THY,Ankara,İzmir,,Economy,900,Domestic,20kg,1h
3,THY,Ankara,Bodrum,01.03.2024,Economy,900,Domestic,20kg,1h
";
        let batch = read_flights(csv.as_bytes(), &ColumnMapping::turkish().flights).unwrap();
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.records[0].1.flight_date, "2023-06-15T10:00");
        assert_eq!(batch.records[1].1.flight_date, "");
        assert_eq!(batch.records[2].1.flight_date, "2024-03-01");
    }

    #[test]
    fn test_english_mapping() {
        let csv = "\
person_id,company,origin,destination,travel_date,seat_no,fare,bus_type,duration
2,Metro,Ankara,İstanbul,2024/01/05,12,350,Express,6h
";
        let batch = read_bus_trips(csv.as_bytes(), &ColumnMapping::english().bus_trips).unwrap();
        let trip = &batch.records[0].1;
        assert_eq!(trip.travel_date, "2024-01-05");
        assert_eq!(trip.seat_no, "12");
        assert_eq!(trip.destination, "İstanbul");
    }

    #[test]
    fn test_scalar_parsers() {
        assert_eq!(parse_int("35.0"), Some(35));
        assert_eq!(parse_int("35.5"), None);
        assert_eq!(parse_bool("HAYIR"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(normalize_date("01/02/2024").as_deref(), Some("2024-02-01"));
        assert_eq!(normalize_date("2024-13-01"), None);
    }
}

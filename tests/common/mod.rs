//! Shared fixtures: embedded graph in a temp dir, record builders and a
//! deterministic text generator.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use travel_graph::config::{IngestConfig, LlmConfig, QueryConfig};
use travel_graph::ingest::{IngestPipeline, LoadSummary, RecordSets};
use travel_graph::llm::{Prompt, TextGenerator};
use travel_graph::schema::SchemaBootstrapper;
use travel_graph::store::{EmbeddedStore, GraphClient, GraphStore, Statement, StatementKind};
use travel_graph::types::{BusTripRecord, FlightRecord, HotelStayRecord, PersonRecord, Result, Row};
use travel_graph::QaService;

/// Embedded graph that lives as long as its temp dir.
pub struct TestGraph {
    pub dir: TempDir,
    pub graph: GraphClient,
}

pub fn open_graph() -> TestGraph {
    let dir = tempfile::tempdir().unwrap();
    let store = EmbeddedStore::open(dir.path()).unwrap();
    let graph = GraphClient::new(Arc::new(store), Duration::from_secs(10));
    TestGraph { dir, graph }
}

/// Ensure constraints, then load.
pub async fn load(graph: &GraphClient, sets: &RecordSets, rebuild: bool) -> LoadSummary {
    SchemaBootstrapper::new(graph).ensure_constraints().await;
    IngestPipeline::new(graph, &IngestConfig::default())
        .with_rebuild(rebuild)
        .load_all(sets)
        .await
        .unwrap()
}

pub fn person(id: i64, name: &str) -> PersonRecord {
    PersonRecord {
        id,
        name: name.to_string(),
        age: 30 + id,
        gender: if id % 2 == 0 { "K" } else { "E" }.to_string(),
        email: format!("person{}@example.com", id),
        phone: format!("555000{:04}", id),
    }
}

pub fn stay(person_id: i64, hotel: &str, city: &str, check_in: &str) -> HotelStayRecord {
    HotelStayRecord {
        person_id,
        hotel: hotel.to_string(),
        city: city.to_string(),
        check_in: check_in.to_string(),
        duration: 3,
        room_type: "Deluxe".to_string(),
        daily_rate: 1250.0,
        breakfast_included: true,
        all_inclusive: false,
    }
}

pub fn flight(person_id: i64, origin: &str, destination: &str, date: &str) -> FlightRecord {
    FlightRecord {
        person_id,
        airline: "THY".to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        flight_date: date.to_string(),
        class: "Economy".to_string(),
        fare: 1450.0,
        flight_type: "Domestic".to_string(),
        baggage: "20kg".to_string(),
        duration: "1h 10m".to_string(),
    }
}

pub fn bus(person_id: i64, origin: &str, destination: &str, date: &str) -> BusTripRecord {
    BusTripRecord {
        person_id,
        company: "Metro Turizm".to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        travel_date: date.to_string(),
        seat_no: "12".to_string(),
        fare: 350.0,
        bus_type: "Express".to_string(),
        duration: "6h".to_string(),
    }
}

/// Planner reply selecting a pattern.
pub fn selection(pattern: &str, name1: &str, name2: &str) -> String {
    serde_json::json!({
        "pattern": pattern,
        "name1": name1,
        "name2": name2,
        "reasoning": "scripted"
    })
    .to_string()
}

/// Deterministic generator.
///
/// JSON prompts (translation) are answered from `replies` in order; text
/// prompts (synthesis) are answered with prose listing every required term.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn translation_calls(&self) -> usize {
        self.prompts.lock().unwrap().iter().filter(|p| p.json_output).count()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if prompt.json_output {
            return Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default());
        }
        let terms = prompt
            .user
            .lines()
            .find_map(|line| line.strip_prefix("The answer must mention: "))
            .unwrap_or("");
        Ok(format!("According to the travel records: {}.", terms))
    }
}

/// Store wrapper counting pattern executions.
pub struct CountingStore {
    pub inner: Arc<dyn GraphStore>,
    pub pattern_calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.pattern_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphStore for CountingStore {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        if matches!(statement.kind, StatementKind::Pattern(_)) {
            self.pattern_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.execute(statement).await
    }

    fn backend(&self) -> &'static str {
        "counting"
    }
}

pub fn qa_service(graph: &GraphClient, generator: Arc<dyn TextGenerator>) -> QaService {
    QaService::new(graph.clone(), generator, &LlmConfig::default(), &QueryConfig::default())
}

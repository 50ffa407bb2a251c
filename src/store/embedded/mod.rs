//! Embedded graph store on RocksDB.
//!
//! Persists nodes and relationships in column families and interprets the
//! statement catalog natively, with the semantics of the Cypher text:
//! - `Person` creation is strict (duplicate id is a constraint violation)
//! - shared nodes (Hotel, City, Airline, BusCompany) are create-if-absent
//! - `LOCATED_IN` is merged, travel and stay relationships are always created
//! - each statement commits as one atomic write batch
//!
//! # Column families
//!
//! - `nodes`: `node:{label}:{key}` -> bincode `NodeRecord`
//! - `edges`: `edge:{seq}` -> bincode `EdgeRecord`
//! - `meta`: constraint markers, merged-edge markers, edge sequence

pub mod eval;
pub mod keys;

use crate::query::PatternId;
use crate::schema::{NodeLabel, RelType};
use crate::store::{GraphStore, Statement, StatementKind};
use crate::types::record::text_param;
use crate::types::{GraphRagError, Params, PropertyValue, Result, Row};
use async_trait::async_trait;
use eval::{EdgeRecord, NodeRecord, NodeRef, PatternArgs, Snapshot};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Column family names
pub const CF_NODES: &str = "nodes";
pub const CF_EDGES: &str = "edges";
pub const CF_META: &str = "meta";

/// RocksDB-backed graph store.
///
/// Cheap to clone; clones share the database handle, the edge sequence and
/// the write lock. Statements run on the blocking thread pool.
#[derive(Clone)]
pub struct EmbeddedStore {
    db: Arc<DB>,
    seq: Arc<AtomicU64>,
    /// Serializes read-check-write sequences (uniqueness, create-if-absent).
    write_lock: Arc<Mutex<()>>,
}

/// Write batch under construction for one statement.
///
/// Tracks nodes already staged so repeated merges inside one statement
/// (origin == destination) do not double count.
struct StagedWrite<'a> {
    store: &'a EmbeddedStore,
    batch: WriteBatch,
    staged: Vec<Vec<u8>>,
}

impl<'a> StagedWrite<'a> {
    fn new(store: &'a EmbeddedStore) -> Self {
        Self {
            store,
            batch: WriteBatch::default(),
            staged: Vec::new(),
        }
    }

    /// Create the node if no node with this label and key exists.
    fn merge_node(&mut self, label: NodeLabel, key: &str) -> Result<NodeRef> {
        let node_key = keys::encode_node_key(label, key);
        if !self.staged.contains(&node_key) && !self.store.exists(CF_NODES, &node_key)? {
            let mut properties = Params::new();
            properties.insert(label.key_property().to_string(), PropertyValue::from(key));
            let record = NodeRecord {
                label,
                key: key.to_string(),
                properties,
            };
            self.batch
                .put_cf(self.store.cf(CF_NODES)?, &node_key, bincode::serialize(&record)?);
            self.staged.push(node_key);
        }
        Ok(NodeRef::new(label, key))
    }

    /// Create a relationship.
    fn create_edge(&mut self, rel_type: RelType, src: NodeRef, dst: NodeRef, properties: Params) -> Result<()> {
        let seq = self.store.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let record = EdgeRecord {
            seq,
            rel_type,
            src,
            dst,
            properties,
        };
        self.batch
            .put_cf(self.store.cf(CF_EDGES)?, keys::encode_edge_key(seq), bincode::serialize(&record)?);
        self.batch
            .put_cf(self.store.cf(CF_META)?, keys::SEQ_KEY, seq.to_be_bytes());
        Ok(())
    }

    /// Create the relationship unless one already exists between the same nodes.
    fn merge_edge(&mut self, rel_type: RelType, src: NodeRef, dst: NodeRef) -> Result<()> {
        let marker = keys::encode_merge_key(rel_type, (src.label, &src.key), (dst.label, &dst.key));
        if self.staged.contains(&marker) || self.store.exists(CF_META, &marker)? {
            return Ok(());
        }
        self.batch.put_cf(self.store.cf(CF_META)?, &marker, b"");
        self.staged.push(marker);
        self.create_edge(rel_type, src, dst, Params::new())
    }

    fn commit(self) -> Result<()> {
        self.store.db.write(self.batch)?;
        Ok(())
    }
}

impl EmbeddedStore {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::StorageError` if RocksDB cannot open the directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_NODES, Options::default()),
            ColumnFamilyDescriptor::new(CF_EDGES, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)?;
        let store = Self {
            db: Arc::new(db),
            seq: Arc::new(AtomicU64::new(0)),
            write_lock: Arc::new(Mutex::new(())),
        };

        let last_seq = match store.db.get_cf(store.cf(CF_META)?, keys::SEQ_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| GraphRagError::InternalError("corrupt edge sequence".to_string()))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        store.seq.store(last_seq, Ordering::SeqCst);

        info!(path = %path.as_ref().display(), last_seq, "opened embedded graph store");
        Ok(store)
    }

    /// Get column family handle.
    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| GraphRagError::InternalError(format!("CF not found: {}", name)))
    }

    fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        Ok(self.db.get_pinned_cf(self.cf(cf_name)?, key)?.is_some())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| GraphRagError::InternalError("embedded store lock poisoned".to_string()))
    }

    /// Collect all keys in a column family, optionally restricted to a prefix.
    fn keys_in(&self, cf_name: &str, prefix: Option<&[u8]>) -> Result<Vec<Box<[u8]>>> {
        let mut keys = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf_name)?, IteratorMode::Start) {
            let (key, _) = item?;
            if prefix.map(|p| key.starts_with(p)).unwrap_or(true) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn person_exists(&self, id: i64) -> Result<bool> {
        self.exists(CF_NODES, &keys::encode_node_key(NodeLabel::Person, &id.to_string()))
    }

    fn create_constraint(&self, params: &Params) -> Result<Vec<Row>> {
        let name = required_text(params, "name")?;
        let label: NodeLabel = required_text(params, "label")?
            .parse()
            .map_err(GraphRagError::store)?;
        let property = required_text(params, "property")?;
        if property != label.key_property() {
            return Err(GraphRagError::store(format!(
                "embedded store only supports uniqueness on {}.{}",
                label,
                label.key_property()
            )));
        }
        self.db
            .put_cf(self.cf(CF_META)?, keys::encode_constraint_key(name), label.as_str())?;
        Ok(Vec::new())
    }

    fn wipe_all(&self) -> Result<Vec<Row>> {
        let _guard = self.lock()?;
        let mut batch = WriteBatch::default();
        for key in self.keys_in(CF_NODES, None)? {
            batch.delete_cf(self.cf(CF_NODES)?, key);
        }
        for key in self.keys_in(CF_EDGES, None)? {
            batch.delete_cf(self.cf(CF_EDGES)?, key);
        }
        for key in self.keys_in(CF_META, Some(keys::MERGE_PREFIX))? {
            batch.delete_cf(self.cf(CF_META)?, key);
        }
        self.db.write(batch)?;
        Ok(Vec::new())
    }

    fn create_person(&self, params: &Params) -> Result<Vec<Row>> {
        let id = required_int(params, "id")?;
        let _guard = self.lock()?;
        let key = keys::encode_node_key(NodeLabel::Person, &id.to_string());
        if self.exists(CF_NODES, &key)? {
            return Err(GraphRagError::store(format!(
                "Node(Person) already exists with label `Person` and property `id` = {}",
                id
            )));
        }
        let record = NodeRecord {
            label: NodeLabel::Person,
            key: id.to_string(),
            properties: params.clone(),
        };
        self.db.put_cf(self.cf(CF_NODES)?, key, bincode::serialize(&record)?)?;
        Ok(Vec::new())
    }

    fn create_hotel_stay(&self, params: &Params) -> Result<Vec<Row>> {
        let person_id = required_int(params, "person_id")?;
        let hotel = required_text(params, "hotel")?;
        let city = required_text(params, "city")?;

        let _guard = self.lock()?;
        if !self.person_exists(person_id)? {
            return Ok(vec![created_row(0)]);
        }

        let mut write = StagedWrite::new(self);
        let hotel_ref = write.merge_node(NodeLabel::Hotel, hotel)?;
        let city_ref = write.merge_node(NodeLabel::City, city)?;
        write.create_edge(
            RelType::StayedAt,
            NodeRef::new(NodeLabel::Person, person_id.to_string()),
            hotel_ref.clone(),
            relationship_properties(params, RelType::StayedAt),
        )?;
        write.merge_edge(RelType::LocatedIn, hotel_ref, city_ref)?;
        write.commit()?;
        Ok(vec![created_row(1)])
    }

    fn create_trip(&self, params: &Params, rel_type: RelType, operator: NodeLabel, operator_key: &str) -> Result<Vec<Row>> {
        let person_id = required_int(params, "person_id")?;
        let operator_name = required_text(params, operator_key)?;
        let origin = required_text(params, "origin")?;
        let destination = required_text(params, "destination")?;

        let _guard = self.lock()?;
        if !self.person_exists(person_id)? {
            return Ok(vec![created_row(0)]);
        }

        let mut write = StagedWrite::new(self);
        write.merge_node(operator, operator_name)?;
        write.merge_node(NodeLabel::City, origin)?;
        let dst = write.merge_node(NodeLabel::City, destination)?;
        write.create_edge(
            rel_type,
            NodeRef::new(NodeLabel::Person, person_id.to_string()),
            dst,
            relationship_properties(params, rel_type),
        )?;
        write.commit()?;
        Ok(vec![created_row(1)])
    }

    fn count_graph(&self) -> Result<Vec<Row>> {
        let nodes = self.keys_in(CF_NODES, None)?.len();
        let relationships = self.keys_in(CF_EDGES, None)?.len();
        Ok(vec![to_row(json!({ "nodes": nodes, "relationships": relationships }))])
    }

    /// Load person names and all edges.
    fn snapshot(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();
        let person_prefix = keys::encode_label_prefix(NodeLabel::Person);
        for item in self.db.iterator_cf(self.cf(CF_NODES)?, IteratorMode::Start) {
            let (key, value) = item?;
            if !key.starts_with(&person_prefix) {
                continue;
            }
            let node: NodeRecord = bincode::deserialize(&value)?;
            let name = text_param(&node.properties, "name").unwrap_or_default().to_string();
            snapshot.people.insert(node.key, name);
        }
        for item in self.db.iterator_cf(self.cf(CF_EDGES)?, IteratorMode::Start) {
            let (_, value) = item?;
            snapshot.edges.push(bincode::deserialize(&value)?);
        }
        Ok(snapshot)
    }

    fn run_pattern(&self, pattern: PatternId, params: &Params) -> Result<Vec<Row>> {
        let name1 = required_text(params, "name1")?;
        let name2 = required_text(params, "name2")?;
        let limit = usize::try_from(required_int(params, "limit")?)
            .map_err(|_| GraphRagError::store("limit must be non-negative"))?;

        let snapshot = self.snapshot()?;
        debug!(
            pattern = pattern.as_str(),
            people = snapshot.people.len(),
            edges = snapshot.edges.len(),
            "evaluating pattern"
        );
        Ok(snapshot.evaluate(pattern, &PatternArgs { name1, name2, limit }))
    }

    /// Run one statement on the calling thread.
    fn execute_blocking(&self, statement: &Statement) -> Result<Vec<Row>> {
        let params = &statement.params;
        match statement.kind {
            StatementKind::CreateConstraint => self.create_constraint(params),
            StatementKind::WipeAll => self.wipe_all(),
            StatementKind::CreatePerson => self.create_person(params),
            StatementKind::CreateHotelStay => self.create_hotel_stay(params),
            StatementKind::CreateFlight => {
                self.create_trip(params, RelType::Flew, NodeLabel::Airline, "airline")
            }
            StatementKind::CreateBusTrip => {
                self.create_trip(params, RelType::TookBus, NodeLabel::BusCompany, "company")
            }
            StatementKind::CountGraph => self.count_graph(),
            StatementKind::Pattern(pattern) => self.run_pattern(pattern, params),
        }
    }
}

#[async_trait]
impl GraphStore for EmbeddedStore {
    /// RocksDB calls block, so each statement is moved to the blocking pool.
    /// The returned future stays pending until it finishes, which lets the
    /// client timeout fire and concurrent record sets overlap.
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        let store = self.clone();
        let statement = statement.clone();
        tokio::task::spawn_blocking(move || store.execute_blocking(&statement))
            .await
            .map_err(|e| GraphRagError::InternalError(format!("embedded store task failed: {}", e)))?
    }

    fn backend(&self) -> &'static str {
        "rocksdb"
    }
}

fn required_text<'a>(params: &'a Params, key: &str) -> Result<&'a str> {
    text_param(params, key).ok_or_else(|| GraphRagError::store(format!("missing text parameter ${}", key)))
}

fn required_int(params: &Params, key: &str) -> Result<i64> {
    params
        .get(key)
        .and_then(PropertyValue::as_int)
        .ok_or_else(|| GraphRagError::store(format!("missing integer parameter ${}", key)))
}

/// Keep only the properties the relationship type carries.
fn relationship_properties(params: &Params, rel_type: RelType) -> Params {
    rel_type
        .properties()
        .iter()
        .filter_map(|k| params.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

fn created_row(created: i64) -> Row {
    to_row(json!({ "created": created }))
}

fn to_row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GraphClient;
    use std::time::Duration;
    use tempfile::tempdir;

    fn person(id: i64, name: &str) -> Statement {
        Statement::new(StatementKind::CreatePerson, "")
            .param("id", id)
            .param("name", name)
    }

    #[tokio::test]
    async fn test_duplicate_person_is_rejected() {
        let dir = tempdir().unwrap();
        let store = EmbeddedStore::open(dir.path()).unwrap();

        store.execute(&person(1, "Ali Veli")).await.unwrap();
        let err = store.execute(&person(1, "Ali Veli")).await.unwrap_err();
        assert!(matches!(err, GraphRagError::StoreError(ref m) if m.contains("already exists")));
    }

    #[tokio::test]
    async fn test_stay_for_missing_person_creates_nothing() {
        let dir = tempdir().unwrap();
        let store = EmbeddedStore::open(dir.path()).unwrap();

        let stay = Statement::new(StatementKind::CreateHotelStay, "")
            .param("person_id", 99_i64)
            .param("hotel", "Grand Otel")
            .param("city", "İzmir");
        let rows = store.execute(&stay).await.unwrap();
        assert_eq!(rows[0]["created"], 0);

        let counts = store.execute(&Statement::count_graph()).await.unwrap();
        assert_eq!(counts[0]["nodes"], 0);
        assert_eq!(counts[0]["relationships"], 0);
    }

    #[tokio::test]
    async fn test_round_trip_flight_with_same_origin_and_destination() {
        let dir = tempdir().unwrap();
        let store = EmbeddedStore::open(dir.path()).unwrap();
        store.execute(&person(1, "Ali Veli")).await.unwrap();

        let flight = Statement::new(StatementKind::CreateFlight, "")
            .param("person_id", 1_i64)
            .param("airline", "THY")
            .param("origin", "Ankara")
            .param("destination", "Ankara");
        store.execute(&flight).await.unwrap();

        let counts = store.execute(&Statement::count_graph()).await.unwrap();
        // Person, Airline, City
        assert_eq!(counts[0]["nodes"], 3);
        assert_eq!(counts[0]["relationships"], 1);
    }

    #[tokio::test]
    async fn test_blocked_write_hits_client_timeout() {
        let dir = tempdir().unwrap();
        let store = EmbeddedStore::open(dir.path()).unwrap();
        let graph = GraphClient::new(Arc::new(store.clone()), Duration::from_millis(200));

        let guard = store.write_lock.lock().unwrap();
        let err = graph.execute(&person(1, "Ali Veli")).await.unwrap_err();
        drop(guard);

        assert!(matches!(err, GraphRagError::StoreError(ref m) if m.contains("timed out")));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_sequence_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = EmbeddedStore::open(dir.path()).unwrap();
            store.execute(&person(1, "Ali Veli")).await.unwrap();
            let bus = Statement::new(StatementKind::CreateBusTrip, "")
                .param("person_id", 1_i64)
                .param("company", "Metro")
                .param("origin", "Bursa")
                .param("destination", "İzmir");
            store.execute(&bus).await.unwrap();
        }
        let store = EmbeddedStore::open(dir.path()).unwrap();
        assert_eq!(store.seq.load(Ordering::SeqCst), 1);
    }
}

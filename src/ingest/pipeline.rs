//! Ingestion pipeline.
//!
//! Order of operations:
//! 1. optional full wipe (rebuild mode), logged before it runs
//! 2. people, one strict create per row
//! 3. hotel stays, flights and bus trips, the three sets concurrently and
//!    each set row by row
//!
//! Step 2 is a barrier: every relationship row matches an existing person.
//! Row failures are skipped and reported; only a failed wipe or a failed
//! final count aborts the run.

use crate::config::IngestConfig;
use crate::ingest::reader::{RecordBatch, RecordSets};
use crate::ingest::statements::{
    create_bus_trip, create_flight, create_hotel_stay, create_person, relationship_created,
};
use crate::store::{GraphClient, GraphCounts, Statement};
use crate::types::{GraphRagError, RecordSet, Result};
use std::fmt;
use tracing::{debug, info, info_span, warn, Instrument};

/// Outcome of loading one record set.
#[derive(Debug)]
pub struct SetSummary {
    pub record_set: RecordSet,
    /// Rows read from the source, parsed or not
    pub processed: usize,
    /// Rows that produced graph data
    pub loaded: usize,
    /// Rows rejected during parsing or loading
    pub skipped: usize,
    /// First rejections, in row order of discovery
    pub errors: Vec<GraphRagError>,
    /// Rejections beyond the reported ones
    pub omitted_errors: usize,
    max_errors: usize,
}

impl SetSummary {
    fn new(record_set: RecordSet, max_errors: usize) -> Self {
        Self {
            record_set,
            processed: 0,
            loaded: 0,
            skipped: 0,
            errors: Vec::new(),
            omitted_errors: 0,
            max_errors,
        }
    }

    fn reject(&mut self, error: GraphRagError) {
        debug!(error = %error, "row skipped");
        self.skipped += 1;
        if self.errors.len() < self.max_errors {
            self.errors.push(error);
        } else {
            self.omitted_errors += 1;
        }
    }
}

impl fmt::Display for SetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} loaded, {} skipped",
            self.record_set, self.processed, self.loaded, self.skipped
        )?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        if self.omitted_errors > 0 {
            write!(f, "\n  ... and {} more", self.omitted_errors)?;
        }
        Ok(())
    }
}

/// Outcome of one ingestion run.
#[derive(Debug)]
pub struct LoadSummary {
    /// Whether the graph was wiped first
    pub rebuilt: bool,
    pub people: SetSummary,
    pub hotel_stays: SetSummary,
    pub flights: SetSummary,
    pub bus_trips: SetSummary,
    /// Graph totals after the load
    pub counts: GraphCounts,
}

impl LoadSummary {
    /// Per-set summaries in load order.
    pub fn sets(&self) -> [&SetSummary; 4] {
        [&self.people, &self.hotel_stays, &self.flights, &self.bus_trips]
    }

    /// Rows skipped across all sets.
    pub fn total_skipped(&self) -> usize {
        self.sets().iter().map(|s| s.skipped).sum()
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for set in self.sets() {
            writeln!(f, "{}", set)?;
        }
        write!(
            f,
            "graph: {} nodes, {} relationships",
            self.counts.nodes, self.counts.relationships
        )
    }
}

/// Loads record sets into the graph.
pub struct IngestPipeline<'a> {
    graph: &'a GraphClient,
    rebuild: bool,
    max_reported_errors: usize,
}

impl<'a> IngestPipeline<'a> {
    /// Create a pipeline over a graph client.
    ///
    /// # Arguments
    ///
    /// * `graph` - Graph store client
    /// * `config` - Rebuild flag and error reporting limit
    pub fn new(graph: &'a GraphClient, config: &IngestConfig) -> Self {
        Self {
            graph,
            rebuild: config.rebuild,
            max_reported_errors: config.max_reported_errors,
        }
    }

    /// Override the rebuild flag.
    pub fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    /// Load all four record sets.
    ///
    /// Uniqueness constraints must already be in place.
    ///
    /// # Returns
    ///
    /// `LoadSummary` with per-set counts, first errors and graph totals
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::StoreError` if the wipe or the final count fails
    pub async fn load_all(&self, sets: &RecordSets) -> Result<LoadSummary> {
        if self.rebuild {
            warn!(backend = self.graph.backend(), "rebuild mode: deleting all nodes and relationships");
            self.graph.run(&Statement::wipe_all()).await?;
        }

        let people = self
            .load_people(&sets.people)
            .instrument(info_span!("ingest", record_set = %RecordSet::People))
            .await;

        let (hotel_stays, flights, bus_trips) = tokio::join!(
            self.load_relationships(&sets.hotel_stays, create_hotel_stay, |r| r.person_id)
                .instrument(info_span!("ingest", record_set = %RecordSet::HotelStays)),
            self.load_relationships(&sets.flights, create_flight, |r| r.person_id)
                .instrument(info_span!("ingest", record_set = %RecordSet::Flights)),
            self.load_relationships(&sets.bus_trips, create_bus_trip, |r| r.person_id)
                .instrument(info_span!("ingest", record_set = %RecordSet::BusTrips)),
        );

        let counts = self.graph.counts().await?;
        info!(
            nodes = counts.nodes,
            relationships = counts.relationships,
            "ingestion complete"
        );

        Ok(LoadSummary {
            rebuilt: self.rebuild,
            people,
            hotel_stays,
            flights,
            bus_trips,
            counts,
        })
    }

    async fn load_people(&self, batch: &RecordBatch<crate::types::PersonRecord>) -> SetSummary {
        let mut summary = self.start(batch);
        for (row, record) in &batch.records {
            match self.graph.run(&create_person(record)).await {
                Ok(()) => summary.loaded += 1,
                Err(e) => summary.reject(GraphRagError::row(batch.set, *row, e.to_string())),
            }
        }
        finish(&summary);
        summary
    }

    async fn load_relationships<T>(
        &self,
        batch: &RecordBatch<T>,
        build: fn(&T) -> Statement,
        person_id: fn(&T) -> i64,
    ) -> SetSummary {
        let mut summary = self.start(batch);
        for (row, record) in &batch.records {
            match self.graph.execute(&build(record)).await {
                Ok(rows) if relationship_created(&rows) => summary.loaded += 1,
                Ok(_) => summary.reject(GraphRagError::row(
                    batch.set,
                    *row,
                    format!("person {} not found", person_id(record)),
                )),
                Err(e) => summary.reject(GraphRagError::row(batch.set, *row, e.to_string())),
            }
        }
        finish(&summary);
        summary
    }

    /// Summary seeded with the batch's parse rejections.
    fn start<T>(&self, batch: &RecordBatch<T>) -> SetSummary {
        let mut summary = SetSummary::new(batch.set, self.max_reported_errors);
        summary.processed = batch.len();
        for error in &batch.rejected {
            summary.reject(clone_row_error(error));
        }
        summary
    }
}

fn finish(summary: &SetSummary) {
    if summary.skipped > 0 {
        warn!(
            loaded = summary.loaded,
            skipped = summary.skipped,
            "record set loaded with rejected rows"
        );
    } else {
        info!(loaded = summary.loaded, "record set loaded");
    }
}

/// Row errors carry only plain data; other variants are flattened to their message.
fn clone_row_error(error: &GraphRagError) -> GraphRagError {
    match error {
        GraphRagError::IngestionRowError { record_set, row, reason } => {
            GraphRagError::row(*record_set, *row, reason.clone())
        }
        other => GraphRagError::InternalError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EmbeddedStore;
    use crate::types::{HotelStayRecord, PersonRecord};
    use std::sync::Arc;
    use std::time::Duration;

    fn person(id: i64, name: &str) -> PersonRecord {
        PersonRecord {
            id,
            name: name.into(),
            age: 30,
            gender: "K".into(),
            email: String::new(),
            phone: String::new(),
        }
    }

    fn stay(person_id: i64) -> HotelStayRecord {
        HotelStayRecord {
            person_id,
            hotel: "Grand Otel".into(),
            city: "İstanbul".into(),
            check_in: "2023-06-15".into(),
            duration: 2,
            room_type: "Standard".into(),
            daily_rate: 900.0,
            breakfast_included: true,
            all_inclusive: false,
        }
    }

    #[tokio::test]
    async fn test_row_failures_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = EmbeddedStore::open(dir.path()).unwrap();
        let graph = GraphClient::new(Arc::new(store), Duration::from_secs(5));
        let config = IngestConfig {
            max_reported_errors: 1,
            ..IngestConfig::default()
        };

        let sets = RecordSets::from_records(
            vec![person(1, "Ali Veli"), person(1, "Ali Veli")],
            vec![stay(1), stay(99), stay(98)],
            vec![],
            vec![],
        );
        let summary = IngestPipeline::new(&graph, &config).load_all(&sets).await.unwrap();

        assert_eq!(summary.people.loaded, 1);
        assert_eq!(summary.people.skipped, 1);
        assert_eq!(summary.hotel_stays.processed, 3);
        assert_eq!(summary.hotel_stays.loaded, 1);
        assert_eq!(summary.hotel_stays.skipped, 2);
        assert_eq!(summary.hotel_stays.errors.len(), 1);
        assert_eq!(summary.hotel_stays.omitted_errors, 1);
        assert!(summary.hotel_stays.errors[0].to_string().contains("person 99 not found"));
        // person, hotel, city; STAYED_AT and LOCATED_IN
        assert_eq!(summary.counts, GraphCounts { nodes: 3, relationships: 2 });
    }
}

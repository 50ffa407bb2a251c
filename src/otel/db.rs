//! Graph statement instrumentation.

use crate::store::Statement;
use tracing::{field, span, Level, Span};

/// Create a span for one graph statement.
///
/// # Arguments
///
/// * `statement` - Statement about to run (its text is recorded, its params are not)
/// * `backend` - Backend name (`neo4j`, `rocksdb`)
///
/// # Returns
///
/// Tracing span with database semantic attributes
///
/// # Example
///
/// ```rust,ignore
/// let span = statement_span(&Statement::count_graph(), "neo4j");
/// let rows = store.execute(&stmt).instrument(span).await?;
/// ```
pub fn statement_span(statement: &Statement, backend: &str) -> Span {
    let operation = statement.kind.operation();
    let target = statement.kind.target();

    span!(
        Level::INFO,
        "db",
        otel.name = %format!("{} {}", operation, target),
        otel.kind = "client",
        db.system.name = backend,
        db.operation.name = operation,
        db.collection.name = target,
        db.query.text = statement.text.as_str(),
        db.response.returned_rows = field::Empty,
        db.response.affected_rows = field::Empty,
    )
}

/// Record row counts on the current span.
///
/// # Arguments
///
/// * `rows_returned` - Rows the statement returned (optional)
/// * `rows_affected` - Nodes/relationships written (optional)
pub fn record_db_metrics(rows_returned: Option<usize>, rows_affected: Option<usize>) {
    let span = Span::current();
    if let Some(returned) = rows_returned {
        span.record("db.response.returned_rows", returned);
    }
    if let Some(affected) = rows_affected {
        span.record("db.response.affected_rows", affected);
    }
}

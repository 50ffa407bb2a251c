//! Uniqueness constraint bootstrap.
//!
//! Issues one constraint per node label before any data is loaded. Each
//! issuance is independent: a failure is logged and recorded, and the
//! remaining constraints are still attempted.

use crate::schema::NodeLabel;
use crate::store::{GraphClient, Statement, StatementKind};
use crate::types::GraphRagError;
use tracing::{info, warn};

/// Outcome of a bootstrap run.
#[derive(Debug, Default)]
pub struct ConstraintReport {
    /// Constraints confirmed present
    pub ensured: Vec<&'static str>,
    /// Constraints that could not be created (`ConstraintError`)
    pub failed: Vec<GraphRagError>,
}

impl ConstraintReport {
    /// `true` if every constraint is in place.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Issues uniqueness constraints.
pub struct SchemaBootstrapper<'a> {
    graph: &'a GraphClient,
}

impl<'a> SchemaBootstrapper<'a> {
    pub fn new(graph: &'a GraphClient) -> Self {
        Self { graph }
    }

    /// Build the constraint statement for one label.
    ///
    /// Label and property come from the fixed schema, never from input.
    pub fn constraint_statement(label: NodeLabel) -> Statement {
        let text = format!(
            "CREATE CONSTRAINT {name} IF NOT EXISTS FOR (n:{label}) REQUIRE n.{property} IS UNIQUE",
            name = label.constraint_name(),
            label = label.as_str(),
            property = label.key_property(),
        );
        Statement::new(StatementKind::CreateConstraint, text)
            .param("name", label.constraint_name())
            .param("label", label.as_str())
            .param("property", label.key_property())
    }

    /// Ensure a uniqueness constraint exists for every node label.
    ///
    /// Never fails as a whole; per-constraint failures are in the report.
    pub async fn ensure_constraints(&self) -> ConstraintReport {
        let mut report = ConstraintReport::default();

        for label in NodeLabel::ALL {
            let statement = Self::constraint_statement(label);
            match self.graph.run(&statement).await {
                Ok(()) => {
                    info!(constraint = label.constraint_name(), "constraint ensured");
                    report.ensured.push(label.constraint_name());
                }
                Err(e) => {
                    warn!(
                        constraint = label.constraint_name(),
                        error = %e,
                        "failed to create constraint, continuing"
                    );
                    report.failed.push(GraphRagError::ConstraintError {
                        constraint: label.constraint_name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

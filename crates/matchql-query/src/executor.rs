//! Script execution against a backend
//!
//! The compiler does not talk to a store itself. A backend implements
//! [`StatementExecutor`] and receives one compiled script per statement,
//! in script order. The first failure stops the run.

use crate::ast::Script;
use crate::compiler::{Compiler, StatementScript, StatementTarget};
use matchql_core::{Error, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Backend receiving compiled statements
pub trait StatementExecutor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute one compiled statement and wait for it to finish
    fn execute(&mut self, script: &StatementScript) -> std::result::Result<(), Self::Error>;
}

/// Execution statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    pub statements_executed: u64,
    pub selects: u64,
    pub vertices_inserted: u64,
    pub edges_inserted: u64,
    pub vertices_deleted: u64,
    pub edges_deleted: u64,
    pub execution_time_ms: u64,
}

impl ExecutionStats {
    fn record(&mut self, target: StatementTarget) {
        self.statements_executed += 1;
        match target {
            StatementTarget::Select => self.selects += 1,
            StatementTarget::InsertVertex => self.vertices_inserted += 1,
            StatementTarget::InsertEdge => self.edges_inserted += 1,
            StatementTarget::DeleteVertex => self.vertices_deleted += 1,
            StatementTarget::DeleteEdge => self.edges_deleted += 1,
        }
    }
}

impl Compiler {
    /// Compile `script` and hand each statement to `executor`
    ///
    /// Every statement is compiled before the first one runs, so a
    /// compilation error never leaves a script half executed.
    pub fn run<E: StatementExecutor>(&self, script: &Script, executor: &mut E) -> Result<ExecutionStats> {
        let start = Instant::now();
        let scripts = self.statement_scripts(script)?;
        let mut stats = ExecutionStats::default();

        for (index, compiled) in scripts.iter().enumerate() {
            debug!("Executing statement {} ({})", index, compiled.target);
            if let Err(e) = executor.execute(compiled) {
                warn!("Statement {} failed: {}", index, e);
                return Err(Error::execution(
                    format!("statement {} ({}) failed", index, compiled.target),
                    e,
                ));
            }
            stats.record(compiled.target);
        }

        stats.execution_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Executed {} statement(s) in {}ms",
            stats.statements_executed, stats.execution_time_ms
        );
        Ok(stats)
    }
}

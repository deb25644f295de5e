//!
//! Query dispatcher
//! ----------------
//! Turns a caller's selection into exactly one backend procedure call and a
//! uniform `QueryResult`. The dispatcher keeps no state between calls: no
//! cache, no retries, no timeout. Every selection is logged under the
//! `dispatch` target with its outcome and the elapsed wall-clock time,
//! whatever the error kind; calls that resolved to a procedure also carry
//! the procedure name.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::backend::ProcedureBackend;
use crate::catalog::{self, CatalogEntry, QueryId};
use crate::error::AppResult;
use crate::result::QueryResult;

#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn ProcedureBackend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ProcedureBackend>) -> Self { Self { backend } }

    pub fn backend(&self) -> &Arc<dyn ProcedureBackend> { &self.backend }

    /// Validate the raw selection and run it. Invalid selections are rejected
    /// before the backend is touched.
    pub async fn execute(&self, raw_id: Option<&str>) -> AppResult<QueryResult> {
        let started = Instant::now();
        let id = match QueryId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    target: "dispatch",
                    raw = ?raw_id,
                    outcome = "rejected",
                    code = e.code_str(),
                    elapsed_ms = elapsed_ms(started),
                    "rejected query selection"
                );
                return Err(e);
            }
        };
        self.dispatch(id, started).await
    }

    pub async fn execute_id(&self, id: QueryId) -> AppResult<QueryResult> {
        self.dispatch(id, Instant::now()).await
    }

    async fn dispatch(&self, id: QueryId, started: Instant) -> AppResult<QueryResult> {
        let entry = match catalog::lookup(id) {
            Ok(e) => e,
            Err(e) => {
                // an in-range id without an entry means the catalog is broken
                error!(
                    target: "dispatch",
                    query_id = id.get(),
                    outcome = "not_found",
                    code = e.code_str(),
                    elapsed_ms = elapsed_ms(started),
                    "catalog has no entry for an in-range id"
                );
                return Err(e);
            }
        };
        self.run(entry, started).await
    }

    async fn run(&self, entry: &'static CatalogEntry, started: Instant) -> AppResult<QueryResult> {
        let outcome = self.backend.call_procedure(entry.procedure).await;
        match outcome {
            Ok(set) => {
                info!(
                    target: "dispatch",
                    query_id = entry.id.get(),
                    procedure = entry.procedure.as_str(),
                    outcome = "ok",
                    rows = set.rows.len(),
                    fields = set.fields.len(),
                    elapsed_ms = elapsed_ms(started),
                    "procedure executed successfully"
                );
                Ok(set.into_result(entry.id))
            }
            Err(e) => {
                error!(
                    target: "dispatch",
                    query_id = entry.id.get(),
                    procedure = entry.procedure.as_str(),
                    outcome = "failed",
                    code = e.code_str(),
                    elapsed_ms = elapsed_ms(started),
                    "procedure failed: {}", e.message()
                );
                Err(e)
            }
        }
    }
}

// Milliseconds with microsecond resolution.
fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1_000_000.0).round() / 1000.0
}

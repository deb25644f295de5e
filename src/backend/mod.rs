//! Backends that can answer a catalog procedure call.
//!
//! The dispatcher only sees `ProcedureBackend`; PostgreSQL is the production
//! implementation and the in-memory one serves fixture files and tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::ProcedureName;
use crate::config::SourceConfig;
use crate::error::{AppError, AppResult};
use crate::result::RowSet;

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::{PgBackend, PgSettings};

#[async_trait]
pub trait ProcedureBackend: Send + Sync + 'static {
    /// Run the zero-argument procedure and return its columns and rows in
    /// the order the backend produced them.
    async fn call_procedure(&self, procedure: ProcedureName) -> AppResult<RowSet>;

    /// Short description for logs and `status` output.
    fn describe(&self) -> String;
}

/// Open the backend a local source points at. Remote sources have no
/// backend here; the CLI talks to them over HTTP instead.
pub async fn open(source: &SourceConfig) -> AppResult<Arc<dyn ProcedureBackend>> {
    match source {
        SourceConfig::Postgres(settings) => Ok(Arc::new(PgBackend::connect(settings).await?)),
        SourceConfig::Fixtures(path) => Ok(Arc::new(MemoryBackend::from_fixture_file(path)?)),
        SourceConfig::Remote(url) => Err(AppError::config(
            "remote_source",
            format!("{} is a remote server, not a procedure backend", url),
        )),
    }
}

//! In-memory backend serving canned row sets keyed by procedure name.
//!
//! Fixture files are JSON objects of the form
//! `{ "<procedure>": { "fields": [..], "rows": [{..}, ..] }, .. }`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::warn;

use super::ProcedureBackend;
use crate::catalog::{self, ProcedureName};
use crate::error::{AppError, AppResult};
use crate::result::RowSet;

#[derive(Default)]
pub struct MemoryBackend {
    sets: HashMap<String, RowSet>,
    failures: HashMap<String, AppError>,
    calls: AtomicU64,
    call_log: Mutex<Vec<String>>,
    source: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    pub fn with_rows(mut self, procedure: &str, set: RowSet) -> Self {
        self.sets.insert(procedure.to_string(), set);
        self
    }

    /// Make every call to `procedure` fail with `err`.
    pub fn with_failure(mut self, procedure: &str, err: AppError) -> Self {
        self.failures.insert(procedure.to_string(), err);
        self
    }

    pub fn from_json_str(text: &str) -> AppResult<Self> {
        let sets: HashMap<String, RowSet> = serde_json::from_str(text)?;
        let known: Vec<&str> = catalog::entries().iter().map(|e| e.procedure.as_str()).collect();
        for name in sets.keys() {
            if !known.contains(&name.as_str()) {
                warn!(target: "backend", "fixture procedure '{}' is not in the catalog and will never be called", name);
            }
        }
        Ok(Self { sets, ..Self::default() })
    }

    pub fn from_fixture_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::config("fixture_unreadable", format!("{}: {}", path.display(), e)))?;
        let mut backend = Self::from_json_str(&text)?;
        backend.source = Some(path.display().to_string());
        Ok(backend)
    }

    /// Total number of procedure calls received.
    pub fn call_count(&self) -> u64 { self.calls.load(Ordering::SeqCst) }

    /// Procedure names in call order.
    pub fn calls(&self) -> Vec<String> {
        // a poisoned log still holds every recorded call
        self.call_log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ProcedureBackend for MemoryBackend {
    async fn call_procedure(&self, procedure: ProcedureName) -> AppResult<RowSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(procedure.as_str().to_string());
        if let Some(err) = self.failures.get(procedure.as_str()) {
            return Err(err.clone());
        }
        self.sets.get(procedure.as_str()).cloned().ok_or_else(|| {
            // same SQLSTATE Postgres reports for an unknown function
            AppError::backend("42883", format!("function {}() does not exist", procedure))
        })
    }

    fn describe(&self) -> String {
        match &self.source {
            Some(path) => format!("fixtures:{}", path),
            None => "memory".to_string(),
        }
    }
}

//! Entry point used by request handlers: one fetch from the data access layer
//! followed by one consolidation.
//!
//! The service owns nothing but a handle to its source. The source's lifecycle
//! (opening, closing, migrating) belongs to whoever constructed it, so several
//! services, or tests, can share one store.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::consolidate::{consolidate, Consolidation};
use crate::error::Result;
use crate::model::PracticeId;
use crate::persist::{PracticePage, PracticeQuery, PreparationSource};
use crate::selection::{Selection, DEFAULT_MAX_PRACTICES};

pub struct PreparationService {
    source: Arc<dyn PreparationSource>,
    max_practices: usize,
}

impl PreparationService {
    pub fn new(source: Arc<dyn PreparationSource>) -> Self {
        Self {
            source,
            max_practices: DEFAULT_MAX_PRACTICES,
        }
    }

    pub fn with_max_practices(mut self, max_practices: usize) -> Self {
        self.max_practices = max_practices;
        self
    }

    pub fn max_practices(&self) -> usize {
        self.max_practices
    }

    /// Consolidates raw identifiers as received from a client.
    pub fn generate(&self, raw_ids: &[Value]) -> Result<Consolidation> {
        let selection = Selection::parse(raw_ids, self.max_practices)?;
        self.generate_for(&selection)
    }

    pub fn generate_for_ids(&self, ids: &[PracticeId]) -> Result<Consolidation> {
        let selection = Selection::new(ids.iter().copied(), self.max_practices)?;
        self.generate_for(&selection)
    }

    pub fn generate_for(&self, selection: &Selection) -> Result<Consolidation> {
        let started = Instant::now();
        let fetched = self.source.practices_with_preparation(selection.ids());
        let fetch_ms = started.elapsed().as_secs_f64() * 1000.0;
        match fetched.and_then(|practices| consolidate(&practices)) {
            Ok(result) => {
                info!(
                    requested = selection.len(),
                    practices = result.details.practice_count,
                    groups = result.details.group_count,
                    instructions = result.details.instruction_count,
                    fetch_ms,
                    "consolidated preparation"
                );
                Ok(result)
            }
            Err(e) if e.is_client_error() => {
                warn!(requested = selection.len(), code = e.code(), error = %e, "consolidation rejected");
                Err(e)
            }
            Err(e) => {
                error!(requested = selection.len(), code = e.code(), error = %e, "consolidation failed");
                Err(e)
            }
        }
    }

    pub fn practices(&self, query: &PracticeQuery) -> Result<PracticePage> {
        let page = self.source.practices(query)?;
        debug!(total = page.total, returned = page.practices.len(), "listed practices");
        Ok(page)
    }
}

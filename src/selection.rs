//! Turning client-supplied practice identifiers into a validated selection.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{LabprepError, Result};
use crate::model::PracticeId;
use crate::OtherHasher;

/// Default upper bound on the number of practices consolidated at once.
pub const DEFAULT_MAX_PRACTICES: usize = 50;

/// Distinct practice identifiers, in the order the client first listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<PracticeId>,
}

impl Selection {
    pub fn new(ids: impl IntoIterator<Item = PracticeId>, max_practices: usize) -> Result<Self> {
        let mut seen: HashSet<PracticeId, OtherHasher> = HashSet::default();
        let ids: Vec<PracticeId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return Err(LabprepError::InvalidInput(
                "at least one practice identifier is required".into(),
            ));
        }
        if ids.len() > max_practices {
            return Err(LabprepError::InvalidInput(format!(
                "at most {max_practices} practices can be consolidated at once, got {}",
                ids.len()
            )));
        }
        Ok(Self { ids })
    }

    /// Accepts JSON integers and numeric strings; anything else is dropped.
    /// Fails when nothing usable is left.
    pub fn parse(values: &[Value], max_practices: usize) -> Result<Self> {
        if values.is_empty() {
            return Err(LabprepError::InvalidInput(
                "an array of practice identifiers is required".into(),
            ));
        }
        let ids: Vec<PracticeId> = values.iter().filter_map(parse_id).collect();
        if ids.is_empty() {
            return Err(LabprepError::InvalidInput(
                "practice identifiers must be valid integers".into(),
            ));
        }
        Self::new(ids, max_practices)
    }

    pub fn ids(&self) -> &[PracticeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn parse_id(value: &Value) -> Option<PracticeId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

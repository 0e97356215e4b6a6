//! Consolidation of the preparation groups reachable from a selection of practices.
//!
//! The merge is a pure function of the hydrated graph handed in by the data
//! access layer:
//! * fasting hours merge by maximum, since the strictest fast satisfies every weaker one;
//! * urine collection protocols must agree, a second distinct type is a hard conflict;
//! * instructions are deduplicated by normalized text (first occurrence wins) and
//!   then stably ordered by category rank.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{LabprepError, Result};
use crate::model::{Group, GroupId, Instruction, Practice, PracticeSummary, UrineType};
use crate::render;
use crate::OtherHasher;

/// Outcome of a successful consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Consolidation {
    #[serde(rename = "indicaciones_consolidadas")]
    pub text: String,
    #[serde(rename = "ayuno_horas")]
    pub fasting_hours: Option<u32>,
    #[serde(rename = "tipo_orina")]
    pub urine_type: Option<UrineType>,
    #[serde(rename = "horas_orina")]
    pub urine_hours: Option<i64>,
    #[serde(rename = "detalles")]
    pub details: Details,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Details {
    #[serde(rename = "cantidad_practicas")]
    pub practice_count: usize,
    #[serde(rename = "cantidad_grupos")]
    pub group_count: usize,
    #[serde(rename = "cantidad_indicaciones")]
    pub instruction_count: usize,
    #[serde(rename = "practicas")]
    pub practices: Vec<PracticeSummary>,
    /// Deduplicated instructions in presentation order.
    #[serde(rename = "indicaciones")]
    pub instructions: Vec<Arc<Instruction>>,
}

pub fn consolidate(practices: &[Practice]) -> Result<Consolidation> {
    if practices.is_empty() {
        return Err(LabprepError::NoPracticesFound);
    }
    let groups = distinct_groups(practices);
    if groups.is_empty() {
        return Err(LabprepError::NoPreparationConfigured);
    }

    let fasting_hours = merge_fasting(&groups);
    let urine_type = merge_urine(&groups)?;
    let instructions = order_for_presentation(deduplicate(&groups));
    debug!(
        practices = practices.len(),
        groups = groups.len(),
        instructions = instructions.len(),
        ?fasting_hours,
        ?urine_type,
        "merged preparation groups"
    );

    let text = render::patient_text(&instructions, fasting_hours, urine_type);
    Ok(Consolidation {
        text,
        fasting_hours,
        urine_type,
        urine_hours: urine_type.map(|t| t.hours()),
        details: Details {
            practice_count: practices.len(),
            group_count: groups.len(),
            instruction_count: instructions.len(),
            practices: practices.iter().map(Practice::summary).collect(),
            instructions,
        },
    })
}

/// Every group reachable from the practices, once each, by ascending identifier.
pub fn distinct_groups(practices: &[Practice]) -> Vec<Arc<Group>> {
    let mut seen: BTreeMap<GroupId, &Arc<Group>> = BTreeMap::new();
    for practice in practices {
        for group in practice.groups() {
            seen.entry(group.id()).or_insert(group);
        }
    }
    seen.into_values().map(Arc::clone).collect()
}

/// Strictest fasting requirement. Zero hours means no fasting at all.
pub fn merge_fasting(groups: &[Arc<Group>]) -> Option<u32> {
    groups
        .iter()
        .map(|g| g.fasting_hours().unwrap_or(0))
        .max()
        .filter(|&hours| hours > 0)
}

/// The single urine type asserted by the groups, if any.
///
/// Collection protocols are not ordered by restrictiveness, so two distinct
/// types cannot be reconciled and the first disagreement is reported.
pub fn merge_urine(groups: &[Arc<Group>]) -> Result<Option<UrineType>> {
    let mut tracked: Option<UrineType> = None;
    for urine_type in groups.iter().filter_map(|g| g.urine_type()) {
        match tracked {
            None => tracked = Some(urine_type),
            Some(first) if first != urine_type => {
                return Err(LabprepError::UrineTypeConflict {
                    first,
                    second: urine_type,
                });
            }
            Some(_) => (),
        }
    }
    Ok(tracked)
}

/// Instructions of all groups with repeated texts dropped, keeping the first
/// occurrence in its original position.
pub fn deduplicate(groups: &[Arc<Group>]) -> Vec<Arc<Instruction>> {
    let mut seen: HashSet<String, OtherHasher> = HashSet::default();
    let mut kept = Vec::new();
    for group in groups {
        for instruction in group.instructions() {
            if seen.insert(instruction.dedup_key()) {
                kept.push(Arc::clone(instruction));
            }
        }
    }
    kept
}

/// Stable sort by category rank, ties keep their relative order.
pub fn order_for_presentation(mut instructions: Vec<Arc<Instruction>>) -> Vec<Arc<Instruction>> {
    instructions.sort_by_key(|i| i.category().rank());
    instructions
}

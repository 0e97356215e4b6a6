//! Labprep – consolidated preparation instructions for laboratory tests.
//!
//! A patient who is sent for several lab tests (*practices*) at once should get
//! one instruction sheet, not one per test. Preparation requirements are shared
//! between practices through *groups*:
//! * A [`model::Practice`] is an orderable lab test, linked to any number of groups.
//! * A [`model::Group`] bundles fasting hours, an optional urine collection
//!   protocol ([`model::UrineType`]) and an ordered list of instructions.
//! * An [`model::Instruction`] is one free‑text directive tagged with a
//!   [`model::Category`] that decides where it is shown.
//!
//! ## Modules
//! * [`model`] – The practice / group / instruction graph and its closed enums.
//! * [`persist`] – SQLite storage and the read‑only [`persist::PreparationSource`]
//!   contract the engine depends on.
//! * [`consolidate`] – The merge: strictest fasting wins, urine protocols must
//!   agree, instructions are deduplicated and ordered by category.
//! * [`render`] – The patient facing text.
//! * [`selection`] – Validation of client supplied practice identifiers.
//! * [`service`] – One fetch plus one consolidation, the unit a request maps to.
//! * [`server`] – The HTTP surface (axum).
//! * [`settings`] / [`logging`] – Runtime configuration and tracing setup.
//!
//! ## Conflicts
//! Fasting requirements are totally ordered, so the longest fast satisfies every
//! shorter one. Urine collection protocols are not: a first morning sample and a
//! 24 hour collection cannot both be honoured by picking one. When a selection
//! reaches two distinct protocols the engine refuses with
//! [`LabprepError::UrineTypeConflict`] naming both, and nothing is rendered.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use labprep::model::Category;
//! use labprep::persist::{PersistenceMode, Store};
//! use labprep::service::PreparationService;
//! let store = Store::new(PersistenceMode::InMemory).unwrap();
//! store.add_practice(1, "GLUCEMIA", None, true).unwrap();
//! store.add_group(10, "Ayuno 8 horas", Some(8), None, true).unwrap();
//! store.add_instruction(100, "Concurrir con 8 horas de ayuno.", Category::Fasting, 1, true).unwrap();
//! store.link_practice_group(1, 10, true).unwrap();
//! store.link_group_instruction(10, 100, 1, true).unwrap();
//! let service = PreparationService::new(Arc::new(store));
//! let result = service.generate_for_ids(&[1]).unwrap();
//! assert_eq!(result.fasting_hours, Some(8));
//! assert!(result.text.contains("1. Concurrir con 8 horas de ayuno."));
//! ```

pub mod consolidate;
pub mod error;
pub mod logging;
pub mod model;
pub mod persist;
pub mod render;
pub mod selection;
pub mod server;
pub mod service;
pub mod settings;

use core::hash::BuildHasherDefault;
use seahash::SeaHasher;

pub use error::{LabprepError, Result};

// hasher for the seen-sets keyed by identifiers and normalized texts
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

//! harvestry-common — shared model, vocabularies and boundary contracts.
//!
//! Holds the canonical `Study` aggregate produced by every per-source
//! processor, the coded-vocabulary lookup tables, the traits through which
//! the core talks to its external collaborators (file catalogue, document
//! loader, storage sink, harvest ledger, organisation resolver), and
//! configuration loading.

pub mod config;
pub mod contracts;
pub mod error;
pub mod model;
pub mod vocab;

pub use config::Config;
pub use error::{HarvestError, Result};

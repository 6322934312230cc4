//! harvestry-harvest — registry metadata normalization core.
//!
//! Covers the harvest stage of the pipeline:
//! - Primitive helpers (partial dates, content hashes, markup stripping,
//!   organisation-name and identifier heuristics)
//! - One processor per registry source (CTG, BioLINCC, WHO ICTRP, Yoda,
//!   EU-CTR, ISRCTN, PubMed), each a pure mapping from a parsed source
//!   document to the canonical `Study` aggregate
//! - Reference / topic reconciliation shared across processors
//! - The per-source harvest loop (load file, process, store, ledger)

pub mod helpers;
pub mod pipeline;
pub mod reconcile;
pub mod sources;

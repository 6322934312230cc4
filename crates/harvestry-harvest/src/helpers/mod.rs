//! Pure helper functions shared by the per-source processors.

pub mod dates;
pub mod hash;
pub mod html;
pub mod idents;
pub mod orgs;

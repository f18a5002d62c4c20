//! `photokit-recon`: two-sided inventory reconciliation.
//!
//! Pure engine crate: receives pre-listed items for a remote and a local
//! namespace, returns four disjoint buckets. Fingerprints are pulled lazily
//! through [`FingerprintSource`]; no filesystem or network access here.

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod resolve;

pub use config::{DuplicateNames, ReconOptions};
pub use engine::reconcile;
pub use error::FingerprintError;
pub use model::{Fingerprint, Item, MatchedPair, ReconResult, Side, Warning};
pub use resolve::{FingerprintSource, Precomputed};

//! Analyzer module - detector registry, built-in detectors and scoring

pub mod detectors;
pub mod engine;
pub mod patterns;
pub mod registry;
pub mod scoring;

pub use engine::{GuardEngine, GuardError};
pub use patterns::RuleBook;
pub use registry::{default_registry, Detector, Registry};
pub use scoring::compute_score;

//! Post-processing pipeline for fetched snippets.
//!
//! - Stages are defined via the `Stage` trait and operate on one shared
//!   `Environment`
//! - `StageRegistry` is an explicit, constructed list; there is no global one
//! - `run_stages` executes stages in the given order and stops at the first
//!   failure

mod registry;
mod runner;
mod stage;
pub mod stages;

pub use registry::StageRegistry;
pub use runner::run_stages;
pub use stage::{Environment, FnStage, Stage, StageMetadata};

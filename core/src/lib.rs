//! revenue-core: deterministic SaaS revenue-driver analysis.
//!
//! Raw account, subscription and churn tables go in; account-month MRR,
//! monthly aggregates, acquisition/retention/pricing diagnostics, a scored
//! driver comparison and a recommendation come out.

pub mod acquisition;
pub mod aggregate;
pub mod artifacts;
pub mod cohort;
pub mod config;
pub mod drivers;
pub mod error;
pub mod event;
pub mod interval;
pub mod pipeline;
pub mod pricing;
pub mod raw;
pub mod recommendation;
pub mod report;
pub mod stats;
pub mod store;
pub mod types;
pub mod verify;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Datasets, Pipeline, Stage};

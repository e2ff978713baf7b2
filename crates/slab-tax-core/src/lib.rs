pub mod api;
pub mod config;
pub mod context;
pub mod deductions;
pub mod engine;
pub mod error;
pub mod income;
pub mod schedule;
pub mod types;

pub use config::{ContextSearch, EngineConfig};
pub use engine::{IncomeAssessment, SlabUpdateOutcome, TaxComputation, TaxEngine, UpdateAction};
pub use error::SlabTaxError;
pub use schedule::{Slab, SlabTable};
pub use types::*;

/// Standard result type for all slab-tax operations
pub type SlabTaxResult<T> = Result<T, SlabTaxError>;

pub mod optimizer;

pub use optimizer::{optimize, DeductionItem, DeductionSelection, OptimizationStrategy};

pub mod kdtree;

pub use kdtree::{ContextPoint, ContextRateIndex};

pub mod dynamic_store;
pub mod slab;
pub mod static_index;

pub use dynamic_store::DynamicRangeStore;
pub use slab::{Slab, SlabTable};
pub use static_index::StaticRangeIndex;

pub mod cache;
pub mod error;
pub mod filter;
pub mod graph;
pub mod preload;
pub mod processor;
pub mod query;
pub mod source;
pub mod tags;

pub use cache::InventoryCache;
pub use error::*;
pub use filter::{TagFilter, TagOperator, TagsBehavior};
pub use graph::{InventoryGraph, InventoryGroup, InventoryHost};
pub use processor::InventoryProcessor;
pub use source::InventorySource;
pub use tags::tag_to_dict_transform;

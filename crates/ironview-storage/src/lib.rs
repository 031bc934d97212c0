//! IronView Storage - the feature source contract
//!
//! A view reads from (and optionally writes to) any type implementing
//! `FeatureSource` / `FeatureStore`. `MemoryDataStore` is an in-memory
//! implementation with configurable query capabilities.

mod aggregate;
mod capabilities;
mod listener;
mod memory;
mod query;
mod reader;
mod source;

pub use aggregate::{aggregate_features, Aggregate, AggregateCollector, AggregateResult};
pub use capabilities::{QueryCapabilities, StaticCapabilities};
pub use listener::{FeatureEvent, FeatureEventKind, FeatureListener};
pub use memory::MemoryDataStore;
pub use query::{Count, Query, SortBy, SortOrder};
pub use reader::{read_all, FeatureReader, VecFeatureReader};
pub use source::{FeatureSource, FeatureStore};

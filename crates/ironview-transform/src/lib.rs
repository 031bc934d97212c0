//! IronView Transform - attribute-transform views
//!
//! A view publishes a new feature type whose attributes are expressions
//! over the attributes of an existing source. Requests against the view
//! are rewritten into requests against the source, pushing filters, sorts,
//! paging and aggregates down as far as the source's capabilities allow
//! and emulating the rest in the read pipeline.

mod aggregate;
mod config;
mod definition;
mod reader;
mod srid_evaluator;
mod store;
mod transformer;
mod type_evaluator;
mod view;

pub use aggregate::{plan_aggregate, AggregatePlan};
pub use config::{AttributeConfig, ViewConfig};
pub use definition::{Definition, Mapping};
pub use reader::{
    LimitReader, OffsetReader, ReaderGuard, RetypingReader, SortingReader, TransformingReader,
};
pub use srid_evaluator::SridEvaluator;
pub use store::TransformedStore;
pub use transformer::{TranslatedQuery, Transformer};
pub use type_evaluator::TypeEvaluator;
pub use view::{TransformedView, ViewCapabilities, ViewOptions, DEFAULT_SORT_MEMORY_LIMIT};

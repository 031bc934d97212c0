//! IronView - attribute-transform views over feature sources
//!
//! A view takes an existing feature source and publishes a new feature
//! type whose attributes are computed from the source's attributes by
//! expressions. Reads against the view are rewritten so that filtering,
//! sorting, paging and aggregation run in the source whenever it can
//! perform them, and are emulated locally otherwise.
//!
//! # Example
//!
//! ```rust
//! use ironview::{
//!     AttributeDescriptor, DefaultExpressionFactory, FeatureSchema, FeatureSource,
//!     LogicalType, MemoryDataStore, Query, TransformedView, Value, ViewConfig,
//! };
//! use std::sync::Arc;
//!
//! let store = MemoryDataStore::new(
//!     FeatureSchema::new("people", vec![AttributeDescriptor::new("name", LogicalType::Varchar)])
//!         .unwrap(),
//! );
//! store.insert(vec![Value::from("Paul")]);
//!
//! let config = ViewConfig::from_toml(r#"
//!     name = "greetings"
//!     [[attributes]]
//!     name = "label"
//!     expression = "concat(name, '!')"
//! "#).unwrap();
//!
//! let view = TransformedView::from_config(
//!     Arc::new(store),
//!     &config,
//!     Arc::new(DefaultExpressionFactory::new()),
//! )
//! .unwrap();
//!
//! let features = ironview::read_all(view.features(&Query::all()).unwrap()).unwrap();
//! assert_eq!(features[0].get("label"), Some(&Value::from("Paul!")));
//! assert_eq!(features[0].id, "greetings.1");
//! ```

pub use ironview_catalog as catalog;
pub use ironview_common as common;
pub use ironview_expr as expr;
pub use ironview_parser as parser;
pub use ironview_storage as storage;
pub use ironview_transaction as transaction;
pub use ironview_transform as transform;

mod single_source;

pub use single_source::SingleSourceCatalog;

pub use ironview_catalog::{AttributeDescriptor, Feature, FeatureSchema};
pub use ironview_common::{Envelope, Error, Geometry, LogicalType, Result, Srid, Value};
pub use ironview_expr::{DefaultExpressionFactory, Expression, ExpressionFactory, Filter};
pub use ironview_parser::{parse_expression, parse_filter};
pub use ironview_storage::{
    read_all, Aggregate, AggregateResult, Count, FeatureReader, FeatureSource, FeatureStore,
    MemoryDataStore, Query, SortBy, StaticCapabilities,
};
pub use ironview_transaction::{Transaction, TransactionManager};
pub use ironview_transform::{
    Definition, TransformedStore, TransformedView, ViewConfig, ViewOptions,
};

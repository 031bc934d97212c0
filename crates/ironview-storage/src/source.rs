//! Read and write contracts of a feature source

use super::{Aggregate, AggregateResult, Count, FeatureListener, FeatureReader, Query, QueryCapabilities};
use ironview_catalog::{Feature, FeatureSchema};
use ironview_common::{Envelope, Error, Result, Value};
use ironview_expr::Filter;
use ironview_transaction::{Transaction, TransactionScope};
use std::sync::Arc;

/// A readable collection of features sharing one schema
pub trait FeatureSource: Send + Sync {
    fn schema(&self) -> Arc<FeatureSchema>;

    /// The type name features are published under
    fn name(&self) -> String {
        self.schema().name.clone()
    }

    fn capabilities(&self) -> &dyn QueryCapabilities;

    /// Open a reader over the features selected by `query`
    fn features(&self, query: &Query) -> Result<Box<dyn FeatureReader>>;

    fn count(&self, query: &Query) -> Result<Count>;

    /// Envelope of the default geometry over the selected features
    fn bounds(&self, query: &Query) -> Result<Option<Envelope>>;

    /// Compute an aggregate natively. `Ok(None)` means the source cannot,
    /// and the caller should compute it from the features.
    fn aggregate(&self, _query: &Query, _aggregate: &Aggregate) -> Result<Option<AggregateResult>> {
        Ok(None)
    }

    fn add_listener(&self, _listener: Arc<dyn FeatureListener>) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "{} does not publish change events",
            self.name()
        )))
    }
}

/// A feature source that also accepts writes and locks
pub trait FeatureStore: FeatureSource {
    /// How writes are attributed to a transaction
    fn transaction_scope(&self) -> TransactionScope {
        TransactionScope::PerCall
    }

    /// Insert features, returning their assigned ids
    fn add_features(&self, features: Vec<Feature>, txn: &Transaction) -> Result<Vec<String>>;

    /// Set `names` to `values` on every feature matching `filter`
    fn modify_features(
        &self,
        names: &[String],
        values: &[Value],
        filter: &Filter,
        txn: &Transaction,
    ) -> Result<usize>;

    fn remove_features(&self, filter: &Filter, txn: &Transaction) -> Result<usize>;

    /// Replace the whole content
    fn set_features(&self, features: Vec<Feature>, txn: &Transaction) -> Result<Vec<String>>;

    /// Lock the features `query` selects for `txn`, returning how many were locked
    fn lock_features(&self, query: &Query, txn: &Transaction) -> Result<usize>;

    fn unlock_features(&self, query: &Query, txn: &Transaction) -> Result<usize>;
}

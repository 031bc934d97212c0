//! In-memory feature store

use super::{
    aggregate_features, Aggregate, AggregateResult, Count, FeatureEvent, FeatureEventKind,
    FeatureListener, FeatureReader, FeatureSource, FeatureStore, Query, QueryCapabilities,
    SortBy, SortOrder, StaticCapabilities, VecFeatureReader,
};
use hashbrown::HashMap;
use ironview_catalog::{Feature, FeatureSchema};
use ironview_common::{Envelope, Error, Result, Value};
use ironview_expr::{Evaluator, Filter, FunctionRegistry};
use ironview_transaction::{Transaction, TransactionId, TransactionScope};
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::debug;

/// A feature store holding one feature type in memory.
///
/// Capabilities are configurable so callers can exercise every pushdown
/// path; every query passed to `features` is recorded.
pub struct MemoryDataStore {
    schema: Arc<FeatureSchema>,
    rows: RwLock<Vec<Feature>>,
    next_id: AtomicU64,
    capabilities: StaticCapabilities,
    functions: FunctionRegistry,
    count_support: bool,
    aggregate_support: bool,
    scope: TransactionScope,
    /// Feature id -> owning transaction
    locks: RwLock<HashMap<String, TransactionId>>,
    listeners: RwLock<Vec<Arc<dyn FeatureListener>>>,
    queries: Mutex<Vec<Query>>,
    open_readers: Arc<AtomicUsize>,
    fail_close: bool,
    fail_read_after: Option<usize>,
}

impl MemoryDataStore {
    pub fn new(schema: FeatureSchema) -> Self {
        MemoryDataStore {
            schema: Arc::new(schema),
            rows: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            capabilities: StaticCapabilities::full(),
            functions: FunctionRegistry::with_builtins(),
            count_support: true,
            aggregate_support: true,
            scope: TransactionScope::PerCall,
            locks: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            open_readers: Arc::new(AtomicUsize::new(0)),
            fail_close: false,
            fail_read_after: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: StaticCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// When disabled, `count` answers `Count::Unknown`
    pub fn with_count_support(mut self, enabled: bool) -> Self {
        self.count_support = enabled;
        self
    }

    /// When disabled, `aggregate` answers `None`
    pub fn with_aggregate_support(mut self, enabled: bool) -> Self {
        self.aggregate_support = enabled;
        self
    }

    pub fn with_transaction_scope(mut self, scope: TransactionScope) -> Self {
        self.scope = scope;
        self
    }

    /// Make closing a reader fail
    pub fn with_close_failure(mut self, fail: bool) -> Self {
        self.fail_close = fail;
        self
    }

    /// Make readers fail with an I/O error after producing `n` features
    pub fn with_read_failure_after(mut self, n: usize) -> Self {
        self.fail_read_after = Some(n);
        self
    }

    /// Append a feature outside of any transaction, returning its id
    pub fn insert(&self, values: Vec<Value>) -> String {
        let id = self.next_feature_id();
        let feature = Feature::new(id.clone(), self.schema.clone(), values);
        self.rows.write().push(feature);
        id
    }

    /// Number of stored features
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queries received by `features`, oldest first
    pub fn recorded_queries(&self) -> Vec<Query> {
        self.queries.lock().clone()
    }

    /// Readers opened and not yet closed
    pub fn open_readers(&self) -> usize {
        self.open_readers.load(AtomicOrdering::SeqCst)
    }

    /// Transaction holding the lock on a feature
    pub fn lock_owner(&self, id: &str) -> Option<TransactionId> {
        self.locks.read().get(id).copied()
    }

    fn next_feature_id(&self) -> String {
        let n = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        format!("{}.{}", self.schema.name, n)
    }

    fn matches(&self, filter: &Filter, feature: &Feature) -> Result<bool> {
        Evaluator::new(&self.functions).matches(filter, feature)
    }

    /// Apply filter, sort and paging of `query`, ignoring its attribute subset
    fn select(&self, query: &Query) -> Result<Vec<Feature>> {
        for sort in &query.sort_by {
            if let Some(name) = sort.property() {
                if self.schema.index_of(name).is_none() {
                    return Err(Error::AttributeNotFound(format!(
                        "{}.{}",
                        self.schema.name, name
                    )));
                }
            }
        }

        let rows = self.rows.read();
        let mut selected = Vec::new();
        for (idx, feature) in rows.iter().enumerate() {
            if self.matches(&query.filter, feature)? {
                selected.push((idx, feature.clone()));
            }
        }
        drop(rows);

        if !query.sort_by.is_empty() {
            selected.sort_by(|(ia, a), (ib, b)| {
                for sort in &query.sort_by {
                    let cmp = match sort {
                        SortBy::NaturalOrder => ia.cmp(ib),
                        SortBy::ReverseOrder => ib.cmp(ia),
                        SortBy::Property { name, order } => {
                            let left = a.get(name).unwrap_or(&Value::Null);
                            let right = b.get(name).unwrap_or(&Value::Null);
                            let cmp = left.sort_cmp(right);
                            match order {
                                SortOrder::Ascending => cmp,
                                SortOrder::Descending => cmp.reverse(),
                            }
                        }
                    };
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                Ordering::Equal
            });
        }

        let skip = query.start_index.unwrap_or(0);
        let take = query.max_features.unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, f)| f)
            .collect())
    }

    /// Fail if any of `ids` is locked by a transaction other than `txn`
    fn check_locks<'a>(&self, ids: impl IntoIterator<Item = &'a str>, txn: &Transaction) -> Result<()> {
        let locks = self.locks.read();
        for id in ids {
            if let Some(owner) = locks.get(id) {
                if *owner != txn.id {
                    return Err(Error::FeatureLocked(id.to_string()));
                }
            }
        }
        Ok(())
    }

    fn notify(&self, kind: FeatureEventKind, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let event = FeatureEvent {
            kind,
            type_name: self.schema.name.clone(),
            ids,
        };
        for listener in self.listeners.read().iter() {
            listener.changed(&event);
        }
    }

    fn store_features(&self, features: Vec<Feature>) -> Vec<String> {
        let mut ids = Vec::with_capacity(features.len());
        let mut rows = self.rows.write();
        for feature in features {
            let id = if self.capabilities.supports_provided_fid() && !feature.id.is_empty() {
                feature.id.clone()
            } else {
                self.next_feature_id()
            };
            let mut stored = feature.retype(self.schema.clone());
            stored.id = id.clone();
            rows.push(stored);
            ids.push(id);
        }
        ids
    }
}

impl FeatureSource for MemoryDataStore {
    fn schema(&self) -> Arc<FeatureSchema> {
        self.schema.clone()
    }

    fn capabilities(&self) -> &dyn QueryCapabilities {
        &self.capabilities
    }

    fn features(&self, query: &Query) -> Result<Box<dyn FeatureReader>> {
        debug!(type_name = %self.schema.name, query = %query, "memory store read");
        self.queries.lock().push(query.clone());

        let selected = self.select(query)?;
        let (schema, features) = match &query.properties {
            Some(names) => {
                let subset = Arc::new(self.schema.subset(names)?);
                let features = selected
                    .iter()
                    .map(|f| f.retype(subset.clone()))
                    .collect();
                (subset, features)
            }
            None => (self.schema.clone(), selected),
        };

        self.open_readers.fetch_add(1, AtomicOrdering::SeqCst);
        let open = self.open_readers.clone();
        let fail_close = self.fail_close;
        let reader = VecFeatureReader::new(schema, features).on_close(move || {
            open.fetch_sub(1, AtomicOrdering::SeqCst);
            if fail_close {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "connection reset while closing",
                )));
            }
            Ok(())
        });

        match self.fail_read_after {
            Some(limit) => Ok(Box::new(FailingReader {
                inner: reader,
                remaining: limit,
            })),
            None => Ok(Box::new(reader)),
        }
    }

    fn count(&self, query: &Query) -> Result<Count> {
        if !self.count_support {
            return Ok(Count::Unknown);
        }
        Ok(Count::Exact(self.select(query)?.len() as u64))
    }

    fn bounds(&self, query: &Query) -> Result<Option<Envelope>> {
        let mut bounds: Option<Envelope> = None;
        for feature in self.select(query)? {
            if let Some(env) = feature.bounds() {
                bounds = Some(Envelope::union(bounds, &env));
            }
        }
        Ok(bounds)
    }

    fn aggregate(&self, query: &Query, aggregate: &Aggregate) -> Result<Option<AggregateResult>> {
        if !self.aggregate_support {
            return Ok(None);
        }
        let selected = self.select(query)?;
        aggregate_features(aggregate, &self.functions, &selected).map(Some)
    }

    fn add_listener(&self, listener: Arc<dyn FeatureListener>) -> Result<()> {
        self.listeners.write().push(listener);
        Ok(())
    }
}

impl FeatureStore for MemoryDataStore {
    fn transaction_scope(&self) -> TransactionScope {
        self.scope
    }

    fn add_features(&self, features: Vec<Feature>, txn: &Transaction) -> Result<Vec<String>> {
        txn.ensure_active()?;
        let ids = self.store_features(features);
        self.notify(FeatureEventKind::Added, ids.clone());
        Ok(ids)
    }

    fn modify_features(
        &self,
        names: &[String],
        values: &[Value],
        filter: &Filter,
        txn: &Transaction,
    ) -> Result<usize> {
        txn.ensure_active()?;
        if names.len() != values.len() {
            return Err(Error::InvalidArguments(format!(
                "{} attribute names but {} values",
                names.len(),
                values.len()
            )));
        }
        for name in names {
            if self.schema.index_of(name).is_none() {
                return Err(Error::AttributeNotFound(format!(
                    "{}.{}",
                    self.schema.name, name
                )));
            }
        }

        let mut rows = self.rows.write();
        let mut targets = Vec::new();
        for (idx, feature) in rows.iter().enumerate() {
            if self.matches(filter, feature)? {
                targets.push(idx);
            }
        }
        self.check_locks(targets.iter().map(|&i| rows[i].id.as_str()), txn)?;

        let mut ids = Vec::with_capacity(targets.len());
        for idx in targets {
            let feature = &mut rows[idx];
            for (name, value) in names.iter().zip(values) {
                feature.set(name, value.clone());
            }
            ids.push(feature.id.clone());
        }
        drop(rows);

        let count = ids.len();
        self.notify(FeatureEventKind::Modified, ids);
        Ok(count)
    }

    fn remove_features(&self, filter: &Filter, txn: &Transaction) -> Result<usize> {
        txn.ensure_active()?;
        let mut rows = self.rows.write();
        let mut removed = Vec::new();
        for feature in rows.iter() {
            if self.matches(filter, feature)? {
                removed.push(feature.id.clone());
            }
        }
        self.check_locks(removed.iter().map(String::as_str), txn)?;
        rows.retain(|f| !removed.contains(&f.id));
        drop(rows);

        let mut locks = self.locks.write();
        for id in &removed {
            locks.remove(id);
        }
        drop(locks);

        let count = removed.len();
        self.notify(FeatureEventKind::Removed, removed);
        Ok(count)
    }

    fn set_features(&self, features: Vec<Feature>, txn: &Transaction) -> Result<Vec<String>> {
        txn.ensure_active()?;
        let removed: Vec<String> = self.rows.read().iter().map(|f| f.id.clone()).collect();
        self.check_locks(removed.iter().map(String::as_str), txn)?;
        self.rows.write().clear();
        self.locks.write().clear();
        self.notify(FeatureEventKind::Removed, removed);

        let ids = self.store_features(features);
        self.notify(FeatureEventKind::Added, ids.clone());
        Ok(ids)
    }

    fn lock_features(&self, query: &Query, txn: &Transaction) -> Result<usize> {
        txn.ensure_active()?;
        let selected = self.select(query)?;
        let mut locks = self.locks.write();
        let mut locked = 0;
        for feature in selected {
            let held_elsewhere =
                matches!(locks.get(&feature.id), Some(owner) if *owner != txn.id);
            if !held_elsewhere {
                locks.insert(feature.id, txn.id);
                locked += 1;
            }
        }
        Ok(locked)
    }

    fn unlock_features(&self, query: &Query, txn: &Transaction) -> Result<usize> {
        let selected = self.select(query)?;
        let mut locks = self.locks.write();
        let mut released = 0;
        for feature in selected {
            if locks.get(&feature.id) == Some(&txn.id) {
                locks.remove(&feature.id);
                released += 1;
            }
        }
        Ok(released)
    }
}

/// Reader that fails with an I/O error once `remaining` features were read
struct FailingReader {
    inner: VecFeatureReader,
    remaining: usize,
}

impl FeatureReader for FailingReader {
    fn schema(&self) -> &Arc<FeatureSchema> {
        self.inner.schema()
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        if self.remaining == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "source stream interrupted",
            )));
        }
        self.remaining -= 1;
        self.inner.next_feature()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

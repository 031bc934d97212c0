//! Writable view over a feature store

use super::{Definition, TransformedView, Transformer, ViewConfig, ViewOptions};
use ironview_catalog::{AttributeDescriptor, Feature, FeatureSchema};
use ironview_common::{Envelope, Error, Result, Value};
use ironview_expr::{cast_value, ExpressionFactory, Filter};
use ironview_storage::{
    read_all, Aggregate, AggregateResult, Count, FeatureListener, FeatureReader, FeatureSource,
    FeatureStore, Query, QueryCapabilities,
};
use ironview_transaction::{Transaction, TransactionScope};
use std::sync::Arc;
use tracing::debug;

/// A view that also accepts writes and locks, translating each one into
/// the underlying store's terms.
///
/// Only views made entirely of renames can be written through, and only
/// over stores that take their transaction per call.
pub struct TransformedStore {
    view: TransformedView,
    store: Arc<dyn FeatureStore>,
}

impl TransformedStore {
    pub fn new<S: FeatureStore + 'static>(
        store: Arc<S>,
        name: impl Into<String>,
        definitions: Vec<Definition>,
        factory: Arc<dyn ExpressionFactory>,
    ) -> Result<Self> {
        Self::with_options(store, name, definitions, factory, ViewOptions::default())
    }

    pub fn with_options<S: FeatureStore + 'static>(
        store: Arc<S>,
        name: impl Into<String>,
        definitions: Vec<Definition>,
        factory: Arc<dyn ExpressionFactory>,
        options: ViewOptions,
    ) -> Result<Self> {
        let name = name.into();
        if store.transaction_scope() == TransactionScope::Bound {
            return Err(Error::UnsupportedOperation(format!(
                "Store {} binds its transaction to the instance; use it directly instead of through view {}",
                store.name(),
                name
            )));
        }
        if let Some(def) = definitions.iter().find(|d| !d.is_invertible()) {
            return Err(Error::Configuration(format!(
                "View {} cannot be written: attribute {} is not a rename",
                name, def.name
            )));
        }

        let source: Arc<dyn FeatureSource> = store.clone();
        let view = TransformedView::with_options(source, name, definitions, factory, options)?;
        Ok(TransformedStore { view, store })
    }

    pub fn from_config<S: FeatureStore + 'static>(
        store: Arc<S>,
        config: &ViewConfig,
        factory: Arc<dyn ExpressionFactory>,
    ) -> Result<Self> {
        let definitions = config.definitions(factory.as_ref())?;
        Self::with_options(store, config.name.clone(), definitions, factory, config.options())
    }

    pub fn view(&self) -> &TransformedView {
        &self.view
    }

    fn transformer(&self) -> &Transformer {
        self.view.transformer()
    }

    /// Source attribute written by view attribute `name`
    fn source_name(&self, name: &str) -> Result<&str> {
        self.transformer()
            .definition(name)
            .and_then(Definition::source_attribute)
            .ok_or_else(|| Error::AttributeNotFound(format!("{}.{}", self.transformer().name(), name)))
    }

    /// Lay a view feature out as a source feature. Source attributes no
    /// view attribute maps onto are left NULL.
    fn to_source(&self, feature: &Feature) -> Result<Feature> {
        let transformer = self.transformer();
        let source_schema = transformer.source_schema();
        let mut values = Vec::with_capacity(source_schema.attribute_count());
        for attr in source_schema.attributes() {
            let value = transformer
                .definitions()
                .iter()
                .find(|d| d.source_attribute() == Some(attr.name.as_str()))
                .and_then(|d| feature.get(&d.name))
                .cloned()
                .unwrap_or(Value::Null);
            values.push(to_source_value(value, attr)?);
        }
        let id = if feature.id.is_empty() {
            String::new()
        } else {
            transformer.source_fid(&feature.id)
        };
        Ok(Feature::new(id, source_schema.clone(), values))
    }

    fn to_source_all(&self, features: &[Feature]) -> Result<Vec<Feature>> {
        features.iter().map(|f| self.to_source(f)).collect()
    }

    fn view_ids(&self, ids: Vec<String>) -> Vec<String> {
        ids.iter().map(|id| self.transformer().transform_fid(id)).collect()
    }

    /// Source-side query selecting the same features as `query`. Sorting
    /// or paging the source cannot do is resolved by reading the view and
    /// selecting the resulting ids.
    fn source_selection(&self, query: &Query) -> Result<Query> {
        let translated = self
            .transformer()
            .translate_query(query, self.store.capabilities())?;
        if !translated.is_emulated() {
            return Ok(translated.query);
        }
        debug!(view = %self.transformer().name(), "selecting features to lock by id");
        let ids: Vec<String> = read_all(self.view.features(&Query {
            properties: Some(Vec::new()),
            ..query.clone()
        })?)?
        .iter()
        .map(|f| self.transformer().source_fid(&f.id))
        .collect();
        Ok(Query::filtered(Filter::ids(ids)))
    }
}

/// Convert a value written under a declared view type back to the source
/// attribute's type
fn to_source_value(value: Value, attr: &AttributeDescriptor) -> Result<Value> {
    if value.is_null()
        || attr.logical_type.is_generic()
        || attr.is_geometry()
        || value.logical_type() == attr.logical_type
    {
        return Ok(value);
    }
    cast_value(&value, &attr.logical_type)
}

impl FeatureSource for TransformedStore {
    fn schema(&self) -> Arc<FeatureSchema> {
        self.view.schema()
    }

    fn name(&self) -> String {
        self.view.name()
    }

    fn capabilities(&self) -> &dyn QueryCapabilities {
        self.view.capabilities()
    }

    fn features(&self, query: &Query) -> Result<Box<dyn FeatureReader>> {
        self.view.features(query)
    }

    fn count(&self, query: &Query) -> Result<Count> {
        self.view.count(query)
    }

    fn bounds(&self, query: &Query) -> Result<Option<Envelope>> {
        self.view.bounds(query)
    }

    fn aggregate(&self, query: &Query, aggregate: &Aggregate) -> Result<Option<AggregateResult>> {
        self.view.aggregate(query, aggregate)
    }

    fn add_listener(&self, listener: Arc<dyn FeatureListener>) -> Result<()> {
        self.view.add_listener(listener)
    }
}

impl FeatureStore for TransformedStore {
    fn add_features(&self, features: Vec<Feature>, txn: &Transaction) -> Result<Vec<String>> {
        let source = self.to_source_all(&features)?;
        let ids = self.store.add_features(source, txn)?;
        Ok(self.view_ids(ids))
    }

    fn modify_features(
        &self,
        names: &[String],
        values: &[Value],
        filter: &Filter,
        txn: &Transaction,
    ) -> Result<usize> {
        if names.len() != values.len() {
            return Err(Error::InvalidArguments(format!(
                "{} attribute names but {} values",
                names.len(),
                values.len()
            )));
        }
        let source_schema = self.transformer().source_schema().clone();
        let mut source_names = Vec::with_capacity(names.len());
        let mut source_values = Vec::with_capacity(values.len());
        for (name, value) in names.iter().zip(values) {
            let source_name = self.source_name(name)?;
            let converted = match source_schema.get_attribute(source_name) {
                Some(attr) => to_source_value(value.clone(), attr)?,
                None => value.clone(),
            };
            source_names.push(source_name.to_string());
            source_values.push(converted);
        }
        let filter = self.transformer().translate_filter(filter)?;
        self.store
            .modify_features(&source_names, &source_values, &filter, txn)
    }

    fn remove_features(&self, filter: &Filter, txn: &Transaction) -> Result<usize> {
        let filter = self.transformer().translate_filter(filter)?;
        self.store.remove_features(&filter, txn)
    }

    fn set_features(&self, features: Vec<Feature>, txn: &Transaction) -> Result<Vec<String>> {
        let source = self.to_source_all(&features)?;
        let ids = self.store.set_features(source, txn)?;
        Ok(self.view_ids(ids))
    }

    fn lock_features(&self, query: &Query, txn: &Transaction) -> Result<usize> {
        let selection = self.source_selection(query)?;
        self.store.lock_features(&selection, txn)
    }

    fn unlock_features(&self, query: &Query, txn: &Transaction) -> Result<usize> {
        let selection = self.source_selection(query)?;
        self.store.unlock_features(&selection, txn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironview_common::LogicalType;
    use ironview_expr::{DefaultExpressionFactory, Expression};
    use ironview_storage::{MemoryDataStore, SortBy, StaticCapabilities};
    use ironview_transaction::TransactionManager;

    fn factory() -> Arc<dyn ExpressionFactory> {
        Arc::new(DefaultExpressionFactory::new())
    }

    fn people() -> Arc<MemoryDataStore> {
        let store = MemoryDataStore::new(
            FeatureSchema::new(
                "people",
                vec![
                    AttributeDescriptor::new("name", LogicalType::Varchar),
                    AttributeDescriptor::new("age", LogicalType::Integer),
                    AttributeDescriptor::new("city", LogicalType::Varchar),
                ],
            )
            .unwrap(),
        );
        store.insert(vec![Value::from("Paul"), Value::Integer(40), Value::from("Rome")]);
        store.insert(vec![Value::from("Anna"), Value::Integer(25), Value::from("Oslo")]);
        Arc::new(store)
    }

    fn writable(store: Arc<MemoryDataStore>) -> TransformedStore {
        TransformedStore::new(
            store,
            "persons",
            vec![
                Definition::rename("who", "name"),
                Definition::rename("years", "age"),
            ],
            factory(),
        )
        .unwrap()
    }

    #[test]
    fn test_computed_view_is_not_writable() {
        let err = TransformedStore::new(
            people(),
            "v",
            vec![Definition::new(
                "label",
                Expression::Function {
                    name: "concat".into(),
                    args: vec![Expression::attribute("name"), Expression::literal("!")],
                    return_type: LogicalType::Varchar,
                },
            )],
            factory(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_bound_store_is_refused() {
        let store = Arc::new(
            MemoryDataStore::new(
                FeatureSchema::new("t", vec![AttributeDescriptor::new("a", LogicalType::Integer)])
                    .unwrap(),
            )
            .with_transaction_scope(TransactionScope::Bound),
        );
        let err = TransformedStore::new(store, "v", vec![Definition::rename("b", "a")], factory())
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_add_maps_names_and_ids() {
        let store = people();
        let view = writable(store.clone());
        let txn = TransactionManager::new().begin();

        let feature = Feature::new(
            "",
            view.schema(),
            vec![Value::from("Lea"), Value::Integer(31)],
        );
        let ids = view.add_features(vec![feature], &txn).unwrap();
        assert_eq!(ids, vec!["persons.3"]);

        let stored = read_all(store.features(&Query::filtered(Filter::ids(["people.3"]))).unwrap())
            .unwrap();
        assert_eq!(stored[0].get("name"), Some(&Value::from("Lea")));
        assert_eq!(stored[0].get("age"), Some(&Value::Integer(31)));
        assert_eq!(stored[0].get("city"), Some(&Value::Null));
    }

    #[test]
    fn test_modify_and_remove_translate_filters() {
        let store = people();
        let view = writable(store.clone());
        let txn = TransactionManager::new().begin();
        let anna = Filter::equal(Expression::attribute("who"), Expression::literal("Anna"));

        let modified = view
            .modify_features(&["years".to_string()], &[Value::Integer(26)], &anna, &txn)
            .unwrap();
        assert_eq!(modified, 1);
        let ages = read_all(store.features(&Query::all()).unwrap()).unwrap();
        assert_eq!(ages[1].get("age"), Some(&Value::Integer(26)));

        let err = view
            .modify_features(&["city".to_string()], &[Value::from("x")], &anna, &txn)
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound(_)));

        assert_eq!(view.remove_features(&anna, &txn).unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_by_view_id() {
        let store = people();
        let view = writable(store.clone());
        let txn = TransactionManager::new().begin();
        assert_eq!(view.remove_features(&Filter::ids(["persons.1"]), &txn).unwrap(), 1);
        assert_eq!(store.lock_owner("people.1"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_lock_through_view() {
        let store = people();
        let view = writable(store.clone());
        let manager = TransactionManager::new();
        let owner = manager.begin();
        let other = manager.begin();

        let paul = Filter::equal(Expression::attribute("who"), Expression::literal("Paul"));
        assert_eq!(view.lock_features(&Query::filtered(paul.clone()), &owner).unwrap(), 1);
        assert_eq!(store.lock_owner("people.1"), Some(owner.id));

        let err = view.remove_features(&paul, &other).unwrap_err();
        assert!(matches!(err, Error::FeatureLocked(_)));

        assert_eq!(view.unlock_features(&Query::filtered(paul.clone()), &owner).unwrap(), 1);
        assert_eq!(view.remove_features(&paul, &other).unwrap(), 1);
    }

    #[test]
    fn test_lock_with_emulated_paging() {
        let store = Arc::new(
            MemoryDataStore::new(
                FeatureSchema::new("t", vec![AttributeDescriptor::new("a", LogicalType::Integer)])
                    .unwrap(),
            )
            .with_capabilities(StaticCapabilities::minimal()),
        );
        for n in [3, 1, 2] {
            store.insert(vec![Value::Integer(n)]);
        }
        let view = TransformedStore::new(store.clone(), "v", vec![Definition::rename("b", "a")], factory())
            .unwrap();
        let txn = TransactionManager::new().begin();

        let query = Query::all()
            .with_sort(vec![SortBy::ascending("b")])
            .with_max_features(1);
        assert_eq!(view.lock_features(&query, &txn).unwrap(), 1);
        assert_eq!(store.lock_owner("t.2"), Some(txn.id));
        assert_eq!(store.lock_owner("t.1"), None);
    }
}

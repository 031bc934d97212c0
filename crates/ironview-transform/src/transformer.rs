//! Query translation between a view and its source
//!
//! The transformer resolves the view schema once, at construction, and from
//! then on rewrites view-side requests into source-side ones:
//! - filters, by substituting every output attribute with its expression
//! - sorts, when every term maps to a rename or a constant
//! - paging, according to what the source reports it can do
//! - projection, as the minimal set of source attributes the output needs

use super::{Definition, Mapping, SridEvaluator, TypeEvaluator};
use hashbrown::HashMap;
use ironview_catalog::{AttributeDescriptor, Feature, FeatureSchema};
use ironview_common::{Error, LogicalType, Result, Srid, Value};
use ironview_expr::{cast_value, visitor, Evaluator, Expression, ExpressionFactory, Filter};
use ironview_storage::{FeatureSource, Query, QueryCapabilities, SortBy};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A view query rewritten against the source, plus what the read pipeline
/// must still do locally
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    /// The query to send to the source
    pub query: Query,
    /// View attributes the transforming stage computes: the requested ones,
    /// followed by sort attributes needed only for a local sort
    pub working: Vec<String>,
    /// View attributes returned to the caller
    pub requested: Vec<String>,
    /// Sort terms (view side) to apply locally, None when pushed down
    pub local_sort: Option<Vec<SortBy>>,
    /// Features to skip locally
    pub local_offset: Option<usize>,
    /// Maximum features to return, applied locally
    pub local_limit: Option<usize>,
}

impl TranslatedQuery {
    /// Whether sort or paging is emulated by the read pipeline
    pub fn is_emulated(&self) -> bool {
        self.local_sort.is_some() || self.local_offset.is_some() || self.local_limit.is_some()
    }
}

/// Translates between a view and the source it is defined over
pub struct Transformer {
    name: String,
    source_schema: Arc<FeatureSchema>,
    definitions: Vec<Definition>,
    index: HashMap<String, usize>,
    schema: Arc<FeatureSchema>,
    factory: Arc<dyn ExpressionFactory>,
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("name", &self.name)
            .field("source", &self.source_schema.name)
            .field("definitions", &self.definitions)
            .finish()
    }
}

impl Transformer {
    /// Resolve the view schema of `definitions` over `source`.
    ///
    /// Fails when a name is declared twice, when an expression references
    /// an attribute the source lacks, or when some type cannot be inferred
    /// statically and the source has no feature to sample.
    pub fn new(
        name: impl Into<String>,
        source: &dyn FeatureSource,
        definitions: Vec<Definition>,
        factory: Arc<dyn ExpressionFactory>,
    ) -> Result<Self> {
        let name = name.into();
        let source_schema = source.schema();

        let mut index = HashMap::new();
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.name.clone(), i).is_some() {
                return Err(Error::Configuration(format!(
                    "View {} declares attribute {} more than once",
                    name, def.name
                )));
            }
            for required in def.required_attributes() {
                if source_schema.index_of(&required).is_none() {
                    return Err(Error::AttributeNotFound(format!(
                        "{}.{}",
                        source_schema.name, required
                    )));
                }
            }
        }

        let schema = resolve_schema(&name, source, &source_schema, &definitions, factory.as_ref())?;

        Ok(Transformer {
            name,
            source_schema,
            definitions,
            index,
            schema: Arc::new(schema),
            factory,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved view schema
    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn source_schema(&self) -> &Arc<FeatureSchema> {
        &self.source_schema
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn factory(&self) -> &Arc<dyn ExpressionFactory> {
        &self.factory
    }

    fn undefined(&self, name: &str) -> Error {
        Error::AttributeNotFound(format!("{}.{}", self.name, name))
    }

    /// Whether every definition is a rename
    pub fn is_rename_only(&self) -> bool {
        self.definitions.iter().all(Definition::is_invertible)
    }

    /// Map a source feature id into the view's namespace
    pub fn transform_fid(&self, source_id: &str) -> String {
        let prefix = format!("{}.", self.source_schema.name);
        match source_id.strip_prefix(&prefix) {
            Some(local) => format!("{}.{}", self.name, local),
            None => format!("{}.{}", self.name, source_id),
        }
    }

    /// Map a view feature id back into the source's namespace
    pub fn source_fid(&self, view_id: &str) -> String {
        let prefix = format!("{}.", self.name);
        match view_id.strip_prefix(&prefix) {
            Some(local) => format!("{}.{}", self.source_schema.name, local),
            None => view_id.to_string(),
        }
    }

    /// Substitute every view attribute in `expr` with its defining expression
    pub fn translate_expression(&self, expr: &Expression) -> Result<Expression> {
        visitor::substitute(expr, &mut |name| {
            self.definition(name)
                .map(|d| d.expression.clone())
                .ok_or_else(|| self.undefined(name))
        })
    }

    /// Rewrite a view filter against the source
    pub fn translate_filter(&self, filter: &Filter) -> Result<Filter> {
        visitor::substitute_filter(
            filter,
            &mut |name| {
                self.definition(name)
                    .map(|d| d.expression.clone())
                    .ok_or_else(|| self.undefined(name))
            },
            &|id| self.source_fid(id),
        )
    }

    /// Rewrite a source filter in view terms. Only rename-only views can be
    /// mapped back.
    pub fn reverse_filter(&self, filter: &Filter) -> Result<Filter> {
        if !self.is_rename_only() {
            return Err(Error::UnsupportedOperation(format!(
                "View {} has computed attributes; filters cannot be mapped back",
                self.name
            )));
        }
        let inverse: HashMap<&str, &str> = self
            .definitions
            .iter()
            .filter_map(|d| d.source_attribute().map(|s| (s, d.name.as_str())))
            .collect();
        visitor::substitute_filter(
            filter,
            &mut |name| {
                inverse
                    .get(name)
                    .map(|view_name| self.factory.attribute(view_name))
                    .ok_or_else(|| {
                        Error::AttributeNotFound(format!("{}.{}", self.source_schema.name, name))
                    })
            },
            &|id| self.transform_fid(id),
        )
    }

    /// Translate sort terms. None means at least one term sorts on a computed
    /// attribute, so the whole sort has to happen locally.
    pub fn translate_sort(&self, sort_by: &[SortBy]) -> Result<Option<Vec<SortBy>>> {
        let mut translated = Vec::with_capacity(sort_by.len());
        for term in sort_by {
            match term {
                SortBy::NaturalOrder | SortBy::ReverseOrder => translated.push(term.clone()),
                SortBy::Property { name, order } => {
                    let def = self.definition(name).ok_or_else(|| self.undefined(name))?;
                    match &def.mapping {
                        Mapping::Rename(source) => translated.push(SortBy::Property {
                            name: source.clone(),
                            order: *order,
                        }),
                        Mapping::Constant(_) => {}
                        Mapping::Computed => return Ok(None),
                    }
                }
            }
        }
        Ok(Some(translated))
    }

    /// Source attributes needed to compute the given view attributes, in
    /// source schema order
    pub fn required_attributes(&self, names: &[String]) -> Result<Vec<String>> {
        let mut refs = BTreeSet::new();
        for name in names {
            let def = self.definition(name).ok_or_else(|| self.undefined(name))?;
            visitor::collect_attribute_refs(&def.expression, &mut refs);
        }
        Ok(self
            .source_schema
            .attributes()
            .iter()
            .filter(|a| refs.contains(&a.name))
            .map(|a| a.name.clone())
            .collect())
    }

    /// Rewrite a view query against the source, negotiating sort and paging
    /// with the source's capabilities
    pub fn translate_query(
        &self,
        query: &Query,
        capabilities: &dyn QueryCapabilities,
    ) -> Result<TranslatedQuery> {
        let requested: Vec<String> = match &query.properties {
            Some(names) => {
                for name in names {
                    if self.definition(name).is_none() {
                        return Err(self.undefined(name));
                    }
                }
                names.clone()
            }
            None => self.definitions.iter().map(|d| d.name.clone()).collect(),
        };

        let filter = self.translate_filter(&query.filter)?;
        let translated_sort = self.translate_sort(&query.sort_by)?;

        let mut offset = query.offset();
        let mut max_features = query.max_features;

        // (a) offset together with a filter
        if offset.is_some() && !filter.is_include() && !capabilities.supports_offset_with_filter() {
            offset = None;
        }
        // (b) sort the source cannot perform
        let pushed_sort = translated_sort.filter(|s| capabilities.supports_sorting(s));
        // (c) without a pushed sort, paging must follow the local sort
        let sort_locally = !query.sort_by.is_empty() && pushed_sort.is_none();
        if sort_locally {
            offset = None;
            max_features = None;
        }
        // (d) no offset support at all
        if !capabilities.supports_offset() {
            offset = None;
        }

        let offset_dropped = query.offset().is_some() && offset.is_none();
        let (local_offset, local_limit) = if sort_locally {
            (query.offset(), query.max_features)
        } else if offset_dropped {
            max_features = query
                .max_features
                .map(|max| max.saturating_add(query.offset().unwrap_or(0)));
            (query.offset(), query.max_features)
        } else {
            (None, None)
        };

        let mut working = requested.clone();
        if sort_locally {
            for name in query.sort_by.iter().filter_map(SortBy::property) {
                if !working.iter().any(|w| w == name) {
                    working.push(name.to_string());
                }
            }
        }
        let required = self.required_attributes(&working)?;

        let translated = TranslatedQuery {
            query: Query {
                filter,
                properties: Some(required),
                sort_by: pushed_sort.unwrap_or_default(),
                max_features,
                start_index: offset,
            },
            working,
            requested,
            local_sort: if sort_locally {
                Some(query.sort_by.clone())
            } else {
                None
            },
            local_offset,
            local_limit,
        };

        debug!(
            view = %self.name,
            query = %query,
            translated = %translated.query,
            sort_locally,
            local_offset = ?translated.local_offset,
            local_limit = ?translated.local_limit,
            "translated view query"
        );
        Ok(translated)
    }

    /// Schema holding the named view attributes, in the order given
    pub fn output_schema(&self, names: &[String]) -> Result<Arc<FeatureSchema>> {
        if names.len() == self.schema.attribute_count()
            && names
                .iter()
                .zip(self.schema.attributes())
                .all(|(n, a)| *n == a.name)
        {
            return Ok(self.schema.clone());
        }
        Ok(Arc::new(self.schema.subset(names)?))
    }

    /// Compute the output feature for one source feature. Attributes of
    /// `schema` without a definition come out NULL.
    pub fn transform_feature(&self, source: &Feature, schema: &Arc<FeatureSchema>) -> Result<Feature> {
        let evaluator = Evaluator::new(self.factory.functions());
        let mut values = Vec::with_capacity(schema.attribute_count());
        for attr in schema.attributes() {
            let value = match self.definition(&attr.name) {
                Some(def) => conform(evaluator.evaluate(&def.expression, source)?, &attr.logical_type)?,
                None => Value::Null,
            };
            values.push(value);
        }
        Ok(Feature::new(self.transform_fid(&source.id), schema.clone(), values))
    }
}

/// Bring a computed value in line with the declared attribute type
fn conform(value: Value, ty: &LogicalType) -> Result<Value> {
    if value.is_null() || ty.is_generic() || value.logical_type() == *ty {
        return Ok(value);
    }
    if let (Value::Geometry(_), LogicalType::Geometry(_)) = (&value, ty) {
        return Ok(value);
    }
    cast_value(&value, ty)
}

/// Statically resolved descriptor, None when the type cannot be inferred
fn resolve_static(def: &Definition, source: &FeatureSchema) -> Result<Option<AttributeDescriptor>> {
    let srid_of = |ty: &LogicalType, inferred: Option<Srid>| {
        if ty.is_geometry() {
            def.srid.or(inferred)
        } else {
            None
        }
    };

    if let Some(ty) = &def.logical_type {
        let inferred = if ty.is_geometry() && def.srid.is_none() {
            SridEvaluator::new(source).evaluate(&def.expression)
        } else {
            None
        };
        return Ok(Some(
            AttributeDescriptor::new(def.name.clone(), ty.clone())
                .with_srid(srid_of(ty, inferred))
                .with_description(def.description.clone()),
        ));
    }

    if let Mapping::Rename(name) = &def.mapping {
        let attr = source
            .get_attribute(name)
            .ok_or_else(|| Error::AttributeNotFound(format!("{}.{}", source.name, name)))?;
        let mut out = attr.renamed(def.name.clone());
        if def.srid.is_some() && out.is_geometry() {
            out = out.with_srid(def.srid);
        }
        if def.description.is_some() {
            out = out.with_description(def.description.clone());
        }
        return Ok(Some(out));
    }

    let mut types = TypeEvaluator::new(source);
    let ty = match types.evaluate(&def.expression)? {
        Some(ty) => ty,
        None => return Ok(None),
    };
    let inferred = if ty.is_geometry() && def.srid.is_none() {
        SridEvaluator::new(source)
            .evaluate(&def.expression)
            .or(types.srid())
    } else {
        None
    };
    Ok(Some(
        AttributeDescriptor::new(def.name.clone(), ty.clone())
            .with_srid(srid_of(&ty, inferred))
            .with_description(def.description.clone()),
    ))
}

fn resolve_schema(
    name: &str,
    source: &dyn FeatureSource,
    source_schema: &FeatureSchema,
    definitions: &[Definition],
    factory: &dyn ExpressionFactory,
) -> Result<FeatureSchema> {
    let statics = definitions
        .iter()
        .map(|def| resolve_static(def, source_schema))
        .collect::<Result<Vec<_>>>()?;

    let unresolved: Vec<&str> = definitions
        .iter()
        .zip(&statics)
        .filter(|(_, s)| s.is_none())
        .map(|(d, _)| d.name.as_str())
        .collect();
    if unresolved.is_empty() {
        let attributes = statics.into_iter().flatten().collect();
        return FeatureSchema::new(name, attributes);
    }

    debug!(view = %name, unresolved = ?unresolved, "static type resolution failed, sampling source");
    let sample = sample_feature(source)?.ok_or_else(|| {
        Error::Configuration(format!(
            "Cannot infer the type of {} in view {}: no static type and the source is empty",
            unresolved.join(", "),
            name
        ))
    })?;

    let evaluator = Evaluator::new(factory.functions());
    let mut attributes = Vec::with_capacity(definitions.len());
    for (def, resolved) in definitions.iter().zip(statics) {
        let value = evaluator.evaluate(&def.expression, &sample)?;
        let ty = match (&def.logical_type, &value, &resolved) {
            (Some(ty), _, _) => ty.clone(),
            (None, Value::Null, Some(r)) => r.logical_type.clone(),
            (None, Value::Null, None) => LogicalType::Any,
            (None, v, _) => v.logical_type(),
        };
        let srid = match (&ty, value.as_geometry()) {
            (LogicalType::Geometry(_), Some(g)) => def.srid.or(g.srid),
            (LogicalType::Geometry(_), None) => def.srid.or(resolved.as_ref().and_then(|r| r.srid)),
            _ => None,
        };
        attributes.push(
            AttributeDescriptor::new(def.name.clone(), ty)
                .with_srid(srid)
                .with_description(def.description.clone()),
        );
    }
    FeatureSchema::new(name, attributes)
}

/// First feature of an unfiltered read
fn sample_feature(source: &dyn FeatureSource) -> Result<Option<Feature>> {
    let mut reader = source.features(&Query::all())?;
    let sample = reader.next_feature();
    if let Err(e) = reader.close() {
        warn!(source = %source.name(), error = %e, "failed to close sampling reader");
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironview_common::{Geometry, GeometryKind};
    use ironview_expr::{ArithmeticOperator, ComparisonOperator, DefaultExpressionFactory};
    use ironview_storage::{MemoryDataStore, SortOrder, StaticCapabilities};

    fn factory() -> Arc<dyn ExpressionFactory> {
        Arc::new(DefaultExpressionFactory::new())
    }

    fn source_schema() -> FeatureSchema {
        FeatureSchema::new(
            "src",
            vec![
                AttributeDescriptor::new("x", LogicalType::Integer),
                AttributeDescriptor::new("y", LogicalType::Integer),
                AttributeDescriptor::new("big", LogicalType::BigInt),
                AttributeDescriptor::new("ratio", LogicalType::Double),
                AttributeDescriptor::new("name", LogicalType::Varchar),
                AttributeDescriptor::geometry(
                    "geom",
                    LogicalType::Geometry(GeometryKind::Point),
                    Srid(4326),
                ),
            ],
        )
        .unwrap()
    }

    fn store() -> MemoryDataStore {
        let store = MemoryDataStore::new(source_schema());
        store.insert(vec![
            Value::Integer(2),
            Value::Integer(3),
            Value::BigInt(10_000_000_000),
            Value::Double(0.25),
            Value::from("Paul"),
            Value::Geometry(Geometry::point(1.0, 2.0).with_srid(Srid(4326))),
        ]);
        store
    }

    fn op(l: &str, op: ArithmeticOperator, r: &str) -> Expression {
        factory().arithmetic(Expression::attribute(l), op, Expression::attribute(r))
    }

    fn concat_bang() -> Expression {
        factory()
            .function("concat", vec![Expression::attribute("name"), Expression::literal("!")])
            .unwrap()
    }

    /// A = rename(x), B = x + y, label = concat(name, '!')
    fn transformer(source: &MemoryDataStore) -> Transformer {
        Transformer::new(
            "view",
            source,
            vec![
                Definition::rename("a", "x"),
                Definition::new("b", op("x", ArithmeticOperator::Add, "y")),
                Definition::new("label", concat_bang()),
                Definition::rename("location", "geom"),
                Definition::new("one", Expression::literal(1)),
            ],
            factory(),
        )
        .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_resolution() {
        let s = store();
        let t = transformer(&s);
        let schema = t.schema();
        assert_eq!(
            schema.attribute_names(),
            vec!["a", "b", "label", "location", "one"]
        );
        assert_eq!(schema.get_attribute("a").unwrap().logical_type, LogicalType::Integer);
        assert_eq!(schema.get_attribute("b").unwrap().logical_type, LogicalType::Integer);
        assert_eq!(schema.get_attribute("label").unwrap().logical_type, LogicalType::Varchar);
        let location = schema.get_attribute("location").unwrap();
        assert_eq!(location.srid, Some(Srid(4326)));
        assert_eq!(schema.default_geometry().unwrap().name, "location");
    }

    #[test]
    fn test_explicit_type_and_srid() {
        let s = store();
        let t = Transformer::new(
            "view",
            &s,
            vec![
                Definition::new("n", Expression::attribute("x"))
                    .with_type(LogicalType::Varchar)
                    .with_description("as text"),
                Definition::new(
                    "box",
                    factory()
                        .function("envelope", vec![Expression::attribute("geom")])
                        .unwrap(),
                ),
                Definition::rename("g", "geom").with_srid(Srid(3857)),
            ],
            factory(),
        )
        .unwrap();
        let n = t.schema().get_attribute("n").unwrap();
        assert_eq!(n.logical_type, LogicalType::Varchar);
        assert_eq!(n.description.as_deref(), Some("as text"));
        let bbox = t.schema().get_attribute("box").unwrap();
        assert_eq!(bbox.logical_type, LogicalType::Geometry(GeometryKind::Polygon));
        assert_eq!(bbox.srid, Some(Srid(4326)));
        assert_eq!(t.schema().get_attribute("g").unwrap().srid, Some(Srid(3857)));

        let feature = t
            .transform_feature(&read_first(&s), &t.schema().clone())
            .unwrap();
        assert_eq!(feature.get("n"), Some(&Value::from("2")));
    }

    fn read_first(s: &MemoryDataStore) -> Feature {
        ironview_storage::read_all(s.features(&Query::all()).unwrap())
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let s = store();
        let err = Transformer::new(
            "view",
            &s,
            vec![Definition::rename("a", "x"), Definition::rename("a", "y")],
            factory(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_missing_source_attribute_rejected() {
        let s = store();
        let err = Transformer::new("view", &s, vec![Definition::rename("a", "nope")], factory())
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound(_)));
    }

    #[test]
    fn test_sampling_fallback() {
        let generic = factory()
            .function("coalesce", vec![Expression::attribute("name")])
            .unwrap();
        let defs = vec![Definition::rename("a", "x"), Definition::new("c", generic)];

        let s = store();
        let t = Transformer::new("view", &s, defs.clone(), factory()).unwrap();
        assert_eq!(t.schema().get_attribute("c").unwrap().logical_type, LogicalType::Varchar);
        assert_eq!(s.open_readers(), 0);

        let empty = MemoryDataStore::new(source_schema());
        let err = Transformer::new("view", &empty, defs, factory()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_arithmetic_types_match_sampled_values() {
        let s = store();
        let t = Transformer::new(
            "view",
            &s,
            vec![
                Definition::new("ii", op("x", ArithmeticOperator::Add, "y")),
                Definition::new("il", op("x", ArithmeticOperator::Add, "big")),
                Definition::new("id", op("x", ArithmeticOperator::Add, "ratio")),
            ],
            factory(),
        )
        .unwrap();
        let schema = t.schema();
        assert_eq!(schema.get_attribute("ii").unwrap().logical_type, LogicalType::Integer);
        assert_eq!(schema.get_attribute("il").unwrap().logical_type, LogicalType::BigInt);
        assert_eq!(schema.get_attribute("id").unwrap().logical_type, LogicalType::Double);

        let feature = t.transform_feature(&read_first(&s), schema).unwrap();
        assert_eq!(feature.get("ii"), Some(&Value::Integer(5)));
        assert_eq!(feature.get("il"), Some(&Value::BigInt(10_000_000_002)));
        assert_eq!(feature.get("id"), Some(&Value::Double(2.25)));
        for attr in schema.attributes() {
            assert_eq!(feature.get(&attr.name).unwrap().logical_type(), attr.logical_type);
        }
    }

    #[test]
    fn test_required_attributes() {
        let s = store();
        let t = transformer(&s);
        assert_eq!(t.required_attributes(&names(&["a"])).unwrap(), names(&["x"]));
        assert_eq!(t.required_attributes(&names(&["b"])).unwrap(), names(&["x", "y"]));
        assert_eq!(
            t.required_attributes(&names(&["a", "b"])).unwrap(),
            names(&["x", "y"])
        );
        assert!(t.required_attributes(&names(&["one"])).unwrap().is_empty());

        let translated = t
            .translate_query(&Query::all().with_properties(["b", "a"]), &StaticCapabilities::full())
            .unwrap();
        assert_eq!(translated.query.properties, Some(names(&["x", "y"])));
        assert!(!translated.is_emulated());
    }

    #[test]
    fn test_filter_substitution() {
        let s = store();
        let t = transformer(&s);
        let filter = Filter::equal(Expression::attribute("label"), Expression::literal("Paul!"));
        assert_eq!(
            t.translate_filter(&filter).unwrap(),
            Filter::equal(concat_bang(), Expression::literal("Paul!"))
        );

        let undefined = Filter::equal(Expression::attribute("zzz"), Expression::literal(1));
        assert!(matches!(
            t.translate_filter(&undefined),
            Err(Error::AttributeNotFound(_))
        ));

        assert_eq!(
            t.translate_filter(&Filter::ids(["view.1", "other.2"])).unwrap(),
            Filter::ids(["src.1", "other.2"])
        );
    }

    #[test]
    fn test_rename_filter_round_trip() {
        let s = store();
        let t = Transformer::new(
            "view",
            &s,
            vec![Definition::rename("a", "x"), Definition::rename("n", "name")],
            factory(),
        )
        .unwrap();
        let filter = Filter::And(vec![
            Filter::compare(
                Expression::attribute("a"),
                ComparisonOperator::GreaterThan,
                Expression::literal(1),
            ),
            Filter::Like {
                expr: Expression::attribute("n"),
                pattern: "P%".to_string(),
                negated: false,
            },
            Filter::ids(["view.1"]),
        ]);
        let translated = t.translate_filter(&filter).unwrap();
        assert_ne!(translated, filter);
        assert_eq!(t.reverse_filter(&translated).unwrap(), filter);

        let computed = transformer(&s);
        assert!(matches!(
            computed.reverse_filter(&Filter::Include),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_sort_translation() {
        let s = store();
        let t = transformer(&s);
        assert_eq!(
            t.translate_sort(&[SortBy::descending("a"), SortBy::ascending("one"), SortBy::NaturalOrder])
                .unwrap(),
            Some(vec![
                SortBy::Property {
                    name: "x".to_string(),
                    order: SortOrder::Descending
                },
                SortBy::NaturalOrder
            ])
        );
        assert_eq!(
            t.translate_sort(&[SortBy::ascending("a"), SortBy::ascending("b")]).unwrap(),
            None
        );
    }

    #[test]
    fn test_unpushable_sort_moves_paging_local() {
        let s = store();
        let t = transformer(&s);
        let query = Query::all()
            .with_properties(["a"])
            .with_sort(vec![SortBy::ascending("b")])
            .with_start_index(5)
            .with_max_features(10);
        let translated = t.translate_query(&query, &StaticCapabilities::full()).unwrap();

        assert!(translated.query.sort_by.is_empty());
        assert_eq!(translated.query.start_index, None);
        assert_eq!(translated.query.max_features, None);
        assert_eq!(translated.local_sort, Some(vec![SortBy::ascending("b")]));
        assert_eq!(translated.local_offset, Some(5));
        assert_eq!(translated.local_limit, Some(10));
        assert_eq!(translated.working, names(&["a", "b"]));
        assert_eq!(translated.requested, names(&["a"]));
        assert_eq!(translated.query.properties, Some(names(&["x", "y"])));
    }

    #[test]
    fn test_capability_negotiation() {
        let s = store();
        let t = transformer(&s);
        let filtered = Query::filtered(Filter::equal(
            Expression::attribute("a"),
            Expression::literal(2),
        ))
        .with_sort(vec![SortBy::ascending("a")])
        .with_start_index(5)
        .with_max_features(10);

        // everything pushed
        let full = t.translate_query(&filtered, &StaticCapabilities::full()).unwrap();
        assert_eq!(full.query.start_index, Some(5));
        assert_eq!(full.query.max_features, Some(10));
        assert!(!full.is_emulated());

        // offset cannot be combined with a filter
        let caps = StaticCapabilities {
            offset_with_filter: false,
            ..StaticCapabilities::full()
        };
        let no_filter_offset = t.translate_query(&filtered, &caps).unwrap();
        assert_eq!(no_filter_offset.query.start_index, None);
        assert_eq!(no_filter_offset.query.max_features, Some(15));
        assert_eq!(no_filter_offset.local_offset, Some(5));
        assert_eq!(no_filter_offset.local_limit, Some(10));
        assert_eq!(no_filter_offset.local_sort, None);

        // no sorting at all
        let unsorted = t
            .translate_query(&filtered, &StaticCapabilities::full().with_sortable(["y"]))
            .unwrap();
        assert!(unsorted.query.sort_by.is_empty());
        assert_eq!(unsorted.query.max_features, None);
        assert!(unsorted.local_sort.is_some());

        // no offset support
        let caps = StaticCapabilities {
            offset: false,
            ..StaticCapabilities::full()
        };
        let plain = Query::all()
            .with_sort(vec![SortBy::ascending("a")])
            .with_start_index(2);
        let no_offset = t.translate_query(&plain, &caps).unwrap();
        assert_eq!(no_offset.query.start_index, None);
        assert_eq!(no_offset.query.max_features, None);
        assert_eq!(no_offset.local_offset, Some(2));
        assert_eq!(no_offset.local_limit, None);
    }

    #[test]
    fn test_unknown_requested_attribute() {
        let s = store();
        let t = transformer(&s);
        let err = t
            .translate_query(&Query::all().with_properties(["nope"]), &StaticCapabilities::full())
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound(_)));
    }

    #[test]
    fn test_fid_mapping() {
        let s = store();
        let t = transformer(&s);
        assert_eq!(t.transform_fid("src.3"), "view.3");
        assert_eq!(t.transform_fid("3"), "view.3");
        assert_eq!(t.source_fid("view.3"), "src.3");
    }
}

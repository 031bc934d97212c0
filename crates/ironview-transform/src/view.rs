//! Read-only view over a feature source

use super::{
    plan_aggregate, AggregatePlan, Definition, LimitReader, OffsetReader, ReaderGuard,
    RetypingReader, SortingReader, TransformingReader, Transformer, ViewConfig,
};
use ironview_catalog::FeatureSchema;
use ironview_common::{Envelope, Error, Result};
use ironview_expr::ExpressionFactory;
use ironview_storage::{
    read_all, Aggregate, AggregateCollector, AggregateResult, Count, FeatureListener,
    FeatureReader, FeatureSource, Query, QueryCapabilities, SortBy,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default cap on features held by the local sort stage
pub const DEFAULT_SORT_MEMORY_LIMIT: usize = 100_000;

/// Tuning of the read pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Maximum features a local sort may hold in memory
    pub sort_memory_limit: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions {
            sort_memory_limit: DEFAULT_SORT_MEMORY_LIMIT,
        }
    }
}

/// What a view can do: paging and sorting on its own attributes always
/// work, emulated locally when the source cannot. Identity guarantees are
/// those of the source.
#[derive(Debug, Clone)]
pub struct ViewCapabilities {
    attributes: Vec<String>,
    reliable_fid: bool,
    provided_fid: bool,
}

impl QueryCapabilities for ViewCapabilities {
    fn supports_offset(&self) -> bool {
        true
    }

    fn supports_offset_with_filter(&self) -> bool {
        true
    }

    fn supports_sorting(&self, sort_by: &[SortBy]) -> bool {
        sort_by
            .iter()
            .filter_map(SortBy::property)
            .all(|p| self.attributes.iter().any(|a| a == p))
    }

    fn supports_reliable_fid(&self) -> bool {
        self.reliable_fid
    }

    fn supports_provided_fid(&self) -> bool {
        self.provided_fid
    }
}

/// A feature source whose features are computed from another source's
pub struct TransformedView {
    source: Arc<dyn FeatureSource>,
    transformer: Arc<Transformer>,
    options: ViewOptions,
    capabilities: ViewCapabilities,
}

impl TransformedView {
    pub fn new(
        source: Arc<dyn FeatureSource>,
        name: impl Into<String>,
        definitions: Vec<Definition>,
        factory: Arc<dyn ExpressionFactory>,
    ) -> Result<Self> {
        Self::with_options(source, name, definitions, factory, ViewOptions::default())
    }

    pub fn with_options(
        source: Arc<dyn FeatureSource>,
        name: impl Into<String>,
        definitions: Vec<Definition>,
        factory: Arc<dyn ExpressionFactory>,
        options: ViewOptions,
    ) -> Result<Self> {
        let transformer = Transformer::new(name, source.as_ref(), definitions, factory)?;
        let source_caps = source.capabilities();
        let capabilities = ViewCapabilities {
            attributes: transformer
                .schema()
                .attributes()
                .iter()
                .map(|a| a.name.clone())
                .collect(),
            reliable_fid: source_caps.supports_reliable_fid(),
            provided_fid: source_caps.supports_provided_fid(),
        };
        Ok(TransformedView {
            source,
            transformer: Arc::new(transformer),
            options,
            capabilities,
        })
    }

    /// Build a view from its declarative form
    pub fn from_config(
        source: Arc<dyn FeatureSource>,
        config: &ViewConfig,
        factory: Arc<dyn ExpressionFactory>,
    ) -> Result<Self> {
        let definitions = config.definitions(factory.as_ref())?;
        Self::with_options(source, config.name.clone(), definitions, factory, config.options())
    }

    pub fn transformer(&self) -> &Arc<Transformer> {
        &self.transformer
    }

    pub fn source(&self) -> &Arc<dyn FeatureSource> {
        &self.source
    }

    pub fn options(&self) -> ViewOptions {
        self.options
    }

    /// Count by reading every selected feature
    fn count_locally(&self, query: &Query) -> Result<u64> {
        let mut reader = self.features(&Query {
            properties: Some(Vec::new()),
            ..query.clone()
        })?;
        let mut count = 0u64;
        let result = loop {
            match reader.next_feature() {
                Ok(Some(_)) => count += 1,
                Ok(None) => break Ok(count),
                Err(e) => break Err(e),
            }
        };
        if let Err(e) = reader.close() {
            warn!(
                view = %self.transformer.name(),
                error = %e,
                "failed to close counting reader"
            );
        }
        result
    }

    /// Order does not change a measure over the whole selection, but it picks
    /// the page of a paged query
    fn measured(query: &Query) -> Query {
        if query.is_paged() {
            query.clone()
        } else {
            Query {
                sort_by: Vec::new(),
                ..query.clone()
            }
        }
    }

    fn aggregate_locally(&self, query: &Query, aggregate: &Aggregate) -> Result<AggregateResult> {
        let features = read_all(self.features(&Query {
            properties: None,
            ..query.clone()
        })?)?;
        let mut collector = AggregateCollector::new(aggregate, self.transformer.factory().functions());
        for feature in &features {
            collector.visit(feature)?;
        }
        Ok(collector.finish())
    }
}

impl FeatureSource for TransformedView {
    fn schema(&self) -> Arc<FeatureSchema> {
        self.transformer.schema().clone()
    }

    fn name(&self) -> String {
        self.transformer.name().to_string()
    }

    fn capabilities(&self) -> &dyn QueryCapabilities {
        &self.capabilities
    }

    fn features(&self, query: &Query) -> Result<Box<dyn FeatureReader>> {
        let translated = self
            .transformer
            .translate_query(query, self.source.capabilities())?;

        let working = self.transformer.output_schema(&translated.working)?;
        let output = if translated.working.len() != translated.requested.len() {
            Some(self.transformer.output_schema(&translated.requested)?)
        } else {
            None
        };

        let opened = self
            .source
            .features(&translated.query)
            .map_err(|e| e.while_reading(self.transformer.name()))?;
        let guard = ReaderGuard::new(self.transformer.name(), opened);

        let mut reader: Box<dyn FeatureReader> = Box::new(TransformingReader::new(
            Box::new(guard),
            self.transformer.clone(),
            working,
        ));

        if let Some(sort_by) = translated.local_sort {
            reader = Box::new(SortingReader::new(
                reader,
                sort_by,
                self.options.sort_memory_limit,
            ));
        }
        if let Some(offset) = translated.local_offset {
            reader = Box::new(OffsetReader::new(reader, offset));
        }
        if let Some(max) = translated.local_limit {
            reader = Box::new(LimitReader::new(reader, max));
        }
        if let Some(output) = output {
            reader = Box::new(RetypingReader::new(reader, output));
        }
        Ok(reader)
    }

    fn count(&self, query: &Query) -> Result<Count> {
        let unsorted = Query {
            sort_by: Vec::new(),
            properties: Some(Vec::new()),
            ..query.clone()
        };
        let translated = self
            .transformer
            .translate_query(&unsorted, self.source.capabilities())?;
        if !translated.is_emulated() {
            if let Count::Exact(n) = self.source.count(&translated.query)? {
                return Ok(Count::Exact(n));
            }
        }
        debug!(view = %self.transformer.name(), "counting locally");
        Ok(Count::Exact(self.count_locally(&unsorted)?))
    }

    fn bounds(&self, query: &Query) -> Result<Option<Envelope>> {
        let geometry = match self.transformer.schema().default_geometry() {
            Some(attr) => attr.name.clone(),
            None => return Ok(None),
        };
        let renamed = self
            .transformer
            .definition(&geometry)
            .map_or(false, Definition::is_invertible);

        let narrowed = Query {
            properties: Some(vec![geometry.clone()]),
            ..Self::measured(query)
        };
        if renamed {
            let translated = self
                .transformer
                .translate_query(&narrowed, self.source.capabilities())?;
            if !translated.is_emulated() {
                return self.source.bounds(&translated.query);
            }
        }

        debug!(view = %self.transformer.name(), "computing bounds locally");
        let mut bounds: Option<Envelope> = None;
        for feature in read_all(self.features(&narrowed)?)? {
            if let Some(env) = feature.bounds() {
                bounds = Some(Envelope::union(bounds, &env));
            }
        }
        Ok(bounds)
    }

    fn aggregate(&self, query: &Query, aggregate: &Aggregate) -> Result<Option<AggregateResult>> {
        let translated = self
            .transformer
            .translate_query(&Self::measured(query), self.source.capabilities())?;

        if !translated.is_emulated() {
            if let AggregatePlan::Delegate(pushed) = plan_aggregate(&self.transformer, aggregate)? {
                debug!(view = %self.transformer.name(), aggregate = %pushed, "delegating aggregate");
                if let Some(result) = self.source.aggregate(&translated.query, &pushed)? {
                    return Ok(Some(result));
                }
            }
        }

        debug!(view = %self.transformer.name(), aggregate = %aggregate, "aggregating locally");
        self.aggregate_locally(query, aggregate).map(Some)
    }

    fn add_listener(&self, _listener: Arc<dyn FeatureListener>) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "View {} does not publish change events",
            self.transformer.name()
        )))
    }
}

//! Read pipeline stages
//!
//! A view read is a chain of readers over the source reader:
//! guard -> transform -> [sort] -> [offset] -> [limit] -> [retype].
//! Every stage forwards `close` down the chain; the guard also closes the
//! source reader when dropped without being closed.

use super::Transformer;
use ironview_catalog::{Feature, FeatureSchema};
use ironview_common::{Error, Result};
use ironview_storage::{FeatureReader, SortBy, SortOrder};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

/// Owns the source reader. Errors it yields are tagged with the view name,
/// and the source reader is released on drop if nobody closed it.
pub struct ReaderGuard {
    view: String,
    schema: Arc<FeatureSchema>,
    inner: Option<Box<dyn FeatureReader>>,
}

impl ReaderGuard {
    pub fn new(view: impl Into<String>, inner: Box<dyn FeatureReader>) -> Self {
        ReaderGuard {
            view: view.into(),
            schema: inner.schema().clone(),
            inner: Some(inner),
        }
    }
}

impl FeatureReader for ReaderGuard {
    fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        match self.inner.as_mut() {
            Some(reader) => reader.next_feature().map_err(|e| e.while_reading(&self.view)),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut reader) => reader.close(),
            None => Ok(()),
        }
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        if let Some(mut reader) = self.inner.take() {
            if let Err(e) = reader.close() {
                warn!(view = %self.view, error = %e, "failed to release source reader");
            }
        }
    }
}

/// Computes view features from source features
pub struct TransformingReader {
    inner: Box<dyn FeatureReader>,
    transformer: Arc<Transformer>,
    schema: Arc<FeatureSchema>,
}

impl TransformingReader {
    pub fn new(
        inner: Box<dyn FeatureReader>,
        transformer: Arc<Transformer>,
        schema: Arc<FeatureSchema>,
    ) -> Self {
        TransformingReader {
            inner,
            transformer,
            schema,
        }
    }
}

impl FeatureReader for TransformingReader {
    fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        match self.inner.next_feature()? {
            Some(source) => self
                .transformer
                .transform_feature(&source, &self.schema)
                .map(Some)
                .map_err(|e| e.while_reading(self.transformer.name())),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// Materializes its input and hands it out sorted. Holds at most `limit`
/// features.
pub struct SortingReader {
    inner: Box<dyn FeatureReader>,
    sort_by: Vec<SortBy>,
    limit: usize,
    sorted: Option<std::vec::IntoIter<Feature>>,
}

impl SortingReader {
    pub fn new(inner: Box<dyn FeatureReader>, sort_by: Vec<SortBy>, limit: usize) -> Self {
        SortingReader {
            inner,
            sort_by,
            limit,
            sorted: None,
        }
    }

    fn materialize(&mut self) -> Result<std::vec::IntoIter<Feature>> {
        let mut features = Vec::new();
        while let Some(feature) = self.inner.next_feature()? {
            if features.len() >= self.limit {
                return Err(Error::MemoryLimitExceeded { limit: self.limit });
            }
            features.push(feature);
        }

        let sort_by = &self.sort_by;
        features.sort_by(|a, b| {
            for term in sort_by {
                let cmp = match term {
                    SortBy::NaturalOrder => fid_cmp(&a.id, &b.id),
                    SortBy::ReverseOrder => fid_cmp(&b.id, &a.id),
                    SortBy::Property { name, order } => {
                        let left = a.get(name);
                        let right = b.get(name);
                        let cmp = match (left, right) {
                            (Some(l), Some(r)) => l.sort_cmp(r),
                            _ => Ordering::Equal,
                        };
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
        Ok(features.into_iter())
    }
}

/// Order feature ids by their numeric suffix when both have one
fn fid_cmp(a: &str, b: &str) -> Ordering {
    let suffix = |id: &str| id.rsplit('.').next().and_then(|s| s.parse::<u64>().ok());
    match (suffix(a), suffix(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

impl FeatureReader for SortingReader {
    fn schema(&self) -> &Arc<FeatureSchema> {
        self.inner.schema()
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        if self.sorted.is_none() {
            self.sorted = Some(self.materialize()?);
        }
        Ok(self.sorted.as_mut().and_then(Iterator::next))
    }

    fn close(&mut self) -> Result<()> {
        self.sorted = None;
        self.inner.close()
    }
}

/// Skips the first `remaining` features, one at a time
pub struct OffsetReader {
    inner: Box<dyn FeatureReader>,
    remaining: usize,
}

impl OffsetReader {
    pub fn new(inner: Box<dyn FeatureReader>, offset: usize) -> Self {
        OffsetReader {
            inner,
            remaining: offset,
        }
    }
}

impl FeatureReader for OffsetReader {
    fn schema(&self) -> &Arc<FeatureSchema> {
        self.inner.schema()
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        while self.remaining > 0 {
            self.remaining -= 1;
            if self.inner.next_feature()?.is_none() {
                self.remaining = 0;
                return Ok(None);
            }
        }
        self.inner.next_feature()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// Stops after `remaining` features
pub struct LimitReader {
    inner: Box<dyn FeatureReader>,
    remaining: usize,
}

impl LimitReader {
    pub fn new(inner: Box<dyn FeatureReader>, max: usize) -> Self {
        LimitReader {
            inner,
            remaining: max,
        }
    }
}

impl FeatureReader for LimitReader {
    fn schema(&self) -> &Arc<FeatureSchema> {
        self.inner.schema()
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let next = self.inner.next_feature()?;
        if next.is_some() {
            self.remaining -= 1;
        }
        Ok(next)
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// Reduces features to the requested attributes, dropping attributes that
/// were only computed for a local sort
pub struct RetypingReader {
    inner: Box<dyn FeatureReader>,
    schema: Arc<FeatureSchema>,
}

impl RetypingReader {
    pub fn new(inner: Box<dyn FeatureReader>, schema: Arc<FeatureSchema>) -> Self {
        RetypingReader { inner, schema }
    }
}

impl FeatureReader for RetypingReader {
    fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        Ok(self
            .inner
            .next_feature()?
            .map(|f| f.retype(self.schema.clone())))
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

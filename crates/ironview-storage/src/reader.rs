//! Pull-based feature iteration

use ironview_catalog::{Feature, FeatureSchema};
use ironview_common::Result;
use std::sync::Arc;
use tracing::warn;

/// A forward-only cursor over features. Holders must call `close` once they
/// are done, on every exit path.
pub trait FeatureReader: Send {
    /// Schema of the features this reader produces
    fn schema(&self) -> &Arc<FeatureSchema>;

    /// The next feature, None when exhausted
    fn next_feature(&mut self) -> Result<Option<Feature>>;

    /// Release the underlying resources
    fn close(&mut self) -> Result<()>;
}

type CloseHook = Box<dyn FnOnce() -> Result<()> + Send>;

/// Reader over features already held in memory
pub struct VecFeatureReader {
    schema: Arc<FeatureSchema>,
    features: std::vec::IntoIter<Feature>,
    on_close: Option<CloseHook>,
}

impl VecFeatureReader {
    pub fn new(schema: Arc<FeatureSchema>, features: Vec<Feature>) -> Self {
        VecFeatureReader {
            schema,
            features: features.into_iter(),
            on_close: None,
        }
    }

    /// Run `hook` when the reader is first closed
    pub fn on_close(mut self, hook: impl FnOnce() -> Result<()> + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }
}

impl FeatureReader for VecFeatureReader {
    fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    fn next_feature(&mut self) -> Result<Option<Feature>> {
        Ok(self.features.next())
    }

    fn close(&mut self) -> Result<()> {
        self.features = Vec::new().into_iter();
        match self.on_close.take() {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }
}

/// Drain a reader, closing it afterwards whether or not reading failed.
/// A failure to close is logged rather than returned.
pub fn read_all(mut reader: Box<dyn FeatureReader>) -> Result<Vec<Feature>> {
    let mut features = Vec::new();
    let result = loop {
        match reader.next_feature() {
            Ok(Some(f)) => features.push(f),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    if let Err(e) = reader.close() {
        warn!(error = %e, "failed to close feature reader");
    }
    result.map(|_| features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironview_catalog::AttributeDescriptor;
    use ironview_common::{Error, LogicalType, Value};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(
            FeatureSchema::new("t", vec![AttributeDescriptor::new("a", LogicalType::Integer)])
                .unwrap(),
        )
    }

    #[test]
    fn test_read_all_closes() {
        let closed = Arc::new(AtomicBool::new(false));
        let flag = closed.clone();
        let s = schema();
        let reader = VecFeatureReader::new(
            s.clone(),
            vec![Feature::new("t.1", s, vec![Value::Integer(1)])],
        )
        .on_close(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let features = read_all(Box::new(reader)).unwrap();
        assert_eq!(features.len(), 1);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_close_failure_is_not_returned() {
        let reader = VecFeatureReader::new(schema(), vec![])
            .on_close(|| Err(Error::Internal("close failed".to_string())));
        assert!(read_all(Box::new(reader)).unwrap().is_empty());
    }
}

//! Catalog exposing a single view

use ironview_common::{Error, Result};
use ironview_storage::{FeatureSource, FeatureStore};
use ironview_transform::{TransformedStore, TransformedView};
use std::sync::Arc;

enum Entry {
    ReadOnly(Arc<TransformedView>),
    Writable(Arc<TransformedStore>),
}

/// A catalog publishing exactly one view under its own name
pub struct SingleSourceCatalog {
    name: String,
    entry: Entry,
}

impl SingleSourceCatalog {
    pub fn read_only(view: TransformedView) -> Self {
        SingleSourceCatalog {
            name: view.name(),
            entry: Entry::ReadOnly(Arc::new(view)),
        }
    }

    pub fn writable(store: TransformedStore) -> Self {
        SingleSourceCatalog {
            name: store.name(),
            entry: Entry::Writable(Arc::new(store)),
        }
    }

    pub fn type_names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.entry, Entry::Writable(_))
    }

    pub fn feature_source(&self, name: &str) -> Result<Arc<dyn FeatureSource>> {
        self.check_name(name)?;
        let source: Arc<dyn FeatureSource> = match &self.entry {
            Entry::ReadOnly(view) => view.clone(),
            Entry::Writable(store) => store.clone(),
        };
        Ok(source)
    }

    /// The view as a writable store; read-only entries refuse
    pub fn feature_store(&self, name: &str) -> Result<Arc<dyn FeatureStore>> {
        self.check_name(name)?;
        match &self.entry {
            Entry::Writable(store) => Ok(store.clone()),
            Entry::ReadOnly(_) => Err(Error::UnsupportedOperation(format!(
                "Feature type {} is read-only",
                name
            ))),
        }
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name == self.name {
            Ok(())
        } else {
            Err(Error::Configuration(format!("Unknown feature type: {}", name)))
        }
    }
}

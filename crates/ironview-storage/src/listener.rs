//! Change notification

/// What happened to the features named in an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureEventKind {
    Added,
    Modified,
    Removed,
}

/// A change to a source's features
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEvent {
    pub kind: FeatureEventKind,
    pub type_name: String,
    pub ids: Vec<String>,
}

/// Receives change events from a source
pub trait FeatureListener: Send + Sync {
    fn changed(&self, event: &FeatureEvent);
}

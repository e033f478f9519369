//! Deck layout as seen by preflight: which labware labels are present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Labware present on the deck, keyed by label.
///
/// Metadata is carried for callers but the core only asks "is this label here?".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckState {
    labware: BTreeMap<String, Value>,
}

impl DeckState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A deck holding the given labels with empty metadata.
    pub fn with_labware<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labware = labels
            .into_iter()
            .map(|label| (label.into(), Value::Object(Default::default())))
            .collect();
        Self { labware }
    }

    pub fn insert(&mut self, label: impl Into<String>, metadata: Value) {
        self.labware.insert(label.into(), metadata);
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labware.contains_key(label)
    }

    pub fn metadata(&self, label: &str) -> Option<&Value> {
        self.labware.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labware.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labware.is_empty()
    }
}

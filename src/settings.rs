//! Tunables of the mapping search.

use std::path::Path;

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::structure::IndexType;

/// Set of index types whose indices can be raised and lowered, as a bitmask over
/// [`IndexType::tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<IndexType>", into = "Vec<IndexType>")]
pub struct MetricTypes(u8);

impl MetricTypes {
    pub fn none() -> Self {
        MetricTypes(0)
    }

    pub fn contains(self, ty: IndexType) -> bool {
        self.0 & (1 << ty.tag()) != 0
    }

    pub fn insert(&mut self, ty: IndexType) {
        self.0 |= 1 << ty.tag();
    }

    pub fn remove(&mut self, ty: IndexType) {
        self.0 &= !(1 << ty.tag());
    }
}

impl Default for MetricTypes {
    fn default() -> Self {
        IndexType::ALL
            .into_iter()
            .filter(|ty| ty.is_metric_by_default())
            .collect()
    }
}

impl FromIterator<IndexType> for MetricTypes {
    fn from_iter<T: IntoIterator<Item = IndexType>>(iter: T) -> Self {
        let mut set = MetricTypes::none();
        for ty in iter {
            set.insert(ty);
        }
        set
    }
}

impl From<Vec<IndexType>> for MetricTypes {
    fn from(value: Vec<IndexType>) -> Self {
        value.into_iter().collect()
    }
}

impl From<MetricTypes> for Vec<IndexType> {
    fn from(value: MetricTypes) -> Self {
        IndexType::ALL
            .into_iter()
            .filter(|ty| value.contains(*ty))
            .collect()
    }
}

/// Search options shared by every provider of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Lets an index of a metric type map onto the opposite polarity.
    pub allow_diff_states: bool,
    pub metric_types: MetricTypes,
    /// Require tensor field arguments to match as well.
    pub compare_field_arguments: bool,
}

impl Default for MappingSettings {
    fn default() -> Self {
        MappingSettings {
            allow_diff_states: true,
            metric_types: MetricTypes::default(),
            compare_field_arguments: true,
        }
    }
}

impl MappingSettings {
    pub fn allows_diff_states(&self, ty: IndexType) -> bool {
        self.allow_diff_states && self.metric_types.contains(ty)
    }

    pub fn strict() -> Self {
        MappingSettings {
            allow_diff_states: false,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let settings: MappingSettings =
            serde_json::from_str(json).context("parsing mapping settings")?;
        debug!("Loaded mapping settings {settings:?}");
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading mapping settings from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{Metric, MetricType};

/// A change applied to a [`Metric`] after it has been constructed.
///
/// Modifiers are passed when adding a metric, or registered for a namespace selector so that they
/// apply to every matching metric of a collection.
#[derive(Clone, Debug, PartialEq)]
pub enum Modifier {
    /// Inserts tags, overwriting existing tags with the same key.
    Tags(BTreeMap<String, String>),
    /// Removes the tags with the given keys.
    RemoveTags(Vec<String>),
    /// Overrides the timestamp.
    Timestamp(DateTime<Utc>),
    /// Overrides the description.
    Description(String),
    /// Overrides the unit.
    Unit(String),
    /// Overrides the metric type.
    Type(MetricType),
}

impl Modifier {
    /// Creates a modifier inserting a single tag.
    pub fn tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Tags(BTreeMap::from([(key.into(), value.into())]))
    }

    /// Creates a modifier removing a single tag.
    pub fn remove_tag(key: impl Into<String>) -> Self {
        Self::RemoveTags(vec![key.into()])
    }

    /// Applies this modifier to `metric`.
    pub fn apply(&self, metric: &mut Metric) {
        match self {
            Self::Tags(tags) => metric
                .tags
                .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone()))),
            Self::RemoveTags(keys) => {
                for key in keys {
                    metric.tags.remove(key);
                }
            }
            Self::Timestamp(timestamp) => metric.timestamp = *timestamp,
            Self::Description(description) => metric.description.clone_from(description),
            Self::Unit(unit) => metric.unit.clone_from(unit),
            Self::Type(ty) => metric.ty = *ty,
        }
    }
}

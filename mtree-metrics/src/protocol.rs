use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Statistical summary of a set of observations.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Summary {
    /// Number of observations.
    pub count: u64,
    /// Sum of all observed values.
    pub sum: f64,
}

/// Bucketed distribution of a set of observations.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Histogram {
    /// Pairs of upper bucket bound and number of observations in that bucket.
    pub data_points: Vec<(f64, f64)>,
    /// Number of observations.
    pub count: u64,
    /// Sum of all observed values.
    pub sum: f64,
}

/// The [typed value](Metric::value) of a metric.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    Uint(u64),
    /// A floating point number.
    Float(f64),
    /// A boolean flag.
    Bool(bool),
    /// A text value.
    String(String),
    /// A precomputed summary. See [`MetricType::Summary`].
    Summary(Summary),
    /// A precomputed histogram. See [`MetricType::Histogram`].
    Histogram(Histogram),
}

impl MetricValue {
    /// Returns the metric type implied by this value.
    ///
    /// Scalars do not imply a type and return [`MetricType::Unknown`].
    pub fn implied_type(&self) -> MetricType {
        match self {
            Self::Summary(_) => MetricType::Summary,
            Self::Histogram(_) => MetricType::Histogram,
            _ => MetricType::Unknown,
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for MetricValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_value! {
    i32 => Int,
    i64 => Int,
    u32 => Uint,
    u64 => Uint,
    f32 => Float,
    f64 => Float,
    bool => Bool,
    &str => String,
    String => String,
    Summary => Summary,
    Histogram => Histogram,
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => value.fmt(f),
            Self::Uint(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
            Self::Bool(value) => value.fmt(f),
            Self::String(value) => value.fmt(f),
            Self::Summary(summary) => write!(f, "count={} sum={}", summary.count, summary.sum),
            Self::Histogram(histogram) => {
                write!(f, "count={} sum={}", histogram.count, histogram.sum)
            }
        }
    }
}

/// The type of a [`Metric`], determining how consumers aggregate it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// No type was set.
    #[default]
    Unknown,
    /// An absolute snapshot of a value.
    Gauge,
    /// A monotonic sum.
    Sum,
    /// A precomputed summary of observations.
    Summary,
    /// A precomputed distribution of observations.
    Histogram,
}

impl MetricType {
    /// Returns the name of this metric type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Gauge => "gauge",
            Self::Sum => "sum",
            Self::Summary => "summary",
            Self::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned when parsing a [`MetricType`] fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseMetricTypeError(());

impl fmt::Display for ParseMetricTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown metric type")
    }
}

impl std::error::Error for ParseMetricTypeError {}

impl std::str::FromStr for MetricType {
    type Err = ParseMetricTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "unknown" => Self::Unknown,
            "gauge" | "g" => Self::Gauge,
            "sum" | "counter" | "c" => Self::Sum,
            "summary" => Self::Summary,
            "histogram" | "h" => Self::Histogram,
            _ => return Err(ParseMetricTypeError(())),
        })
    }
}

/// One element of an emitted metric's namespace.
///
/// For static elements only the value is set. Dynamic elements additionally carry the name of
/// their group and the group's description.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct NamespaceElement {
    /// Name of the dynamic group, empty for static elements.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// The concrete value of the element.
    pub value: String,
    /// Description of the dynamic group, empty for static elements.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl NamespaceElement {
    /// Creates a static element.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    /// Creates a dynamic element bound to the group `name`.
    pub fn dynamic(
        name: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: description.into(),
        }
    }

    /// Returns `true` if the element belongs to a dynamic group.
    pub fn is_dynamic(&self) -> bool {
        !self.name.is_empty()
    }
}

/// The namespace of an emitted metric, such as `/system/cpu/percentage`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MetricNamespace {
    elements: SmallVec<[NamespaceElement; 6]>,
}

impl MetricNamespace {
    /// Returns the element at position `pos`.
    pub fn at(&self, pos: usize) -> Option<&NamespaceElement> {
        self.elements.get(pos)
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the namespace has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns `true` if any element has the given value.
    pub fn has_element(&self, value: &str) -> bool {
        self.elements.iter().any(|e| e.value == value)
    }

    /// Returns `true` if the element at `pos` has the given value.
    pub fn has_element_on(&self, value: &str, pos: usize) -> bool {
        self.at(pos).is_some_and(|e| e.value == value)
    }

    /// Iterates over all elements.
    pub fn iter(&self) -> std::slice::Iter<'_, NamespaceElement> {
        self.elements.iter()
    }

    /// Iterates over the dynamic elements only.
    pub fn dynamic_elements(&self) -> impl Iterator<Item = &NamespaceElement> {
        self.iter().filter(|e| e.is_dynamic())
    }
}

impl From<Vec<NamespaceElement>> for MetricNamespace {
    fn from(elements: Vec<NamespaceElement>) -> Self {
        Self {
            elements: SmallVec::from_vec(elements),
        }
    }
}

impl FromIterator<NamespaceElement> for MetricNamespace {
    fn from_iter<T: IntoIterator<Item = NamespaceElement>>(iter: T) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MetricNamespace {
    type Item = &'a NamespaceElement;
    type IntoIter = std::slice::Iter<'a, NamespaceElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for MetricNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            write!(f, "/{}", element.value)?;
        }
        Ok(())
    }
}

/// A single measurement emitted by a collector.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Metric {
    /// The full namespace including bound dynamic elements.
    pub namespace: MetricNamespace,
    /// The measured value.
    pub value: MetricValue,
    /// Additional key-value pairs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Unit of the value, taken from the metric definition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Human readable description, taken from the metric definition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Time at which the value was measured.
    pub timestamp: DateTime<Utc>,
    /// The type of the metric.
    #[serde(rename = "type", default)]
    pub ty: MetricType,
}

impl Metric {
    /// Creates a metric measured now.
    ///
    /// The type is derived from the value, see [`MetricValue::implied_type`].
    pub fn new(namespace: MetricNamespace, value: impl Into<MetricValue>) -> Self {
        let value = value.into();
        Self {
            namespace,
            ty: value.implied_type(),
            value,
            tags: BTreeMap::new(),
            unit: String::new(),
            description: String::new(),
            timestamp: Utc::now(),
        }
    }
}

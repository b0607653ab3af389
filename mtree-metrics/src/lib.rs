//! Metric records emitted by collectors.
//!
//! A [`Metric`] is produced for every namespace a collector adds that passes both the metric
//! definitions and the task filters. Its [`MetricNamespace`] keeps every element of the namespace
//! together with the dynamic group it was bound to, so consumers can turn dynamic elements into
//! tags.
//!
//! ```
//! use mtree_metrics::{Metric, MetricNamespace, MetricType, Modifier, NamespaceElement};
//!
//! let namespace = MetricNamespace::from(vec![
//!     NamespaceElement::new("kubernetes"),
//!     NamespaceElement::dynamic("pod", "web-1", "name of the pod"),
//!     NamespaceElement::new("cpu"),
//! ]);
//!
//! let mut metric = Metric::new(namespace, 0.25);
//! Modifier::tag("cluster", "eu-1").apply(&mut metric);
//! Modifier::Type(MetricType::Gauge).apply(&mut metric);
//!
//! assert_eq!(metric.namespace.to_string(), "/kubernetes/web-1/cpu");
//! assert_eq!(metric.tags["cluster"], "eu-1");
//! ```
#![warn(missing_docs)]

mod modifier;
mod protocol;

pub use self::modifier::*;
pub use self::protocol::*;

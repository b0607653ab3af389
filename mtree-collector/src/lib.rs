//! Collection of metrics under plugin definitions and task filters.
//!
//! A plugin declares the metrics it can emit as [`Definitions`]. Every task loaded into the
//! plugin requests a subset of them with filter rules. The [`ContextManager`] keeps the loaded
//! tasks together with their configuration and state in a [`TaskContext`], and runs a
//! [`Collector`] for them, handing it a [`CollectContext`] that validates every added metric:
//!
//! 1. The namespace must match a definition, otherwise [`add_metric`] fails.
//! 2. The namespace must match one of the task's filters, otherwise the metric is dropped.
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//!
//! use mtree_collector::{CollectContext, Collector, ContextManager, Definitions, FilterOptions};
//!
//! struct Disks;
//!
//! impl Collector for Disks {
//!     type Error = Infallible;
//!
//!     fn collect(&self, context: &mut CollectContext) -> Result<(), Self::Error> {
//!         for disk in ["sda", "sdb"] {
//!             if context.should_process(&format!("/disks/{disk}")) {
//!                 let _ = context.add_metric(&format!("/disks/{disk}/used"), 1024, &[]);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut definitions = Definitions::default();
//! definitions
//!     .define_metric("/disks/[disk]/used", "bytes", true, "used space")
//!     .unwrap();
//!
//! let manager = ContextManager::new(Disks, definitions, FilterOptions::default());
//! manager
//!     .load_task("task-1", serde_json::Value::Null, ["/disks/sdb/*"])
//!     .unwrap();
//!
//! let collection = manager.collect("task-1").unwrap();
//! assert_eq!(collection.metrics.len(), 1);
//! assert_eq!(collection.metrics[0].namespace.to_string(), "/disks/sdb/used");
//! ```
//!
//! [`add_metric`]: CollectContext::add_metric
#![warn(missing_docs)]

mod context;
mod definition;
mod error;
mod manager;
mod task;

pub use self::context::*;
pub use self::definition::*;
pub use self::error::*;
pub use self::manager::*;
pub use self::task::*;

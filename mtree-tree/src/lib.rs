//! Definition and filter trees for metric namespaces.
//!
//! Both trees are tries keyed by namespace [elements](mtree_pattern::Element). They share the
//! node layout but differ in what they accept and how they match:
//!
//! - The [`DefinitionTree`] holds the metrics a plugin can emit. Rules consist of static literals
//!   and dynamic groups (`[group]`) only, and the tree rejects every rule that would make it
//!   ambiguous whether a level is static or dynamic. Every namespace therefore follows at most
//!   one path, and a successful lookup returns a [`Resolution`] naming the dynamic group bound at
//!   each position.
//! - The [`FilterTree`] holds the metrics a task requests. Rules may use every element kind,
//!   including `*`, regular expressions and a trailing `**`. Rules may overlap freely and a
//!   namespace is admitted if it matches any of them.
//!
//! Both trees are built once and are read-only afterwards, so lookups take `&self` and can run
//! concurrently.
//!
//! # Example
//!
//! ```
//! use mtree_pattern::Namespace;
//! use mtree_tree::{DefinitionTree, FilterTree};
//!
//! let mut definition = DefinitionTree::default();
//! definition.add_rule("/plugin/group1/metric1").unwrap();
//! definition.add_rule("/plugin/group3/[dyn1]/metric4").unwrap();
//!
//! let mut filter = FilterTree::default();
//! filter.add_rule("/plugin/group3/[dyn1=id1]/metric4").unwrap();
//!
//! let ns = Namespace::parse("/plugin/group3/id1/metric4").unwrap();
//! let resolution = definition.is_valid(&ns).unwrap();
//! assert_eq!(resolution.group(2), Some("dyn1"));
//! assert!(filter.is_valid(&ns));
//!
//! let ns = Namespace::parse("/plugin/group3/id2/metric4").unwrap();
//! assert!(definition.is_valid(&ns).is_some());
//! assert!(!filter.is_valid(&ns));
//! ```
#![warn(missing_docs)]

mod definition;
mod error;
mod filter;
mod node;

pub use self::definition::*;
pub use self::error::*;
pub use self::filter::*;

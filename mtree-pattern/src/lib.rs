//! Grammar of hierarchical metric namespaces.
//!
//! A namespace is a separator-delimited path such as `/kubernetes/pod/[node]/cpu`. Every element
//! between two separators is one of the following kinds:
//!
//! | Syntax            | Element                                                     |
//! |-------------------|-------------------------------------------------------------|
//! | `cpu`             | [`Element::StaticLiteral`], matches only itself            |
//! | `*`               | [`Element::StaticWildcard`], matches any single element    |
//! | `{pattern}`       | [`Element::StaticRegex`], matches a regular expression     |
//! | `[group]`         | [`Element::DynamicAny`], any value of a named group        |
//! | `[group=value]`   | [`Element::DynamicSpecific`], one value of a named group   |
//! | `[group={regex}]` | [`Element::DynamicRegex`], values of a group matching regex |
//! | `**`              | [`Element::RecursiveWildcard`], any remaining suffix       |
//!
//! Every element renders back to the exact text it was parsed from, so parsing is lossless:
//!
//! ```
//! use mtree_pattern::Element;
//!
//! let element = Element::parse("[pod={web-[0-9]+}]").unwrap();
//! assert_eq!(element.to_string(), "[pod={web-[0-9]+}]");
//! assert!(element.is_match("web-1"));
//! ```
//!
//! # Namespaces
//!
//! [`Namespace::parse`] splits a string on the separator and parses every element. The recursive
//! wildcard `**` is a filter-only concept and is accepted by [`Namespace::parse_filter`] only.
//!
//! ```
//! use mtree_pattern::Namespace;
//!
//! let filter = Namespace::parse_filter("/kubernetes/node/*/status/**").unwrap();
//! let metric = Namespace::parse("/kubernetes/node/node-1/status/capacity/pods").unwrap();
//!
//! assert!(metric.matches_filter(&filter).unwrap());
//! ```
//!
//! # Direct matching
//!
//! [`match_ns_to_filter`] compares a single namespace with a single filter without building any
//! tree. A filter shorter than the namespace is treated as a prefix.
#![warn(missing_docs)]

mod direct;
mod element;
mod error;
mod namespace;

pub use self::direct::*;
pub use self::element::*;
pub use self::error::*;
pub use self::namespace::*;

/// The default separator between namespace elements.
pub const DEFAULT_SEPARATOR: char = '/';

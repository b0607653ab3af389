//! Configuration for plugins built on the metric tree.
//!
//! The [`Config`] bundles the logging setup, the options of the metric definitions, and the
//! options for loading task filters. It is read from a `config.yml` file in a config directory:
//!
//! ```no_run
//! use std::convert::Infallible;
//!
//! use mtree_collector::{CollectContext, Collector, ContextManager, Definitions};
//! use mtree_config::Config;
//!
//! struct Noop;
//!
//! impl Collector for Noop {
//!     type Error = Infallible;
//!
//!     fn collect(&self, _context: &mut CollectContext) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//!
//! let config = Config::from_path("/etc/plugin").unwrap();
//! mtree_log::init(&config.logging);
//!
//! let definitions = Definitions::new(config.definition.clone());
//! let manager = ContextManager::new(Noop, definitions, config.filters.clone());
//! # let _ = manager;
//! ```
#![warn(missing_docs)]

mod config;

pub use self::config::*;

//! Logging facade for the metric tree.
//!
//! All crates of the workspace log through the macros re-exported here, which are the macros of
//! the [`tracing`] crate. The engine itself never installs a subscriber. Applications call
//! [`init`] once at startup (with the `init` feature), tests call [`init_test!`].
//!
//! # Setup
//!
//! ```
//! # #[cfg(feature = "init")] {
//! use mtree_log::{Level, LogConfig, LogFormat};
//!
//! let config = LogConfig {
//!     level: Level::Debug,
//!     format: LogFormat::Simplified,
//! };
//!
//! mtree_log::init(&config);
//! # }
//! ```
//!
//! The `RUST_LOG` environment variable takes precedence over the configured level.
//!
//! # Logging
//!
//! Use the five logging macros [`error!`], [`warn!`], [`info!`], [`debug!`] and [`trace!`].
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text. Choose the log level according to these rules:
//!
//! - [`error!`] for bugs in plugin code, such as a metric definition that cannot be added.
//! - [`warn!`] for undesirable behavior, such as a filter rule that is skipped.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information, such as every filtered metric.
//!
//! ## Logging Error Types
//!
//! To log errors together with all their causes, use the [`LogError`] wrapper.
//!
//! ```
//! use std::io::{Error, ErrorKind};
//! use mtree_log::LogError;
//!
//! let custom_error = Error::new(ErrorKind::Other, "oh no!");
//! mtree_log::error!("operation failed: {}", LogError(&custom_error));
//! ```
//!
//! # Testing
//!
//! For unit testing, there is a separate initialization macro [`init_test!`] that should be called
//! at the beginning of test method. It enables test mode of the logger and captures all logs of the
//! calling crate.
//!
//! ```
//! #[test]
//! fn test_something() {
//!     mtree_log::init_test!();
//! }
//! ```

#![warn(missing_docs)]

#[cfg(feature = "init")]
mod setup;
#[cfg(feature = "init")]
pub use setup::*;

#[cfg(feature = "test")]
pub use test::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};

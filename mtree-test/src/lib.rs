//! Helpers for testing the metric tree crates.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup!`]. This will set up the logger so that all console output is
//!    captured by the test runner. All logs emitted with [`mtree_log`] by the crate under test
//!    will show up for test failures or when run with `--nocapture`.
//!  - Prefer the shared [`kubernetes`] fixture over ad-hoc definitions when a test needs a
//!    realistic, multi-level definition tree.
//!
//! # Example
//!
//! ```no_run
//! #[test]
//! fn my_test() {
//!     mtree_test::setup!();
//!
//!     mtree_log::debug!("hello, world!");
//! }
//! ```

pub mod kubernetes;

#[doc(hidden)]
pub use mtree_log as __log;

/// Setup the test environment.
///
///  - Initializes logs: The logger captures all logs of the calling crate and mutes all other
///    logs.
#[macro_export]
macro_rules! setup {
    () => {
        $crate::__log::init_test!();
    };
}

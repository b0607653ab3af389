use mtree_pattern::ParseError;
use thiserror::Error;

/// An error returned when adding a rule to a [`DefinitionTree`](crate::DefinitionTree).
///
/// The tree is unchanged when a rule is rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// The rule is not a valid namespace.
    #[error("invalid metric definition '{rule}'")]
    Parse {
        /// The rule as passed by the caller.
        rule: String,
        /// The reason parsing failed.
        #[source]
        source: ParseError,
    },

    /// The rule is a valid namespace, but contains elements not allowed in definitions.
    #[error("metric definition '{rule}' is not usable: {reason}")]
    Unusable {
        /// The rule as passed by the caller.
        rule: String,
        /// What makes the rule unusable.
        reason: &'static str,
    },

    /// Adding the rule would make the tree ambiguous.
    #[error("metric definition '{rule}' is ambiguous at element {position}: {reason}")]
    Ambiguous {
        /// The rule as passed by the caller.
        rule: String,
        /// Position of the conflicting element.
        position: usize,
        /// The kind of conflict.
        reason: &'static str,
    },

    /// The rule has been defined before.
    #[error("metric definition '{rule}' is already defined")]
    Duplicate {
        /// The rule as passed by the caller.
        rule: String,
    },
}

/// An error returned when adding a rule to a [`FilterTree`](crate::FilterTree).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The rule is not a valid filter.
    #[error("invalid filter '{rule}'")]
    Parse {
        /// The rule as passed by the caller.
        rule: String,
        /// The reason parsing failed.
        #[source]
        source: ParseError,
    },

    /// The rule is a valid filter, but cannot be used to filter metrics.
    #[error("filter '{rule}' is not usable: {reason}")]
    Unusable {
        /// The rule as passed by the caller.
        rule: String,
        /// What makes the rule unusable.
        reason: &'static str,
    },

    /// The rule cannot match any metric of the definition tree.
    #[error("filter '{rule}' does not match any defined metric")]
    NoMatchingDefinition {
        /// The rule as passed by the caller.
        rule: String,
    },
}

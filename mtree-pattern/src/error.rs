use thiserror::Error;

/// An error returned when parsing a namespace or one of its elements fails.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The namespace does not contain any element.
    #[error("namespace is empty")]
    Empty,

    /// The namespace does not start with the separator.
    #[error("namespace must start with '{0}'")]
    MissingRoot(char),

    /// Two separators follow each other, or the namespace ends with a separator.
    #[error("empty element at position {0}")]
    EmptyElement(usize),

    /// An element opens a bracket or brace without closing it (or the other way around).
    #[error("unbalanced brackets in element '{0}'")]
    UnbalancedBrackets(String),

    /// An element contains characters that are not allowed.
    #[error("invalid element '{0}'")]
    InvalidElement(String),

    /// The regular expression of an element does not compile.
    #[error("invalid pattern in element '{element}': {reason}")]
    InvalidPattern {
        /// The element as written in the namespace.
        element: String,
        /// Compiler message of the regular expression engine.
        reason: String,
    },

    /// The recursive wildcard `**` was used outside of a filter.
    #[error("recursive wildcard '**' is only allowed in filters")]
    RecursiveWildcardNotAllowed,

    /// The recursive wildcard `**` is followed by more elements.
    #[error("recursive wildcard '**' must be the last element")]
    RecursiveWildcardNotLast,
}

/// An error returned by [`match_ns_to_filter`](crate::match_ns_to_filter).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    /// The namespace could not be parsed.
    #[error("invalid namespace")]
    Namespace(#[source] ParseError),

    /// The namespace does not refer to concrete metrics.
    ///
    /// See [`Namespace::is_concrete`](crate::Namespace::is_concrete).
    #[error("invalid format of the namespace '{0}'")]
    NotConcrete(String),

    /// The filter could not be parsed.
    #[error("invalid filter")]
    Filter(#[source] ParseError),

    /// The filter requires more elements than the namespace has.
    #[error("too few elements in namespace: filter needs {filter}, namespace has {namespace}")]
    TooFewElementsInNamespace {
        /// Number of elements in the namespace.
        namespace: usize,
        /// Number of elements the filter needs at least.
        filter: usize,
    },
}

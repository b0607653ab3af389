use crate::{DEFAULT_SEPARATOR, MatchError, Namespace};

/// Matches a namespace against a single filter without building a filter tree.
///
/// This is the matcher used for ad-hoc selectors, for example when deciding which metrics a
/// modifier applies to. The filter is interpreted as a prefix: `/kubernetes` matches every
/// namespace below `/kubernetes`. An empty filter, or one that consists of the separator only,
/// matches everything.
///
/// The namespace must be [concrete](Namespace::is_concrete), with `*` allowed after the first
/// element. Patterns and unbound groups in the namespace are rejected with
/// [`MatchError::NotConcrete`].
///
/// ```
/// use mtree_pattern::match_ns_to_filter;
///
/// assert!(match_ns_to_filter("/kubernetes/[pod=io1453]/cpu", "/kubernetes").unwrap());
/// assert!(!match_ns_to_filter("/kubernetes/[pod=io1453]/cpu", "/kubernetes/[node]").unwrap());
/// ```
pub fn match_ns_to_filter(namespace: &str, filter: &str) -> Result<bool, MatchError> {
    match_ns_to_filter_with_separator(namespace, filter, DEFAULT_SEPARATOR)
}

/// Like [`match_ns_to_filter`], with a custom separator.
pub fn match_ns_to_filter_with_separator(
    namespace: &str,
    filter: &str,
    separator: char,
) -> Result<bool, MatchError> {
    let parsed = Namespace::builder(namespace)
        .separator(separator)
        .parse()
        .map_err(MatchError::Namespace)?;

    if !parsed.is_concrete(true) {
        return Err(MatchError::NotConcrete(namespace.to_owned()));
    }

    if filter.is_empty() || filter.chars().eq(std::iter::once(separator)) {
        return Ok(true);
    }

    let filter = Namespace::builder(filter)
        .separator(separator)
        .filter(true)
        .parse()
        .map_err(MatchError::Filter)?;

    parsed.matches_filter(&filter)
}

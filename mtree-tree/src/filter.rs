use mtree_pattern::{DEFAULT_SEPARATOR, Element, Namespace};

use crate::node::Branches;
use crate::{DefinitionTree, FilterError};

/// The tree of metrics requested by a task.
///
/// A namespace is admitted if it matches any of the rules. At every level the literal child with
/// the candidate's value is tried first, then all other children in the order their rules were
/// added. Matching backtracks, so a failed literal branch does not hide a matching pattern.
///
/// A tree without rules admits every namespace.
///
/// ```
/// use mtree_pattern::Namespace;
/// use mtree_tree::FilterTree;
///
/// let mut filter = FilterTree::default();
/// filter.add_rule("/plugin/group4/**").unwrap();
/// filter.add_rule("/plugin/group5").unwrap();
///
/// assert!(filter.is_valid(&Namespace::parse("/plugin/group4/m1/m2").unwrap()));
/// assert!(!filter.is_valid(&Namespace::parse("/plugin/group5/m1").unwrap()));
/// ```
#[derive(Clone, Debug)]
pub struct FilterTree {
    separator: char,
    root: Branches,
}

impl FilterTree {
    /// Creates an empty tree with the default separator.
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_SEPARATOR)
    }

    /// Creates an empty tree with a custom separator.
    pub fn with_separator(separator: char) -> Self {
        Self {
            separator,
            root: Branches::default(),
        }
    }

    /// Returns `true` if at least one rule has been added.
    pub fn has_rules(&self) -> bool {
        !self.root.is_empty()
    }

    /// Adds a filter rule.
    ///
    /// Adding a rule twice has no effect.
    pub fn add_rule(&mut self, rule: &str) -> Result<(), FilterError> {
        let filter = self.parse_rule(rule)?;
        self.insert(rule, &filter);
        Ok(())
    }

    /// Adds a filter rule after checking that it can match a metric of `definition`.
    ///
    /// Such a rule has at least two elements and starts with a static name. Without definitions,
    /// dynamic elements are rejected since there are no groups they could refer to. See
    /// [`DefinitionTree::is_filter_compatible`] for the check against the definitions.
    pub fn add_compatible_rule(
        &mut self,
        rule: &str,
        definition: &DefinitionTree,
    ) -> Result<(), FilterError> {
        let filter = self.parse_rule(rule)?;

        if let Err(reason) = check_usable(&filter, definition.has_rules()) {
            return Err(FilterError::Unusable {
                rule: rule.to_owned(),
                reason,
            });
        }

        if !definition.is_filter_compatible(&filter) {
            return Err(FilterError::NoMatchingDefinition {
                rule: rule.to_owned(),
            });
        }

        self.insert(rule, &filter);
        Ok(())
    }

    fn parse_rule(&self, rule: &str) -> Result<Namespace, FilterError> {
        Namespace::builder(rule)
            .separator(self.separator)
            .filter(true)
            .parse()
            .map_err(|source| FilterError::Parse {
                rule: rule.to_owned(),
                source,
            })
    }

    fn insert(&mut self, rule: &str, filter: &Namespace) {
        if self.root.insert(filter.elements()) {
            mtree_log::trace!(rule, "filter added");
        } else {
            mtree_log::debug!(rule, "duplicate filter ignored");
        }
    }

    /// Returns `true` if the namespace matches at least one rule completely.
    ///
    /// A trailing `**` in a rule matches any number of remaining elements, including none.
    /// Without it, the rule and the namespace must have the same number of elements.
    pub fn is_valid(&self, namespace: &Namespace) -> bool {
        !self.has_rules() || matches(&self.root, false, namespace, false)
    }

    /// Returns `true` if the namespace is a prefix of a namespace matching at least one rule.
    ///
    /// The namespace may contain `*` to stand for any element at that position.
    pub fn is_partially_valid(&self, namespace: &Namespace) -> bool {
        !self.has_rules() || matches(&self.root, false, namespace, true)
    }

    /// Returns all rules, sorted.
    pub fn list_rules(&self) -> Vec<String> {
        self.root.rules(self.separator)
    }
}

impl Default for FilterTree {
    fn default() -> Self {
        Self::new()
    }
}

fn check_usable(filter: &Namespace, has_definitions: bool) -> Result<(), &'static str> {
    if filter.len() < 2 {
        return Err("at least two elements required");
    }

    if !matches!(filter[0], Element::StaticLiteral(_)) {
        return Err("first element must be a static name");
    }

    if !has_definitions && filter.iter().any(Element::is_dynamic) {
        return Err("dynamic elements require metric definitions");
    }

    Ok(())
}

/// Matches the remaining candidate elements against `branches`.
///
/// `terminal` tells whether a rule ends at the node owning `branches`.
fn matches(branches: &Branches, terminal: bool, rest: &[Element], partial: bool) -> bool {
    let Some((candidate, tail)) = rest.split_first() else {
        return partial || terminal || branches.has_recursive_wildcard();
    };

    let descend = |node: &crate::node::Node| {
        node.element == Element::RecursiveWildcard
            || matches(&node.children, node.terminal, tail, partial)
    };

    if *candidate == Element::StaticWildcard {
        return branches.iter().any(descend);
    }

    let literal = candidate.value().and_then(|value| branches.literal(value));
    if literal.is_some_and(descend) {
        return true;
    }

    branches
        .patterns()
        .iter()
        .any(|node| node.element.matches(candidate) && descend(node))
}

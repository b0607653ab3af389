use mtree_pattern::{DEFAULT_SEPARATOR, Element, Namespace};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::DefinitionError;
use crate::node::{Branches, Node, NodeKind};

/// Switches controlling which metrics a [`DefinitionTree`] accepts.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DefinitionOptions {
    /// Separator between namespace elements.
    pub separator: char,

    /// Allows the last element of a definition to be dynamic.
    ///
    /// This enables list-like metrics such as `/plugin/disks/[disk]`.
    pub allow_dynamic_last_element: bool,

    /// Accepts metrics that match no definition, as long as their first element matches the
    /// first element of a definition.
    pub allow_adding_undefined_metrics: bool,

    /// Accepts metrics that end on any level of a definition, not only on its last element.
    ///
    /// This also allows definitions that are prefixes of other definitions.
    pub allow_values_at_any_level: bool,
}

impl Default for DefinitionOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            allow_dynamic_last_element: false,
            allow_adding_undefined_metrics: false,
            allow_values_at_any_level: false,
        }
    }
}

/// The dynamic groups bound by a namespace that passed [`DefinitionTree::is_valid`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution<'a> {
    groups: SmallVec<[Option<&'a str>; 8]>,
}

impl<'a> Resolution<'a> {
    fn unbound(len: usize) -> Self {
        Self {
            groups: SmallVec::from_elem(None, len),
        }
    }

    /// Returns the group bound at `position`, or `None` for static positions.
    pub fn group(&self, position: usize) -> Option<&'a str> {
        self.groups.get(position).copied().flatten()
    }

    /// Returns the groups of all positions.
    pub fn groups(&self) -> &[Option<&'a str>] {
        &self.groups
    }

    /// Returns `true` if no position is bound to a group.
    pub fn is_static(&self) -> bool {
        self.groups.iter().all(Option::is_none)
    }

    /// Renders the definition that `namespace` resolved to.
    ///
    /// Dynamic positions are rendered as `[group]`, static positions with their value, so
    /// `/plugin/[dyn1=id1]/metric` and `/plugin/id1/metric` both render as `/plugin/[dyn1]/metric`.
    pub fn definition_key(&self, namespace: &Namespace) -> String {
        let mut key = String::new();

        for (element, group) in namespace.iter().zip(&self.groups) {
            key.push(namespace.separator());
            match group {
                Some(group) => {
                    key.push('[');
                    key.push_str(group);
                    key.push(']');
                }
                None => key.push_str(element.value().unwrap_or_default()),
            }
        }

        key
    }
}

/// The tree of metrics a plugin can emit.
///
/// Rules are added once during plugin startup with [`add_rule`](Self::add_rule) and the tree is
/// read-only afterwards. A tree without rules accepts every namespace.
///
/// # Ambiguity
///
/// Every level below a node is either static or dynamic, never both, and all dynamic elements
/// below one node belong to the same group. A rule violating this is rejected:
///
/// ```
/// use mtree_tree::{DefinitionError, DefinitionTree};
///
/// let mut tree = DefinitionTree::default();
/// tree.add_rule("/plugin/group1/metric1").unwrap();
///
/// let result = tree.add_rule("/plugin/[dyn3]/metric6");
/// assert!(matches!(result, Err(DefinitionError::Ambiguous { position: 1, .. })));
///
/// tree.add_rule("/plugin/group6/metric1").unwrap();
/// ```
#[derive(Clone, Debug, Default)]
pub struct DefinitionTree {
    options: DefinitionOptions,
    root: Branches,
}

impl DefinitionTree {
    /// Creates an empty tree.
    pub fn new(options: DefinitionOptions) -> Self {
        Self {
            options,
            root: Branches::default(),
        }
    }

    /// Returns the options of this tree.
    pub fn options(&self) -> &DefinitionOptions {
        &self.options
    }

    /// Replaces the options of this tree.
    ///
    /// Options affect both rule validation and lookups. Set them before adding rules.
    pub fn set_options(&mut self, options: DefinitionOptions) {
        self.options = options;
    }

    /// Returns `true` if at least one rule has been added.
    pub fn has_rules(&self) -> bool {
        !self.root.is_empty()
    }

    /// Parses `raw` with the separator of this tree.
    pub fn parse(&self, raw: &str) -> Result<Namespace, mtree_pattern::ParseError> {
        Namespace::builder(raw)
            .separator(self.options.separator)
            .parse()
    }

    /// Adds a metric definition.
    ///
    /// The rule must have at least two elements, and consist of static literals and dynamic groups
    /// (`[group]`) only. On error, the tree is left unchanged.
    pub fn add_rule(&mut self, rule: &str) -> Result<(), DefinitionError> {
        let namespace = self.parse(rule).map_err(|source| DefinitionError::Parse {
            rule: rule.to_owned(),
            source,
        })?;

        self.check_usable(rule, &namespace)?;
        self.check_conflicts(rule, &namespace)?;

        self.root.insert(namespace.elements());
        mtree_log::trace!(rule, "metric definition added");
        Ok(())
    }

    fn check_usable(&self, rule: &str, namespace: &Namespace) -> Result<(), DefinitionError> {
        let unusable = |reason| DefinitionError::Unusable {
            rule: rule.to_owned(),
            reason,
        };

        if namespace.len() < 2 {
            return Err(unusable("at least two elements are required"));
        }

        if !matches!(namespace[0], Element::StaticLiteral(_)) {
            return Err(unusable("the first element must be static"));
        }

        let valid_elements = namespace
            .iter()
            .all(|e| matches!(e, Element::StaticLiteral(_) | Element::DynamicAny(_)));
        if !valid_elements {
            return Err(unusable("only names and unbound groups are allowed"));
        }

        let last_dynamic = namespace.last().is_some_and(Element::is_dynamic);
        if last_dynamic && !self.options.allow_dynamic_last_element {
            return Err(unusable("the last element must be static"));
        }

        Ok(())
    }

    /// Walks the existing path of the rule and checks that attaching the rest keeps the tree
    /// unambiguous.
    fn check_conflicts(&self, rule: &str, namespace: &Namespace) -> Result<(), DefinitionError> {
        let any_level = self.options.allow_values_at_any_level;
        let last = namespace.len() - 1;
        let mut branches = &self.root;

        for (position, element) in namespace.iter().enumerate() {
            let ambiguous = |reason| DefinitionError::Ambiguous {
                rule: rule.to_owned(),
                position,
                reason,
            };

            match (branches.kind(), element) {
                (NodeKind::Dynamic, Element::StaticLiteral(_)) => {
                    return Err(ambiguous("static element next to dynamic elements"));
                }
                (NodeKind::Static, Element::DynamicAny(_)) => {
                    return Err(ambiguous("dynamic element next to static elements"));
                }
                (NodeKind::Dynamic, Element::DynamicAny(group)) => {
                    let other_group = branches
                        .patterns()
                        .iter()
                        .any(|node| node.element.group() != Some(group.as_str()));
                    if other_group {
                        return Err(ambiguous("different dynamic groups at the same level"));
                    }
                }
                _ => (),
            }

            let Some(node) = branches.get(element) else {
                return Ok(());
            };

            if position == last {
                if node.terminal {
                    return Err(DefinitionError::Duplicate {
                        rule: rule.to_owned(),
                    });
                }
                if !any_level {
                    return Err(ambiguous("metric is a prefix of a defined metric"));
                }
            } else if node.terminal && !any_level {
                return Err(ambiguous("metric extends a defined metric"));
            }

            branches = &node.children;
        }

        Ok(())
    }

    /// Looks up a namespace of a metric.
    ///
    /// The namespace may contain static literals and bound dynamic elements (`[group=value]`). A
    /// literal at a dynamic position binds to that position's group. A bound element must name the
    /// group defined at its position.
    ///
    /// Returns the [`Resolution`] of the namespace, or `None` if it matches no definition. A tree
    /// without rules resolves every namespace without binding any group.
    pub fn is_valid(&self, namespace: &Namespace) -> Option<Resolution<'_>> {
        if !self.has_rules() {
            return Some(Resolution::unbound(namespace.len()));
        }

        match self.resolve(namespace) {
            Some(resolution) => Some(resolution),
            None if self.accepts_undefined(namespace) => {
                Some(Resolution::unbound(namespace.len()))
            }
            None => None,
        }
    }

    fn resolve(&self, namespace: &Namespace) -> Option<Resolution<'_>> {
        let mut groups = SmallVec::new();
        let mut branches = &self.root;
        let mut terminal = false;

        for candidate in namespace.iter() {
            let node = find(branches, candidate)?;
            groups.push(node.element.group());
            terminal = node.terminal;
            branches = &node.children;
        }

        (terminal || self.options.allow_values_at_any_level).then_some(Resolution { groups })
    }

    fn accepts_undefined(&self, namespace: &Namespace) -> bool {
        self.options.allow_adding_undefined_metrics
            && namespace
                .first()
                .is_some_and(|first| find(&self.root, first).is_some())
    }

    /// Returns `true` if the namespace is a prefix of at least one definition.
    ///
    /// In addition to the elements accepted by [`is_valid`](Self::is_valid), the namespace may
    /// contain `*` to stand for any element at that position.
    pub fn is_partially_valid(&self, namespace: &Namespace) -> bool {
        !self.has_rules() || self.accepts_undefined(namespace) || is_prefix(&self.root, namespace)
    }

    /// Returns `true` if the filter can match at least one definition, or a prefix of one.
    ///
    /// Dynamic filter elements must name the group defined at their position. Static filter
    /// elements match static definitions by value and accept any value at dynamic positions.
    pub fn is_filter_compatible(&self, filter: &Namespace) -> bool {
        if !self.has_rules() {
            return true;
        }

        if self.options.allow_adding_undefined_metrics {
            return overlaps_any(&self.root, &filter[..1]);
        }

        overlaps_any(&self.root, filter)
    }

    /// Returns all definitions, sorted.
    pub fn list_rules(&self) -> Vec<String> {
        self.root.rules(self.options.separator)
    }
}

/// Returns the child a concrete namespace element follows.
fn find<'a>(branches: &'a Branches, candidate: &Element) -> Option<&'a Node> {
    match candidate {
        Element::StaticLiteral(name) => branches
            .literal(name)
            .or_else(|| branches.patterns().iter().find(|n| n.element.matches(candidate))),
        Element::DynamicSpecific { .. } => branches
            .patterns()
            .iter()
            .find(|n| n.element.matches(candidate)),
        _ => None,
    }
}

fn is_prefix(branches: &Branches, rest: &[Element]) -> bool {
    let Some((candidate, tail)) = rest.split_first() else {
        return true;
    };

    if *candidate == Element::StaticWildcard {
        return branches.iter().any(|node| is_prefix(&node.children, tail));
    }

    find(branches, candidate).is_some_and(|node| is_prefix(&node.children, tail))
}

fn overlaps_any(branches: &Branches, rest: &[Element]) -> bool {
    let Some((pattern, tail)) = rest.split_first() else {
        return true;
    };

    if *pattern == Element::RecursiveWildcard {
        return true;
    }

    branches
        .iter()
        .any(|node| overlaps(pattern, &node.element) && overlaps_any(&node.children, tail))
}

/// Returns `true` if a filter element can match some value of a defined element.
fn overlaps(pattern: &Element, defined: &Element) -> bool {
    match defined {
        Element::DynamicAny(group) => pattern.group().is_none_or(|g| g == group.as_str()),
        _ => !pattern.is_dynamic() && pattern.matches(defined),
    }
}

use hashbrown::HashMap;
use mtree_pattern::Element;

/// Classification of a node by its children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum NodeKind {
    /// The node has no children.
    Leaf,
    /// All children are static literals.
    Static,
    /// All children are patterns: dynamic elements, wildcards or regular expressions.
    Dynamic,
    /// Literal and pattern children side by side. Only filter trees contain such nodes.
    Mixed,
}

/// The children of a node, or the top level of a tree.
///
/// Static literals are kept in a map for exact lookups. All other elements are kept in insertion
/// order, which is the order in which they are tried when no literal matches.
#[derive(Clone, Debug, Default)]
pub(crate) struct Branches {
    literals: HashMap<String, Node>,
    patterns: Vec<Node>,
}

/// A vertex of a definition or filter tree.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub element: Element,
    /// A rule ends at this node.
    pub terminal: bool,
    pub children: Branches,
}

impl Node {
    fn new(element: Element) -> Self {
        Self {
            element,
            terminal: false,
            children: Branches::default(),
        }
    }
}

impl Branches {
    pub fn kind(&self) -> NodeKind {
        match (self.literals.is_empty(), self.patterns.is_empty()) {
            (true, true) => NodeKind::Leaf,
            (false, true) => NodeKind::Static,
            (true, false) => NodeKind::Dynamic,
            (false, false) => NodeKind::Mixed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind() == NodeKind::Leaf
    }

    pub fn patterns(&self) -> &[Node] {
        &self.patterns
    }

    /// Iterates over all children, literals first.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.literals.values().chain(&self.patterns)
    }

    /// Returns the child holding exactly `element`.
    pub fn get(&self, element: &Element) -> Option<&Node> {
        match element {
            Element::StaticLiteral(name) => self.literals.get(name.as_str()),
            _ => self.patterns.iter().find(|node| node.element == *element),
        }
    }

    /// Returns the literal child named `value`.
    pub fn literal(&self, value: &str) -> Option<&Node> {
        self.literals.get(value)
    }

    /// Returns `true` if one of the pattern children is `**`.
    pub fn has_recursive_wildcard(&self) -> bool {
        self.patterns
            .iter()
            .any(|node| node.element == Element::RecursiveWildcard)
    }

    /// Inserts the path of `elements` below these branches and marks its end as terminal.
    ///
    /// Existing nodes along the path are reused. Returns `false` if the path was terminal already.
    pub fn insert(&mut self, elements: &[Element]) -> bool {
        let Some((element, rest)) = elements.split_first() else {
            return false;
        };

        let child = self.child_mut(element);
        if rest.is_empty() {
            !std::mem::replace(&mut child.terminal, true)
        } else {
            child.children.insert(rest)
        }
    }

    fn child_mut(&mut self, element: &Element) -> &mut Node {
        if let Element::StaticLiteral(name) = element {
            return self
                .literals
                .entry(name.clone())
                .or_insert_with(|| Node::new(element.clone()));
        }

        let index = match self.patterns.iter().position(|n| n.element == *element) {
            Some(index) => index,
            None => {
                self.patterns.push(Node::new(element.clone()));
                self.patterns.len() - 1
            }
        };

        &mut self.patterns[index]
    }

    /// Renders the paths of all terminal nodes, sorted.
    pub fn rules(&self, separator: char) -> Vec<String> {
        let mut rules = Vec::new();
        self.collect_rules(separator, &mut String::new(), &mut rules);
        rules.sort();
        rules
    }

    fn collect_rules(&self, separator: char, prefix: &mut String, rules: &mut Vec<String>) {
        for node in self.iter() {
            let len = prefix.len();
            prefix.push(separator);
            prefix.push_str(&node.element.to_string());

            if node.terminal {
                rules.push(prefix.clone());
            }

            node.children.collect_rules(separator, prefix, rules);
            prefix.truncate(len);
        }
    }
}

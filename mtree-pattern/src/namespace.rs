use std::fmt;
use std::ops::Deref;

use smallvec::SmallVec;

use crate::{DEFAULT_SEPARATOR, Element, MatchError, ParseError};

/// Elements of typical namespaces fit inline without allocating.
type Elements = SmallVec<[Element; 8]>;

/// A parsed metric namespace.
///
/// The namespace dereferences to a slice of its [`Element`]s. The leading separator (the root) is
/// not an element, so `/system/cpu` has two elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    separator: char,
    elements: Elements,
}

impl Namespace {
    /// Parses a metric namespace with the default separator.
    ///
    /// The recursive wildcard `**` is rejected. Use [`parse_filter`](Self::parse_filter) for
    /// filter rules.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        Self::builder(raw).parse()
    }

    /// Parses a filter rule with the default separator.
    ///
    /// In addition to all other elements, a trailing `**` is accepted.
    pub fn parse_filter(raw: &str) -> Result<Self, ParseError> {
        Self::builder(raw).filter(true).parse()
    }

    /// Returns a builder to configure parsing of `raw`.
    ///
    /// ```
    /// use mtree_pattern::Namespace;
    ///
    /// let ns = Namespace::builder(".system.cpu").separator('.').parse().unwrap();
    /// assert_eq!(ns.len(), 2);
    /// assert_eq!(ns.to_string(), ".system.cpu");
    /// ```
    pub fn builder(raw: &str) -> NamespaceBuilder<'_> {
        NamespaceBuilder {
            raw,
            separator: DEFAULT_SEPARATOR,
            filter: false,
        }
    }

    /// Returns the separator this namespace was parsed with.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Returns the elements of the namespace.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Returns `true` if the last element is the recursive wildcard `**`.
    pub fn is_recursive(&self) -> bool {
        self.elements.last() == Some(&Element::RecursiveWildcard)
    }

    /// Returns `true` if the namespace refers to concrete metrics.
    ///
    /// A concrete namespace has at least two elements, starts with a static name, and otherwise
    /// contains only static names and bound dynamic elements (`[group=value]`). With `allow_any`,
    /// `*` is accepted after the first element to stand for any value at that position.
    pub fn is_concrete(&self, allow_any: bool) -> bool {
        let Some((first, rest)) = self.elements.split_first() else {
            return false;
        };

        if rest.is_empty() || !matches!(first, Element::StaticLiteral(_)) {
            return false;
        }

        rest.iter().all(|element| match element {
            Element::StaticLiteral(_) | Element::DynamicSpecific { .. } => true,
            Element::StaticWildcard => allow_any,
            _ => false,
        })
    }

    /// Matches this namespace against a single filter.
    ///
    /// Elements are compared position by position using [`Element::matches`], stopping at the first
    /// mismatch. A filter with fewer elements than the namespace matches as a prefix, and a
    /// trailing `**` matches any remainder, including none.
    ///
    /// Returns [`MatchError::TooFewElementsInNamespace`] if the filter requires more elements than
    /// this namespace has.
    pub fn matches_filter(&self, filter: &Namespace) -> Result<bool, MatchError> {
        let required = filter.len() - usize::from(filter.is_recursive());
        if required > self.len() {
            return Err(MatchError::TooFewElementsInNamespace {
                namespace: self.len(),
                filter: required,
            });
        }

        for (pattern, candidate) in filter.iter().zip(self.iter()) {
            if *pattern == Element::RecursiveWildcard {
                break;
            }

            if !pattern.matches(candidate) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl Deref for Namespace {
    type Target = [Element];

    fn deref(&self) -> &Self::Target {
        &self.elements
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            write!(f, "{}{element}", self.separator)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Namespace {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Namespace {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <std::borrow::Cow<'_, str>>::deserialize(deserializer)?;
        Self::parse_filter(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Namespace {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Configures how a [`Namespace`] is parsed.
///
/// Created by [`Namespace::builder`].
#[derive(Debug)]
pub struct NamespaceBuilder<'a> {
    raw: &'a str,
    separator: char,
    filter: bool,
}

impl NamespaceBuilder<'_> {
    /// Sets the separator between elements. Defaults to `/`.
    ///
    /// Brackets and braces cannot be used as separators.
    pub fn separator(&mut self, separator: char) -> &mut Self {
        self.separator = separator;
        self
    }

    /// Parses in filter context, which allows a trailing `**`.
    pub fn filter(&mut self, filter: bool) -> &mut Self {
        self.filter = filter;
        self
    }

    /// Parses the namespace.
    pub fn parse(&self) -> Result<Namespace, ParseError> {
        let rest = match self.raw.strip_prefix(self.separator) {
            Some(rest) => rest,
            None if self.raw.is_empty() => return Err(ParseError::Empty),
            None => return Err(ParseError::MissingRoot(self.separator)),
        };

        if rest.is_empty() {
            return Err(ParseError::Empty);
        }

        let tokens = split_tokens(rest, self.separator)?;
        let last = tokens.len() - 1;
        let mut elements = Elements::with_capacity(tokens.len());

        for (position, token) in tokens.into_iter().enumerate() {
            if token.is_empty() {
                return Err(ParseError::EmptyElement(position));
            }

            let element = Element::parse(token)?;
            if element == Element::RecursiveWildcard {
                if !self.filter {
                    return Err(ParseError::RecursiveWildcardNotAllowed);
                }
                if position != last {
                    return Err(ParseError::RecursiveWildcardNotLast);
                }
            }

            elements.push(element);
        }

        Ok(Namespace {
            separator: self.separator,
            elements,
        })
    }
}

/// Splits the namespace (without root) into element tokens.
///
/// Separators nested in `[...]` or `{...}` do not split, so a regular expression is never cut in
/// half.
fn split_tokens(raw: &str, separator: char) -> Result<SmallVec<[&str; 8]>, ParseError> {
    let mut tokens = SmallVec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, c) in raw.char_indices() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                tokens.push(&raw[start..index]);
                start = index + c.len_utf8();
            }
            _ => (),
        }
    }

    if depth > 0 {
        return Err(ParseError::UnbalancedBrackets(raw[start..].to_owned()));
    }

    tokens.push(&raw[start..]);
    Ok(tokens)
}

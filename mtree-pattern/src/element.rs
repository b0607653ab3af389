use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use crate::ParseError;

/// A compiled regular expression of a `{...}` element.
///
/// The expression is anchored on both ends, so it always has to match the whole element. It is
/// compiled once when the element is parsed and kept alongside its source text, which is used for
/// rendering and comparison.
#[derive(Clone, Debug)]
pub struct ElementPattern {
    raw: String,
    regex: Regex,
}

impl ElementPattern {
    /// Compiles a new pattern from the text between the braces.
    pub fn new(raw: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{raw})$"))?;
        Ok(Self {
            raw: raw.to_owned(),
            regex,
        })
    }

    /// Returns the source of the pattern without braces.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if the whole `value` matches the pattern.
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for ElementPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ElementPattern {}

impl Hash for ElementPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for ElementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One element of a [`Namespace`](crate::Namespace).
///
/// See the [crate documentation](crate) for the syntax of every variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Element {
    /// A plain name that only matches itself, such as `cpu`.
    StaticLiteral(String),
    /// `*`, matches any single element.
    StaticWildcard,
    /// `{pattern}`, matches elements that satisfy the regular expression.
    StaticRegex(ElementPattern),
    /// `[group]`, a dynamic element that accepts any value of the group.
    DynamicAny(String),
    /// `[group=value]`, a dynamic element bound to a concrete value.
    DynamicSpecific {
        /// Name of the dynamic group.
        group: String,
        /// The bound value.
        value: String,
    },
    /// `[group={pattern}]`, a dynamic element whose value must satisfy a regular expression.
    DynamicRegex {
        /// Name of the dynamic group.
        group: String,
        /// The constraint on the value.
        pattern: ElementPattern,
    },
    /// `**`, matches any number of trailing elements, including none.
    RecursiveWildcard,
}

impl Element {
    /// Parses a single element.
    ///
    /// The token must not contain the namespace separator. `**` is parsed into
    /// [`Element::RecursiveWildcard`] regardless of context; whether it is allowed is decided when
    /// parsing the whole namespace.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        match token {
            "" => return Err(ParseError::InvalidElement(String::new())),
            "*" => return Ok(Self::StaticWildcard),
            "**" => return Ok(Self::RecursiveWildcard),
            _ => (),
        }

        if let Some(inner) = strip_enclosing(token, '[', ']')? {
            return parse_dynamic(token, inner);
        }

        if let Some(inner) = strip_enclosing(token, '{', '}')? {
            return compile(token, inner).map(Self::StaticRegex);
        }

        if is_valid_identifier(token) {
            Ok(Self::StaticLiteral(token.to_owned()))
        } else {
            Err(ParseError::InvalidElement(token.to_owned()))
        }
    }

    /// Returns `true` for the `[...]` variants.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            Self::DynamicAny(_) | Self::DynamicSpecific { .. } | Self::DynamicRegex { .. }
        )
    }

    /// Returns `true` for the wildcards `*` and `**`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::StaticWildcard | Self::RecursiveWildcard)
    }

    /// Returns the group name of dynamic elements.
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::DynamicAny(group)
            | Self::DynamicSpecific { group, .. }
            | Self::DynamicRegex { group, .. } => Some(group.as_str()),
            _ => None,
        }
    }

    /// Returns the concrete value carried by the element.
    ///
    /// Only static literals and bound dynamic elements carry a value.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::StaticLiteral(value) | Self::DynamicSpecific { value, .. } => {
                Some(value.as_str())
            }
            _ => None,
        }
    }

    /// Returns `true` if `candidate` can be matched by this element.
    ///
    /// The candidate is usually a concrete element of a metric namespace: a static literal such
    /// as `web-1`, or a bound dynamic element such as `[pod=web-1]`. Static patterns only look at
    /// the candidate's value, dynamic patterns additionally require the candidate's group (if it
    /// has one) to be the same.
    ///
    /// Candidates that do not carry a concrete value, such as `*` or `[pod]`, stand for "some
    /// value" and match every value constraint.
    pub fn matches(&self, candidate: &Element) -> bool {
        if candidate.is_wildcard() {
            return true;
        }

        let value = candidate.value();
        let same_group = |group: &str| candidate.group().is_none_or(|g| g == group);

        match self {
            Self::StaticLiteral(name) => value.is_none_or(|v| v == name.as_str()),
            Self::StaticWildcard | Self::RecursiveWildcard => true,
            Self::StaticRegex(pattern) => value.is_none_or(|v| pattern.is_match(v)),
            Self::DynamicAny(group) => same_group(group),
            Self::DynamicSpecific {
                group,
                value: expected,
            } => same_group(group) && value.is_none_or(|v| v == expected.as_str()),
            Self::DynamicRegex { group, pattern } => {
                same_group(group) && value.is_none_or(|v| pattern.is_match(v))
            }
        }
    }

    /// Parses `token` and checks it with [`matches`](Self::matches).
    ///
    /// Returns `false` if the token is not a valid element.
    pub fn is_match(&self, token: &str) -> bool {
        Self::parse(token).is_ok_and(|candidate| self.matches(&candidate))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticLiteral(name) => f.write_str(name),
            Self::StaticWildcard => f.write_str("*"),
            Self::StaticRegex(pattern) => write!(f, "{{{pattern}}}"),
            Self::DynamicAny(group) => write!(f, "[{group}]"),
            Self::DynamicSpecific { group, value } => write!(f, "[{group}={value}]"),
            Self::DynamicRegex { group, pattern } => write!(f, "[{group}={{{pattern}}}]"),
            Self::RecursiveWildcard => f.write_str("**"),
        }
    }
}

impl std::str::FromStr for Element {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Element {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let token = <std::borrow::Cow<'_, str>>::deserialize(deserializer)?;
        Self::parse(&token).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Element {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Validates the name of a static element, a group, or a bound value.
///
/// Names cannot be empty and consist of ASCII alphanumerics, underscores, dashes and periods.
pub(crate) fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

/// Returns the text between `open` and `close` if the token is wrapped in them.
fn strip_enclosing(token: &str, open: char, close: char) -> Result<Option<&str>, ParseError> {
    match (token.strip_prefix(open), token.ends_with(close)) {
        (Some(rest), true) if !rest.is_empty() => {
            Ok(Some(&rest[..rest.len() - close.len_utf8()]))
        }
        (None, false) => Ok(None),
        _ => Err(ParseError::UnbalancedBrackets(token.to_owned())),
    }
}

fn compile(token: &str, raw: &str) -> Result<ElementPattern, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::InvalidElement(token.to_owned()));
    }

    ElementPattern::new(raw).map_err(|error| ParseError::InvalidPattern {
        element: token.to_owned(),
        reason: error.to_string(),
    })
}

fn parse_dynamic(token: &str, inner: &str) -> Result<Element, ParseError> {
    let invalid = || ParseError::InvalidElement(token.to_owned());

    let Some((group, value)) = inner.split_once('=') else {
        return match is_valid_identifier(inner) {
            true => Ok(Element::DynamicAny(inner.to_owned())),
            false => Err(invalid()),
        };
    };

    if !is_valid_identifier(group) {
        return Err(invalid());
    }

    if let Some(pattern) = strip_enclosing(value, '{', '}')? {
        return Ok(Element::DynamicRegex {
            group: group.to_owned(),
            pattern: compile(token, pattern)?,
        });
    }

    if !is_valid_identifier(value) {
        return Err(invalid());
    }

    Ok(Element::DynamicSpecific {
        group: group.to_owned(),
        value: value.to_owned(),
    })
}

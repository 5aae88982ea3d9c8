//! Datatype conditions
//!
//! Conditions are a closed set. Parsing a condition string either yields one
//! of these variants or fails; there is no fallthrough at validation time.

use regex::Regex;
use std::sync::OnceLock;

/// Patterns accepted by `match(/.../)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// `\w+`
    Word,

    /// `\d+`
    Digits,

    /// `[ACDEFGHIKLMNPQRSTVWXY]+`
    AminoAcids,
}

impl Pattern {
    fn from_source(source: &str) -> Option<Self> {
        match source {
            r"\w+" => Some(Self::Word),
            r"\d+" => Some(Self::Digits),
            "[ACDEFGHIKLMNPQRSTVWXY]+" => Some(Self::AminoAcids),
            _ => None,
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::Word => r"\w+",
            Self::Digits => r"\d+",
            Self::AminoAcids => "[ACDEFGHIKLMNPQRSTVWXY]+",
        }
    }

    /// Anchored regex for a full-string match
    fn regex(self) -> &'static Regex {
        static WORD: OnceLock<Regex> = OnceLock::new();
        static DIGITS: OnceLock<Regex> = OnceLock::new();
        static AMINO: OnceLock<Regex> = OnceLock::new();

        let cell = match self {
            Self::Word => &WORD,
            Self::Digits => &DIGITS,
            Self::AminoAcids => &AMINO,
        };
        cell.get_or_init(|| {
            Regex::new(&format!("^(?:{})$", self.source())).expect("fixed pattern is valid")
        })
    }
}

/// What an `exclude(/.../)` condition forbids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exclusion {
    /// `\n`
    Newline,

    /// `\s`
    Whitespace,

    /// `^\s+|\s+$`
    SurroundingWhitespace,
}

/// A named predicate over a raw text value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// `equals('...')`
    Equals(String),

    /// `exclude(/.../)`
    Exclude(Exclusion),

    /// `in('a', 'b', ...)`
    In(Vec<String>),

    /// `match(/.../)` - the whole value must match
    Match(Pattern),

    /// `search(/.../)` - literal substring search
    Search(String),
}

impl Condition {
    /// Parse a condition string from the datatype table
    ///
    /// Returns `None` for anything outside the supported set.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let open = text.find('(')?;
        let inner = text.strip_suffix(')')?.get(open + 1..)?;
        let name = &text[..open];

        match name {
            "equals" => {
                let mut values = parse_quoted_list(inner)?;
                if values.len() != 1 {
                    return None;
                }
                values.pop().map(Self::Equals)
            }
            "in" => {
                let values = parse_quoted_list(inner)?;
                if values.is_empty() {
                    return None;
                }
                Some(Self::In(values))
            }
            "exclude" => match slashed(inner)? {
                r"\n" => Some(Self::Exclude(Exclusion::Newline)),
                r"\s" => Some(Self::Exclude(Exclusion::Whitespace)),
                r"^\s+|\s+$" => Some(Self::Exclude(Exclusion::SurroundingWhitespace)),
                _ => None,
            },
            "match" => Pattern::from_source(slashed(inner)?).map(Self::Match),
            "search" => {
                let literal = slashed(inner)?;
                let has_meta = literal.chars().any(|c| r"\.+*?()|[]{}^$".contains(c));
                if literal.is_empty() || has_meta {
                    return None;
                }
                Some(Self::Search(literal.to_string()))
            }
            _ => None,
        }
    }

    /// True when the value satisfies the condition
    pub fn holds(&self, value: &str) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::Exclude(Exclusion::Newline) => !value.contains('\n'),
            Self::Exclude(Exclusion::Whitespace) => !value.chars().any(char::is_whitespace),
            Self::Exclude(Exclusion::SurroundingWhitespace) => value.trim() == value,
            Self::In(allowed) => allowed.iter().any(|a| a == value),
            Self::Match(pattern) => pattern.regex().is_match(value),
            Self::Search(needle) => value.contains(needle.as_str()),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equals(v) => write!(f, "equals('{}')", v),
            Self::Exclude(Exclusion::Newline) => write!(f, r"exclude(/\n/)"),
            Self::Exclude(Exclusion::Whitespace) => write!(f, r"exclude(/\s/)"),
            Self::Exclude(Exclusion::SurroundingWhitespace) => write!(f, r"exclude(/^\s+|\s+$/)"),
            Self::In(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "in({})", quoted.join(", "))
            }
            Self::Match(p) => write!(f, "match(/{}/)", p.source()),
            Self::Search(s) => write!(f, "search(/{}/)", s),
        }
    }
}

/// `/body/` -> `body`
fn slashed(inner: &str) -> Option<&str> {
    inner.trim().strip_prefix('/')?.strip_suffix('/')
}

/// `'a', 'b'` -> `["a", "b"]`; `''` -> `[""]`
fn parse_quoted_list(inner: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();
    let mut rest = inner.trim();
    while !rest.is_empty() {
        let body = rest.strip_prefix('\'')?;
        let end = body.find('\'')?;
        values.push(body[..end].to_string());
        rest = body[end + 1..].trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
            if rest.is_empty() {
                return None;
            }
        } else if !rest.is_empty() {
            return None;
        }
    }
    Some(values)
}

//! Defines the Scope type and parsing/formatting according to the rfc.
use std::{fmt, str};

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// The set of scope-tokens held by an access token or attached to a role.
///
/// This is the grant side of a scope check. A resource describes what it requires with a
/// [`ScopeExpr`], a holder of a `Scope` satisfies a single literal of that expression iff the
/// literal is one of its tokens.
///
/// The textual form is the one of an OAuth token response: scope-tokens separated by spaces.
///
/// Example
/// ------
///
/// ```
/// # use oxide_auth_scope::primitives::scope::Scope;
/// let granted = "read write".parse::<Scope>().unwrap();
///
/// assert!(granted.contains("read"));
/// assert!(!granted.contains("manage_users"));
/// ```
///
/// Scope-tokens are restricted to the following subset of ascii:
///   - The character '!'
///   - The character range '\x23' to '\x5b' which includes numbers and upper case letters
///   - The character range '\x5d' to '\x7e' which includes lower case letters
///
/// In particular, the characters '\x22' (`"`) and '\x5c' (`\`)  are not allowed.
///
/// [`ScopeExpr`]: ../expression/struct.ScopeExpr.html
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Scope {
    tokens: BTreeSet<String>,
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string: String = Deserialize::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

impl Scope {
    /// Whether `ch` may appear inside a single scope-token.
    pub fn is_token_char(ch: char) -> bool {
        match ch {
            '\x21' => true,
            ch if ('\x23'..='\x5b').contains(&ch) => true,
            ch if ('\x5d'..='\x7e').contains(&ch) => true,
            _ => false,
        }
    }

    /// A scope without any tokens.
    pub fn empty() -> Self {
        Scope::default()
    }

    /// Determine if the token `name` is part of this scope.
    pub fn contains(&self, name: &str) -> bool {
        self.tokens.contains(name)
    }

    /// Add a single token.
    ///
    /// Fails if the token is empty or contains a character not allowed in scope-tokens.
    pub fn insert(&mut self, token: &str) -> Result<(), ParseScopeErr> {
        if token.is_empty() {
            return Err(ParseScopeErr::EmptyToken);
        }

        if let Some(ch) = token.chars().find(|&ch| !Scope::is_token_char(ch)) {
            return Err(ParseScopeErr::InvalidCharacter(ch));
        }

        self.tokens.insert(token.to_string());
        Ok(())
    }

    /// All tokens found in either `self` or `other`.
    pub fn union(&self, other: &Scope) -> Scope {
        Scope {
            tokens: self.tokens.union(&other.tokens).cloned().collect(),
        }
    }

    /// Create an iterator over the individual scopes.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(AsRef::as_ref)
    }

    /// The number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if no token is granted at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Error returned from parsing a scope as encoded in an authorization token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseScopeErr {
    /// A character was encountered which is not allowed to appear in scope strings.
    ///
    /// See [`Scope`] for the allowed subset of ascii.
    ///
    /// [`Scope`]: struct.Scope.html
    InvalidCharacter(char),

    /// A single token was requested to be inserted but it was empty.
    EmptyToken,
}

impl str::FromStr for Scope {
    type Err = ParseScopeErr;

    fn from_str(string: &str) -> Result<Scope, ParseScopeErr> {
        let mut scope = Scope::empty();
        for token in string.split(' ').filter(|s| !s.is_empty()) {
            scope.insert(token)?;
        }
        Ok(scope)
    }
}

impl fmt::Display for ParseScopeErr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            ParseScopeErr::InvalidCharacter(chr) => {
                write!(fmt, "Encountered invalid character in scope: {}", chr)
            }
            ParseScopeErr::EmptyToken => fmt.write_str("Encountered an empty scope token"),
        }
    }
}

impl std::error::Error for ParseScopeErr {}

impl fmt::Debug for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Scope").field(&self.tokens).finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let output = self
            .tokens
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        fmt.write_str(&output)
    }
}

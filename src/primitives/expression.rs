//! Boolean requirements over scope names, such as `read|write` or `(a&b)|c`.
//!
//! A resource does not always need a fixed set of scopes. The requirement attached to it is a
//! small formula combining scope literals with `&` (and), `|` (or) and parentheses. There is no
//! precedence between the two operators, a flat chain is combined strictly from left to right so
//! that `a&b|c` means `(a&b)|c` while `a|b&c` means `(a|b)&c`. Only parentheses group.
//!
//! The grammar, with no whitespace permitted anywhere:
//!
//! ```text
//! expr     := operand (operator operand)*
//! operand  := literal | '(' expr ')'
//! operator := '&' | '|'
//! literal  := one or more characters excluding '(', ')', '&', '|', ' '
//! ```
//!
//! Evaluating a parsed expression is the job of the [`evaluator`].
//!
//! [`evaluator`]: ../evaluator/index.html
use std::{error, fmt, mem, str};

use log::debug;
use serde::{Deserialize, Serialize};

use super::evaluator::{self, ScopeOracle};

/// Combines the operands on both of its sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Written as `&`, both sides must hold.
    And,

    /// Written as `|`, one of the sides must hold.
    Or,
}

/// One entry of a parsed scope expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    /// A single literal scope name.
    Scope(String),

    /// Marker between two operands.
    Operator(Operator),

    /// A parenthesized sub-expression.
    Group(ScopeExpr),
}

/// A parsed scope requirement.
///
/// Operands and operators strictly alternate, the first and the last element are operands. An
/// empty expression requires nothing and is satisfied by anyone.
///
/// ```
/// # use oxide_auth_scope::primitives::expression::{Element, Operator, ScopeExpr};
/// let expr = ScopeExpr::parse("(a&b)|c").unwrap();
///
/// assert_eq!(expr.elements().len(), 3);
/// assert_eq!(expr.elements()[1], Element::Operator(Operator::Or));
/// assert!(expr.evaluate(&|scope: &str| scope == "c"));
/// assert!(!expr.evaluate(&|scope: &str| scope == "a"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeExpr {
    elements: Vec<Element>,
}

/// The requirement string does not follow the scope expression grammar.
///
/// This indicates a misconfigured resource rather than an unauthorized client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedScopeExpression {
    raw: String,
    reason: Malformation,
}

/// The specific grammar violation of a `MalformedScopeExpression`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Malformation {
    /// The string contained a space character.
    ContainsSpace,

    /// Parentheses were not properly nested.
    UnbalancedParentheses,

    /// An operator appeared at the start, at the end, after another operator or right before a
    /// closing parenthesis.
    MisplacedOperator,

    /// Two operands were not separated by an operator, for example `a(b)`.
    MissingOperator,

    /// A pair of parentheses enclosed nothing.
    EmptyGroup,
}

impl Operator {
    /// The character representing the operator in a requirement string.
    pub fn as_char(self) -> char {
        match self {
            Operator::And => '&',
            Operator::Or => '|',
        }
    }

    /// Combine two already evaluated operands.
    pub fn apply(self, lhs: bool, rhs: bool) -> bool {
        match self {
            Operator::And => lhs && rhs,
            Operator::Or => lhs || rhs,
        }
    }
}

impl Element {
    fn is_operator(&self) -> bool {
        match self {
            Element::Operator(_) => true,
            _ => false,
        }
    }
}

impl ScopeExpr {
    /// The expression without any requirement.
    pub fn empty() -> Self {
        ScopeExpr::default()
    }

    /// Parse a requirement string.
    ///
    /// An empty string yields the empty expression. A single redundant pair of parentheses
    /// around the whole string is removed before anything else, based only on the first and
    /// the last character.
    ///
    /// As a consequence a string that starts with one group and ends with another, such as
    /// `(a&b)|(c&d)`, loses its first opening and last closing parenthesis and is rejected as
    /// unbalanced. Wrap it once more, `((a&b)|(c&d))`, or start or end it with a plain literal.
    ///
    /// ```
    /// # use oxide_auth_scope::primitives::expression::{Malformation, ScopeExpr};
    /// let err = ScopeExpr::parse("(a&b)|(c&d)").unwrap_err();
    /// assert_eq!(err.reason(), Malformation::UnbalancedParentheses);
    /// assert!(ScopeExpr::parse("((a&b)|(c&d))").is_ok());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, MalformedScopeExpression> {
        let expr = Parser::new(raw).parse()?;
        debug!("Parsed scope requirement `{}` into {} elements", raw, expr.elements.len());
        Ok(expr)
    }

    /// Parse an optional requirement, treating `None` like the empty string.
    pub fn parse_optional(raw: Option<&str>) -> Result<Self, MalformedScopeExpression> {
        match raw {
            Some(raw) => ScopeExpr::parse(raw),
            None => Ok(ScopeExpr::empty()),
        }
    }

    /// The top level elements, in order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Whether this expression requires nothing.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All scope literals, including those of nested groups, in order of appearance.
    ///
    /// Repeated literals are repeated here as well.
    pub fn literals(&self) -> Vec<&str> {
        let mut literals = Vec::new();
        self.collect_literals(&mut literals);
        literals
    }

    fn collect_literals<'a>(&'a self, into: &mut Vec<&'a str>) {
        for element in &self.elements {
            match element {
                Element::Scope(name) => into.push(name),
                Element::Group(nested) => nested.collect_literals(into),
                Element::Operator(_) => (),
            }
        }
    }

    /// Evaluate the expression against the scopes some principal holds.
    ///
    /// Shorthand for [`evaluator::evaluate`].
    ///
    /// [`evaluator::evaluate`]: ../evaluator/fn.evaluate.html
    pub fn evaluate<O: ScopeOracle + ?Sized>(&self, oracle: &O) -> bool {
        evaluator::evaluate(self, oracle)
    }
}

impl MalformedScopeExpression {
    /// The requirement string as it was given to the parser.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// What exactly is wrong with it.
    pub fn reason(&self) -> Malformation {
        self.reason
    }
}

/// Single left-to-right scan that nests through an explicit stack of accumulators.
struct Parser<'s> {
    raw: &'s str,
    input: &'s str,
    current: Vec<Element>,
    stack: Vec<Vec<Element>>,
    literal_start: Option<usize>,
}

impl<'s> Parser<'s> {
    fn new(raw: &'s str) -> Self {
        Parser {
            raw,
            input: raw,
            current: Vec::new(),
            stack: Vec::new(),
            literal_start: None,
        }
    }

    fn parse(mut self) -> Result<ScopeExpr, MalformedScopeExpression> {
        if self.raw.is_empty() {
            return Ok(ScopeExpr::empty());
        }

        if self.raw.contains(' ') {
            return Err(self.malformed(Malformation::ContainsSpace));
        }

        if self.raw.len() >= 2 && self.raw.starts_with('(') && self.raw.ends_with(')') {
            self.input = &self.raw[1..self.raw.len() - 1];
            if self.input.is_empty() {
                return Err(self.malformed(Malformation::EmptyGroup));
            }
        }

        let input = self.input;
        for (position, ch) in input.char_indices() {
            match ch {
                '(' => self.open(position)?,
                ')' => self.close(position)?,
                '&' => self.operator(position, Operator::And)?,
                '|' => self.operator(position, Operator::Or)?,
                _ => {
                    if self.literal_start.is_none() {
                        self.literal_start = Some(position);
                    }
                }
            }
        }

        if !self.stack.is_empty() {
            return Err(self.malformed(Malformation::UnbalancedParentheses));
        }

        self.flush(input.len())?;

        if self.ends_with_operator() {
            return Err(self.malformed(Malformation::MisplacedOperator));
        }

        Ok(ScopeExpr {
            elements: self.current,
        })
    }

    fn open(&mut self, position: usize) -> Result<(), MalformedScopeExpression> {
        self.flush(position)?;
        if self.ends_with_operand() {
            return Err(self.malformed(Malformation::MissingOperator));
        }

        let outer = mem::take(&mut self.current);
        self.stack.push(outer);
        Ok(())
    }

    fn close(&mut self, position: usize) -> Result<(), MalformedScopeExpression> {
        self.flush(position)?;
        let mut outer = match self.stack.pop() {
            Some(outer) => outer,
            None => return Err(self.malformed(Malformation::UnbalancedParentheses)),
        };

        if self.current.is_empty() {
            return Err(self.malformed(Malformation::EmptyGroup));
        }

        if self.ends_with_operator() {
            return Err(self.malformed(Malformation::MisplacedOperator));
        }

        let group = mem::take(&mut self.current);
        outer.push(Element::Group(ScopeExpr { elements: group }));
        self.current = outer;
        Ok(())
    }

    fn operator(&mut self, position: usize, operator: Operator) -> Result<(), MalformedScopeExpression> {
        self.flush(position)?;
        if !self.ends_with_operand() {
            return Err(self.malformed(Malformation::MisplacedOperator));
        }

        self.current.push(Element::Operator(operator));
        Ok(())
    }

    /// Move a pending literal, ending right before `position`, into the current level.
    fn flush(&mut self, position: usize) -> Result<(), MalformedScopeExpression> {
        let start = match self.literal_start.take() {
            Some(start) => start,
            None => return Ok(()),
        };

        if self.ends_with_operand() {
            return Err(self.malformed(Malformation::MissingOperator));
        }

        let literal = &self.input[start..position];
        self.current.push(Element::Scope(literal.to_string()));
        Ok(())
    }

    fn ends_with_operand(&self) -> bool {
        self.current.last().map_or(false, |last| !last.is_operator())
    }

    fn ends_with_operator(&self) -> bool {
        self.current.last().map_or(false, Element::is_operator)
    }

    fn malformed(&self, reason: Malformation) -> MalformedScopeExpression {
        MalformedScopeExpression {
            raw: self.raw.to_string(),
            reason,
        }
    }
}

impl str::FromStr for ScopeExpr {
    type Err = MalformedScopeExpression;

    fn from_str(string: &str) -> Result<ScopeExpr, MalformedScopeExpression> {
        ScopeExpr::parse(string)
    }
}

impl Serialize for ScopeExpr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScopeExpr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string: String = Deserialize::deserialize(deserializer)?;
        ScopeExpr::parse(&string).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.as_char())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Element::Scope(name) => fmt.write_str(name),
            Element::Operator(operator) => fmt::Display::fmt(operator, fmt),
            Element::Group(nested) => write!(fmt, "({})", nested),
        }
    }
}

impl fmt::Display for ScopeExpr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for element in &self.elements {
            fmt::Display::fmt(element, fmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Malformation {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let description = match self {
            Malformation::ContainsSpace => "spaces are not allowed",
            Malformation::UnbalancedParentheses => "unbalanced parentheses",
            Malformation::MisplacedOperator => "operator without operand",
            Malformation::MissingOperator => "operands without operator between them",
            Malformation::EmptyGroup => "empty parentheses",
        };
        fmt.write_str(description)
    }
}

impl fmt::Display for MalformedScopeExpression {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Malformed scope expression `{}`: {}", self.raw, self.reason)
    }
}

impl error::Error for MalformedScopeExpression {}

//! Reduces a parsed scope expression to a single allow or deny.
//!
//! The evaluator knows nothing about tokens, users or roles. It asks a [`ScopeOracle`] whether
//! a single scope is held and folds the answers from left to right: the running result starts out
//! as `true`, every operand is combined into it with the operator preceding that operand. This
//! gives `a&b|c` the meaning `(a&b)|c` and `a|b&c` the meaning `(a|b)&c`.
//!
//! The oracle is asked exactly once per literal in the expression, repeated literals included,
//! and there is no short-circuiting.
//!
//! [`ScopeOracle`]: trait.ScopeOracle.html
use std::convert::Infallible;

use super::expression::{Element, ScopeExpr};
use super::scope::Scope;

/// Answers whether the current principal holds a single scope.
pub trait ScopeOracle {
    /// Determine if the scope named `scope` is held.
    fn has_scope(&self, scope: &str) -> bool;
}

impl<F> ScopeOracle for F
where
    F: Fn(&str) -> bool,
{
    fn has_scope(&self, scope: &str) -> bool {
        self(scope)
    }
}

impl ScopeOracle for Scope {
    fn has_scope(&self, scope: &str) -> bool {
        self.contains(scope)
    }
}

/// Evaluate `expr` with an infallible oracle.
///
/// The empty expression evaluates to `true`.
///
/// ```
/// # use oxide_auth_scope::primitives::evaluator::evaluate;
/// # use oxide_auth_scope::primitives::expression::ScopeExpr;
/// # use oxide_auth_scope::primitives::scope::Scope;
/// let granted: Scope = "a c".parse().unwrap();
/// let expr = ScopeExpr::parse("a&b|c").unwrap();
///
/// // No precedence, this is `(a&b)|c`.
/// assert!(evaluate(&expr, &granted));
/// ```
pub fn evaluate<O: ScopeOracle + ?Sized>(expr: &ScopeExpr, oracle: &O) -> bool {
    let answer = try_evaluate(expr, &mut |scope: &str| Ok::<_, Infallible>(oracle.has_scope(scope)));
    match answer {
        Ok(valid) => valid,
        Err(never) => match never {},
    }
}

/// Evaluate `expr` with an oracle that may fail.
///
/// The first error returned by the oracle aborts the evaluation and is returned as is.
pub fn try_evaluate<E, F>(expr: &ScopeExpr, oracle: &mut F) -> Result<bool, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    let mut valid = true;
    let mut operator = None;

    for element in expr.elements() {
        let result = match element {
            Element::Operator(next) => {
                operator = Some(*next);
                continue;
            }
            Element::Scope(scope) => oracle(scope.as_str())?,
            Element::Group(nested) => try_evaluate(nested, oracle)?,
        };

        valid = match operator {
            Some(operator) => operator.apply(valid, result),
            None => result,
        };
    }

    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    fn holds(granted: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |scope: &str| granted.iter().any(|held| *held == scope)
    }

    fn eval(raw: &str, granted: &'static [&'static str]) -> bool {
        let expr = ScopeExpr::parse(raw).unwrap();
        evaluate(&expr, &holds(granted))
    }

    #[test]
    fn empty_is_vacuously_true() {
        assert!(eval("", &[]));
        assert!(eval("", &["a"]));
    }

    #[test]
    fn single_literal() {
        assert!(eval("a", &["a"]));
        assert!(!eval("a", &["b"]));
    }

    #[test]
    fn binary_operators() {
        let assignments: [(bool, bool); 4] = [(false, false), (false, true), (true, false), (true, true)];
        for &(x, y) in assignments.iter() {
            let oracle = |scope: &str| match scope {
                "a" => x,
                "b" => y,
                _ => false,
            };
            let and = ScopeExpr::parse("a&b").unwrap();
            let or = ScopeExpr::parse("a|b").unwrap();
            assert_eq!(evaluate(&and, &oracle), x && y, "a&b with a={} b={}", x, y);
            assert_eq!(evaluate(&or, &oracle), x || y, "a|b with a={} b={}", x, y);
        }
    }

    #[test]
    fn left_to_right_without_precedence() {
        // a&b is false but c rescues it.
        assert!(eval("a&b|c", &["a", "c"]));
        // With precedence this would be a|(b&c) and hold.
        assert!(!eval("a|b&c", &["a"]));
        assert!(eval("a|b&c", &["a", "c"]));

        for bits in 0..8u8 {
            let (a, b, c) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let oracle = |scope: &str| match scope {
                "a" => a,
                "b" => b,
                "c" => c,
                _ => false,
            };
            let expr = ScopeExpr::parse("a&b|c").unwrap();
            assert_eq!(evaluate(&expr, &oracle), (a && b) || c);
            let expr = ScopeExpr::parse("a&(b|c)").unwrap();
            assert_eq!(evaluate(&expr, &oracle), a && (b || c));
        }
    }

    #[test]
    fn nested_groups() {
        assert!(eval("x|(a&(b|c))", &["a", "c"]));
        assert!(!eval("x|(a&(b|c))", &["b", "c"]));
        assert!(eval("((a))", &["a"]));
    }

    #[test]
    fn granted_scope_as_oracle() {
        let granted: Scope = "read write".parse().unwrap();
        let expr = ScopeExpr::parse("read&(write|admin)").unwrap();
        assert!(expr.evaluate(&granted));
        let expr = ScopeExpr::parse("read&admin").unwrap();
        assert!(!expr.evaluate(&granted));
    }

    #[test]
    fn oracle_queried_once_per_literal() {
        let asked = RefCell::new(Vec::new());
        let oracle = |scope: &str| {
            asked.borrow_mut().push(scope.to_string());
            false
        };
        let expr = ScopeExpr::parse("a&a|(b&a)").unwrap();
        assert!(!evaluate(&expr, &oracle));
        assert_eq!(*asked.borrow(), vec!["a", "a", "b", "a"]);
    }

    #[test]
    fn oracle_error_is_propagated() {
        #[derive(Debug, PartialEq)]
        struct Unavailable(String);

        let expr = ScopeExpr::parse("a|b|c").unwrap();
        let mut calls = 0;
        let result = try_evaluate(&expr, &mut |scope: &str| {
            calls += 1;
            if scope == "b" {
                Err(Unavailable(scope.to_string()))
            } else {
                Ok(false)
            }
        });
        assert_eq!(result, Err(Unavailable("b".to_string())));
        assert_eq!(calls, 2);
    }
}

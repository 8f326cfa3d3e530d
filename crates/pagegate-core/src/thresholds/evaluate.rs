//! Pass/fail classification of one aggregated value against one rule.
//!
//! A rule fails when its comparison does NOT hold: `gte 1000` means the
//! value must be at least 1000 to pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Comparison operator of a threshold rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Gte => "gte",
            Comparison::Lte => "lte",
            Comparison::Gt => "gt",
            Comparison::Lt => "lt",
            Comparison::Eq => "eq",
        }
    }

    /// Operator sign used in human-readable rule descriptions.
    pub fn sign(&self) -> &'static str {
        match self {
            Comparison::Gte => ">=",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Eq => "==",
        }
    }

    /// Whether `actual <op> expected` holds.
    pub fn holds(&self, actual: f64, expected: f64) -> bool {
        match self {
            Comparison::Gte => actual >= expected,
            Comparison::Lte => actual <= expected,
            Comparison::Gt => actual > expected,
            Comparison::Lt => actual < expected,
            Comparison::Eq => actual == expected,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gte" => Ok(Comparison::Gte),
            "lte" => Ok(Comparison::Lte),
            "gt" => Ok(Comparison::Gt),
            "lt" => Ok(Comparison::Lt),
            "eq" => Ok(Comparison::Eq),
            other => Err(EngineError::UnsupportedComparison {
                name: other.to_string(),
            }),
        }
    }
}

/// True when `actual` violates the rule `comparison expected`.
pub fn is_failed(actual: f64, comparison: Comparison, expected: f64) -> bool {
    !comparison.holds(actual, expected)
}

/// Like [`is_failed`], resolving the operator by name.
///
/// An unknown operator is an error, never a silent pass.
pub fn is_failed_named(actual: f64, comparison: &str, expected: f64) -> Result<bool, EngineError> {
    Ok(is_failed(actual, comparison.parse()?, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn gte_fails_below_expected() {
        assert!(is_failed(999.0, Comparison::Gte, 1000.0));
        assert!(!is_failed(1000.0, Comparison::Gte, 1000.0));
    }

    #[test]
    fn lte_fails_above_expected() {
        assert!(is_failed(1001.0, Comparison::Lte, 1000.0));
        assert!(!is_failed(1000.0, Comparison::Lte, 1000.0));
    }

    #[test]
    fn strict_operators_fail_on_equality() {
        assert!(is_failed(5.0, Comparison::Gt, 5.0));
        assert!(is_failed(5.0, Comparison::Lt, 5.0));
        assert!(!is_failed(5.0, Comparison::Eq, 5.0));
        assert!(is_failed(5.0, Comparison::Eq, 6.0));
    }

    #[test]
    fn unknown_operator_is_an_error() {
        assert_eq!(
            is_failed_named(1.0, "between", 2.0),
            Err(EngineError::UnsupportedComparison {
                name: "between".into()
            })
        );
        assert_eq!(is_failed_named(1.0, "lt", 2.0), Ok(false));
    }

    #[test]
    fn signs() {
        assert_eq!(Comparison::Gte.sign(), ">=");
        assert_eq!(Comparison::Eq.sign(), "==");
    }

    proptest! {
        #[test]
        fn failed_is_negation_of_relation(actual in -1e6f64..1e6, expected in -1e6f64..1e6) {
            prop_assert_eq!(is_failed(actual, Comparison::Gte, expected), !(actual >= expected));
            prop_assert_eq!(is_failed(actual, Comparison::Lte, expected), !(actual <= expected));
            prop_assert_eq!(is_failed(actual, Comparison::Gt, expected), !(actual > expected));
            prop_assert_eq!(is_failed(actual, Comparison::Lt, expected), !(actual < expected));
            prop_assert_eq!(is_failed(actual, Comparison::Eq, expected), actual != expected);
        }
    }
}

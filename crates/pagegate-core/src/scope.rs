//! Matching of threshold rules to result sets.
//!
//! For each page, `every` rules come first, then the rules scoped to that
//! page's identifier. `all` rules are handed out once, for the pooled pass
//! after the last page.

use crate::thresholds::{Scope, ThresholdRule};

/// Rules split into their three scope classes, source order preserved.
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    all: Vec<ThresholdRule>,
    every: Vec<ThresholdRule>,
    page: Vec<ThresholdRule>,
}

impl ScopeResolver {
    pub fn new(rules: Vec<ThresholdRule>) -> Self {
        let mut resolver = Self::default();
        for rule in rules {
            match rule.scope {
                Scope::All => resolver.all.push(rule),
                Scope::Every => resolver.every.push(rule),
                Scope::Page(_) => resolver.page.push(rule),
            }
        }
        resolver
    }

    /// Rules evaluated against one page, in evaluation order.
    pub fn for_page<'a>(
        &'a self,
        identifier: &'a str,
    ) -> impl Iterator<Item = &'a ThresholdRule> + 'a {
        self.every.iter().chain(
            self.page
                .iter()
                .filter(move |r| r.scope.matches_page(identifier)),
        )
    }

    /// Rules evaluated once against the pooled samples.
    pub fn pooled(&self) -> &[ThresholdRule] {
        &self.all
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.every.is_empty() && self.page.is_empty()
    }

    pub fn len(&self) -> usize {
        self.all.len() + self.every.len() + self.page.len()
    }
}

//! core::policy
//!
//! Environment protection lookup.
//!
//! Protected environments (typically `production`) must not be mutated
//! directly; changes go through a reviewed merge request unless the caller
//! explicitly forces the action.

use std::collections::BTreeSet;

use crate::core::types::EnvironmentName;

/// Pure lookup: environment name → protected?
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentPolicy {
    protected: BTreeSet<EnvironmentName>,
}

impl EnvironmentPolicy {
    pub fn new(protected: impl IntoIterator<Item = EnvironmentName>) -> Self {
        Self {
            protected: protected.into_iter().collect(),
        }
    }

    /// Whether `environment` is statically marked protected.
    pub fn is_protected(&self, environment: &EnvironmentName) -> bool {
        self.protected.contains(environment)
    }

    /// Whether a mutation of `environment` may proceed.
    ///
    /// Unprotected environments are always allowed; protected ones only
    /// with `force`.
    pub fn allows(&self, environment: &EnvironmentName, force: bool) -> bool {
        force || !self.is_protected(environment)
    }

    pub fn protected(&self) -> impl Iterator<Item = &EnvironmentName> {
        self.protected.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> EnvironmentName {
        EnvironmentName::new(name).unwrap()
    }

    #[test]
    fn protected_requires_force() {
        let policy = EnvironmentPolicy::new([env("production")]);
        assert!(policy.is_protected(&env("production")));
        assert!(!policy.allows(&env("production"), false));
        assert!(policy.allows(&env("production"), true));
    }

    #[test]
    fn unprotected_always_allowed() {
        let policy = EnvironmentPolicy::new([env("production")]);
        assert!(policy.allows(&env("development"), false));
    }

    #[test]
    fn empty_policy_protects_nothing() {
        let policy = EnvironmentPolicy::default();
        assert!(!policy.is_protected(&env("production")));
        assert_eq!(policy.protected().count(), 0);
    }
}

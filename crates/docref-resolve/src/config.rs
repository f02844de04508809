//! Resolver configuration.

/// When lazy reference flags are honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LazyPolicy {
    /// Follow each property's lazy flag
    #[default]
    Declared,
    /// Resolve everything eagerly (batch jobs, tests)
    AlwaysEager,
}

impl LazyPolicy {
    /// Check whether a property declared `lazy` gets a proxy.
    pub const fn honors_lazy(self) -> bool {
        matches!(self, LazyPolicy::Declared)
    }
}

/// Reference resolver configuration.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Database used when a reference does not name one
    pub default_database: Option<String>,
    /// Lazy flag handling
    pub lazy_policy: LazyPolicy,
    /// Return collection references in stored order instead of loader order
    pub restore_source_order: bool,
}

impl ResolverConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default database.
    pub fn default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }

    /// Set the lazy policy.
    pub fn lazy_policy(mut self, policy: LazyPolicy) -> Self {
        self.lazy_policy = policy;
        self
    }

    /// Restore stored order for collection references.
    pub fn restore_source_order(mut self, restore: bool) -> Self {
        self.restore_source_order = restore;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.default_database, None);
        assert_eq!(config.lazy_policy, LazyPolicy::Declared);
        assert!(config.lazy_policy.honors_lazy());
        assert!(!config.restore_source_order);
    }

    #[test]
    fn test_builder() {
        let config = ResolverConfig::new()
            .default_database("catalog")
            .lazy_policy(LazyPolicy::AlwaysEager)
            .restore_source_order(true);
        assert_eq!(config.default_database.as_deref(), Some("catalog"));
        assert!(!config.lazy_policy.honors_lazy());
        assert!(config.restore_source_order);
    }
}

//! Identifier → implementation registry.
//!
//! Built once at startup and read-only afterwards; resolution is a plain
//! map lookup with no filesystem or search-path probing, and a miss is an
//! ordinary `None` rather than an error.

use std::collections::HashMap;

use crate::encode::Report;
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

/// The capability contract every technique implementation satisfies.
pub trait Technique: Send + Sync {
    fn run(&self, df: &DataFrame, params: &Params) -> Result<Report, TechniqueError>;
}

/// Plain functions and closures qualify, which keeps tests terse.
impl<F> Technique for F
where
    F: Fn(&DataFrame, &Params) -> Result<Report, TechniqueError> + Send + Sync,
{
    fn run(&self, df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
        self(df, params)
    }
}

#[derive(Default)]
pub struct Registry {
    techniques: HashMap<&'static str, Box<dyn Technique>>,
}

impl Registry {
    /// An empty registry, for tests and embedders that assemble their own.
    pub fn empty() -> Self {
        Registry::default()
    }

    /// The full built-in technique set.
    pub fn builtin() -> Self {
        let mut registry = Registry::empty();
        crate::techniques::install(&mut registry);
        registry
    }

    pub fn register(&mut self, id: &'static str, technique: Box<dyn Technique>) {
        self.techniques.insert(id, technique);
    }

    /// Look up an implementation. `None` is the not-found signal; nothing
    /// here ever raises.
    pub fn resolve(&self, id: &str) -> Option<&dyn Technique> {
        self.techniques.get(id).map(|t| t.as_ref())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.techniques.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SUPPORTED_TECHNIQUES;
    use crate::encode::Report;

    #[test]
    fn builtin_registry_covers_the_catalog() {
        let registry = Registry::builtin();
        for id in SUPPORTED_TECHNIQUES {
            assert!(registry.resolve(id).is_some(), "missing implementation for {id}");
        }
    }

    #[test]
    fn resolve_miss_is_none() {
        let registry = Registry::empty();
        assert!(registry.resolve("kmeans").is_none());
    }

    #[test]
    fn closures_register_as_techniques() {
        let mut registry = Registry::empty();
        registry.register(
            "echo",
            Box::new(|_: &DataFrame, _: &Params| -> Result<Report, TechniqueError> {
                Ok(Report::new("ok"))
            }),
        );
        assert!(registry.resolve("echo").is_some());
    }
}

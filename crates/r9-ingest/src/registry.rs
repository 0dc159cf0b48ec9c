//! Identifier registry: which object identifiers are already taken outside
//! the current run.
//!
//! The processor asks once per source file, with every candidate
//! identifier, so a remote registry costs one round trip per file.

use std::collections::BTreeSet;

use crate::error::RegistryError;

/// Answers "which of these identifiers are already registered?".
pub trait IdentifierRegistry {
    /// The subset of `candidates` already registered.
    ///
    /// # Errors
    ///
    /// [`RegistryError`] if the registry cannot be reached. The caller
    /// treats this as a failure of the whole source file.
    fn registered(&self, candidates: &[String]) -> Result<BTreeSet<String>, RegistryError>;
}

/// A fixed set of registered identifiers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    ids: BTreeSet<String>,
}

impl InMemoryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an identifier as registered.
    pub fn insert(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for InMemoryRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl IdentifierRegistry for InMemoryRegistry {
    fn registered(&self, candidates: &[String]) -> Result<BTreeSet<String>, RegistryError> {
        Ok(candidates
            .iter()
            .filter(|id| self.ids.contains(*id))
            .cloned()
            .collect())
    }
}

/// Consult several registries; an identifier known to any is registered.
pub struct RegistryChain<'a> {
    registries: Vec<&'a dyn IdentifierRegistry>,
}

impl<'a> RegistryChain<'a> {
    /// Chain the given registries.
    pub fn new(registries: Vec<&'a dyn IdentifierRegistry>) -> Self {
        Self { registries }
    }
}

impl IdentifierRegistry for RegistryChain<'_> {
    fn registered(&self, candidates: &[String]) -> Result<BTreeSet<String>, RegistryError> {
        let mut found = BTreeSet::new();
        for registry in &self.registries {
            found.extend(registry.registered(candidates)?);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Down;

    impl IdentifierRegistry for Down {
        fn registered(&self, _: &[String]) -> Result<BTreeSet<String>, RegistryError> {
            Err(RegistryError::Backend("connection refused".into()))
        }
    }

    #[test]
    fn returns_only_known_candidates() {
        let registry: InMemoryRegistry = ["2222222222222222"].into_iter().collect();
        let found = registry
            .registered(&["1111111111111111".into(), "2222222222222222".into()])
            .unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["2222222222222222"]);
    }

    #[test]
    fn chain_unions_and_propagates_failure() {
        let a: InMemoryRegistry = ["1"].into_iter().collect();
        let b: InMemoryRegistry = ["2"].into_iter().collect();
        let chain = RegistryChain::new(vec![&a, &b]);
        let found = chain.registered(&["1".into(), "2".into(), "3".into()]).unwrap();
        assert_eq!(found.len(), 2);

        let down = Down;
        let chain = RegistryChain::new(vec![&a, &down]);
        assert!(chain.registered(&["1".into()]).is_err());
    }
}

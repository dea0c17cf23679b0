// ============================================================================
// Name Resolver Interface
// Best-effort id -> display name translation
// ============================================================================

use crate::errors::SourceError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::warn;

/// Resolves numeric ids to display names, never failing
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Display name of `id`, or the id itself when it cannot be resolved
    async fn resolve_name(&self, id: i64) -> String;
}

/// Raw lookup against the external naming service
#[async_trait]
pub trait NameLookup: Send + Sync {
    async fn lookup_name(&self, id: i64) -> Result<String, SourceError>;
}

/// `NameResolver` with an in-memory positive cache
///
/// Failed lookups are not cached, so they are retried on the next call.
pub struct CachingNameResolver<L> {
    lookup: L,
    names: RwLock<HashMap<i64, String>>,
}

impl<L: NameLookup> CachingNameResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached(&self) -> usize {
        self.names.read().len()
    }
}

#[async_trait]
impl<L: NameLookup> NameResolver for CachingNameResolver<L> {
    async fn resolve_name(&self, id: i64) -> String {
        let cached = self.names.read().get(&id).cloned();
        if let Some(name) = cached {
            return name;
        }

        match self.lookup.lookup_name(id).await {
            Ok(name) => {
                self.names.write().insert(id, name.clone());
                name
            },
            Err(err) => {
                warn!(id, error = %err, "unable to resolve name");
                id.to_string()
            },
        }
    }
}

/// Resolver that always answers with the id, for setups without a naming service
#[derive(Debug, Default, Clone, Copy)]
pub struct IdNameResolver;

#[async_trait]
impl NameResolver for IdNameResolver {
    async fn resolve_name(&self, id: i64) -> String {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyLookup {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl NameLookup for FlakyLookup {
        async fn lookup_name(&self, id: i64) -> Result<String, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(SourceError::Request("unavailable".to_string()));
            }
            Ok(format!("Pilot {}", id))
        }
    }

    #[tokio::test]
    async fn test_positive_results_are_cached() {
        let resolver = CachingNameResolver::new(FlakyLookup {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        });

        assert_eq!(resolver.resolve_name(42).await, "Pilot 42");
        assert_eq!(resolver.resolve_name(42).await, "Pilot 42");
        assert_eq!(resolver.lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached(), 1);
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_id_and_retry() {
        let resolver = CachingNameResolver::new(FlakyLookup {
            calls: AtomicUsize::new(0),
            fail_first: 1,
        });

        assert_eq!(resolver.resolve_name(7).await, "7");
        assert_eq!(resolver.cached(), 0);
        assert_eq!(resolver.resolve_name(7).await, "Pilot 7");
        assert_eq!(resolver.lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_id_resolver() {
        assert_eq!(IdNameResolver.resolve_name(1001).await, "1001");
    }
}

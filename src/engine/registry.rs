//! Engine registry: extension token -> transform descriptor.
//!
//! An explicit value built once at startup by plugin-loading code, then
//! frozen and shared (`Arc`) with every resolution. Lookup is O(1) by token;
//! nothing about registration order is observable to resolution beyond
//! "latest registration wins".

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::EngineDescriptor;
use crate::error::CapabilityConflict;

#[derive(Debug, Default)]
pub struct EngineRegistry {
    engines: FxHashMap<String, Arc<EngineDescriptor>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `descriptor` under every token it claims.
    ///
    /// Re-registration replaces, never merges, the prior descriptor for a
    /// token. Replacing a claim that carried a different classification logs
    /// a duplicate-capability warning; the later registration still wins.
    pub fn register(&mut self, descriptor: EngineDescriptor) {
        if descriptor.claims().is_empty() {
            crate::log!("registry"; "descriptor with no claimed extensions ignored");
            return;
        }

        let descriptor = Arc::new(descriptor);
        for token in descriptor.claims() {
            let prior = self
                .engines
                .insert(token.clone(), Arc::clone(&descriptor));

            if let Some(prior) = prior
                && prior.classification() != descriptor.classification()
            {
                let conflict = CapabilityConflict {
                    token: token.clone(),
                    replaced: prior.classification(),
                    kept: descriptor.classification(),
                };
                crate::log!("warning"; "{conflict}");
            }
        }
    }

    /// Look up the descriptor for a token.
    ///
    /// An explicit miss: a token nothing claims terminates a chain early,
    /// it is not an error.
    pub fn resolve(&self, token: &str) -> Option<&Arc<EngineDescriptor>> {
        self.engines.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.engines.contains_key(token)
    }

    /// Number of claimed tokens.
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Freeze for sharing across concurrent resolutions.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

// =============================================================================
// Tests
// =============================================================================

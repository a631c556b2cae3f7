//! Latest-observation storage.
//!
//! A store keeps exactly one [`Observation`] per token and overwrites it
//! whole on every write. Absent tokens read as the empty sentinel.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use meridian_types::{Observation, TokenId};

use crate::Result;

/// Storage for the latest observation of each token.
pub trait ObservationStore: Send + Sync {
    /// The stored observation, or [`Observation::default`] if none.
    fn get(&self, token: &TokenId) -> Result<Observation>;

    /// Replace the stored observation.
    fn set(&self, token: &TokenId, observation: Observation) -> Result<()>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    observations: RwLock<HashMap<TokenId, Observation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens with a stored observation.
    pub fn len(&self) -> usize {
        self.observations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored observation, or the empty sentinel. Never fails.
    pub fn observation(&self, token: &TokenId) -> Observation {
        let observations = self.observations.read().unwrap_or_else(PoisonError::into_inner);
        observations.get(token).copied().unwrap_or_default()
    }

    /// Replace the stored observation. Never fails.
    pub fn insert(&self, token: TokenId, observation: Observation) {
        self.observations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, observation);
    }
}

impl ObservationStore for MemoryStore {
    fn get(&self, token: &TokenId) -> Result<Observation> {
        Ok(self.observation(token))
    }

    fn set(&self, token: &TokenId, observation: Observation) -> Result<()> {
        self.insert(*token, observation);
        Ok(())
    }
}

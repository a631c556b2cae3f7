//! General and token-specific underlying oracles.
//!
//! General oracles are consulted for every token. A token-specific oracle is
//! consulted only for its token, after all general oracles. Caller order is
//! kept in both lists so traversal is reproducible.
//!
//! The registry is validated once at construction and never changes after.

use std::fmt;
use std::sync::Arc;

use meridian_types::{SourceId, TokenId};

use crate::source::UnderlyingOracle;
use crate::{OracleError, Result};

/// An oracle that applies to a single token.
#[derive(Clone)]
pub struct TokenSpecificOracle {
    pub token: TokenId,
    pub oracle: Arc<dyn UnderlyingOracle>,
}

impl TokenSpecificOracle {
    pub fn new(token: TokenId, oracle: Arc<dyn UnderlyingOracle>) -> Self {
        Self { token, oracle }
    }
}

impl fmt::Debug for TokenSpecificOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSpecificOracle")
            .field("token", &self.token)
            .field("oracle", &self.oracle.id())
            .finish()
    }
}

/// Validated, immutable set of underlying oracles.
#[derive(Clone)]
pub struct OracleRegistry {
    general: Vec<Arc<dyn UnderlyingOracle>>,
    token_specific: Vec<TokenSpecificOracle>,
}

impl OracleRegistry {
    /// Build a registry.
    ///
    /// # Errors
    ///
    /// - [`OracleError::MissingSources`] if both lists are empty
    /// - [`OracleError::DuplicateSource`] if an oracle appears twice among the
    ///   general oracles, twice for the same token, or both as a general and
    ///   a token-specific oracle
    pub fn new(
        general: Vec<Arc<dyn UnderlyingOracle>>,
        token_specific: Vec<TokenSpecificOracle>,
    ) -> Result<Self> {
        if general.is_empty() && token_specific.is_empty() {
            return Err(OracleError::MissingSources);
        }

        for (i, oracle) in general.iter().enumerate() {
            let id = oracle.id();
            if general[..i].iter().any(|other| other.id() == id) {
                return Err(OracleError::DuplicateSource { oracle: id });
            }
        }

        for (i, entry) in token_specific.iter().enumerate() {
            let id = entry.oracle.id();
            // General oracles already cover every token.
            if general.iter().any(|other| other.id() == id) {
                return Err(OracleError::DuplicateSource { oracle: id });
            }
            if token_specific[..i]
                .iter()
                .any(|other| other.token == entry.token && other.oracle.id() == id)
            {
                return Err(OracleError::DuplicateSource { oracle: id });
            }
        }

        Ok(Self {
            general,
            token_specific,
        })
    }

    /// Every token-specific entry, in registration order.
    pub fn token_specific(&self) -> &[TokenSpecificOracle] {
        &self.token_specific
    }

    /// The oracles to use for `token`: general first, then token-specific.
    pub fn resolve(&self, token: &TokenId) -> Vec<Arc<dyn UnderlyingOracle>> {
        self.general
            .iter()
            .cloned()
            .chain(
                self.token_specific
                    .iter()
                    .filter(|entry| entry.token == *token)
                    .map(|entry| Arc::clone(&entry.oracle)),
            )
            .collect()
    }

    /// Ids of the general oracles.
    pub fn general_ids(&self) -> Vec<SourceId> {
        self.general.iter().map(|o| o.id()).collect()
    }

    /// Ids of the oracles [`resolve`](Self::resolve) returns for `token`.
    pub fn ids_for(&self, token: &TokenId) -> Vec<SourceId> {
        self.resolve(token).iter().map(|o| o.id()).collect()
    }
}

impl fmt::Debug for OracleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleRegistry")
            .field("general", &self.general_ids())
            .field("token_specific", &self.token_specific)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::stub::StubOracle;

    const GRT: TokenId = TokenId::repeat_byte(0xC9);
    const BAT: TokenId = TokenId::repeat_byte(0x0D);

    fn stub(byte: u8) -> Arc<dyn UnderlyingOracle> {
        Arc::new(StubOracle::new(
            SourceId::repeat_byte(byte),
            6,
            Arc::new(ManualClock::new(1)),
        ))
    }

    #[test]
    fn test_resolve_general_then_specific() {
        let a = stub(1);
        let b = stub(2);
        let c = stub(3);
        let registry = OracleRegistry::new(
            vec![a.clone(), b.clone()],
            vec![TokenSpecificOracle::new(GRT, c.clone())],
        )
        .expect("valid registry");

        assert_eq!(registry.general_ids(), vec![a.id(), b.id()]);
        assert_eq!(registry.ids_for(&GRT), vec![a.id(), b.id(), c.id()]);
        assert_eq!(registry.ids_for(&BAT), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_token_specific_only() {
        let c = stub(3);
        let registry = OracleRegistry::new(vec![], vec![TokenSpecificOracle::new(GRT, c.clone())])
            .expect("valid registry");
        assert!(registry.general_ids().is_empty());
        assert_eq!(registry.ids_for(&GRT), vec![c.id()]);
        assert!(registry.resolve(&BAT).is_empty());
    }

    #[test]
    fn test_same_oracle_for_different_tokens() {
        let c = stub(3);
        let registry = OracleRegistry::new(
            vec![],
            vec![
                TokenSpecificOracle::new(GRT, c.clone()),
                TokenSpecificOracle::new(BAT, c.clone()),
            ],
        )
        .expect("distinct tokens are allowed");
        assert_eq!(registry.ids_for(&BAT), vec![c.id()]);
    }

    #[test]
    fn test_missing_sources() {
        let err = OracleRegistry::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, OracleError::MissingSources));
    }

    #[test]
    fn test_duplicate_general() {
        let a = stub(1);
        let err = OracleRegistry::new(vec![a.clone(), a.clone()], vec![]).unwrap_err();
        assert_eq!(err, OracleError::DuplicateSource { oracle: a.id() });
    }

    #[test]
    fn test_duplicate_general_by_id() {
        // Two handles with the same id are the same oracle.
        let err = OracleRegistry::new(vec![stub(1), stub(2), stub(1)], vec![]).unwrap_err();
        assert!(matches!(err, OracleError::DuplicateSource { .. }));
    }

    #[test]
    fn test_duplicate_token_specific() {
        let a = stub(1);
        let entry = TokenSpecificOracle::new(GRT, a.clone());
        let err = OracleRegistry::new(vec![], vec![entry.clone(), entry]).unwrap_err();
        assert_eq!(err, OracleError::DuplicateSource { oracle: a.id() });
    }

    #[test]
    fn test_duplicate_general_and_token_specific() {
        let a = stub(1);
        let err = OracleRegistry::new(vec![a.clone()], vec![TokenSpecificOracle::new(GRT, a.clone())])
            .unwrap_err();
        assert_eq!(err, OracleError::DuplicateSource { oracle: a.id() });
    }
}

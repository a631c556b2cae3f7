//! The aggregated oracle: update orchestration and consult surface.
//!
//! ## Update
//!
//! For a token, [`AggregatedOracle::update`]:
//!
//! 1. resolves the general and token-specific oracles for the token,
//! 2. calls `update` on each, reporting failures as events,
//! 3. calls `consult` on each with the aggregator's period as maximum age,
//!    dropping failed sources,
//! 4. rescales each quote to the aggregator's decimals,
//! 5. aggregates the valid quotes and commits the result stamped with the
//!    current time, or reports the rejection and keeps the old observation.
//!
//! The returned flag is true when any underlying oracle reported a change,
//! whether or not an aggregate was committed.
//!
//! Updates of the same token are serialized by a per-token lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use meridian_types::{
    Observation, OracleEvent, Quote, QuoteToken, SourceId, TokenId, UFixed,
};

use crate::aggregation;
use crate::clock::Clock;
use crate::decimals;
use crate::registry::OracleRegistry;
use crate::sink::EventSink;
use crate::source::{isolate, SourceFailure, UnderlyingOracle};
use crate::staleness;
use crate::store::{MemoryStore, ObservationStore};
use crate::{OracleError, Result};

/// Static configuration of an aggregated oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Identifier of the aggregator itself.
    pub id: SourceId,
    /// The token prices are quoted in.
    pub quote_token: QuoteToken,
    /// Seconds after which an observation needs an update. Also the
    /// maximum age accepted from underlying oracles.
    pub period: u64,
}

/// Fuses the quotes of several underlying oracles into one observation per token.
pub struct AggregatedOracle<S = MemoryStore> {
    config: AggregatorConfig,
    registry: OracleRegistry,
    store: S,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    update_locks: Mutex<HashMap<TokenId, Arc<Mutex<()>>>>,
}

impl<S: ObservationStore> AggregatedOracle<S> {
    /// Create an aggregated oracle.
    ///
    /// # Errors
    ///
    /// - [`OracleError::DuplicateSource`] if the registry contains the
    ///   aggregator itself
    pub fn new(
        config: AggregatorConfig,
        registry: OracleRegistry,
        store: S,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let registered_self = registry.general_ids().contains(&config.id)
            || registry
                .token_specific()
                .iter()
                .any(|entry| entry.oracle.id() == config.id);
        if registered_self {
            return Err(OracleError::DuplicateSource { oracle: config.id });
        }

        Ok(Self {
            config,
            registry,
            store,
            clock,
            events,
            update_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn quote_token_name(&self) -> &str {
        &self.config.quote_token.name
    }

    pub fn quote_token_address(&self) -> TokenId {
        self.config.quote_token.address
    }

    pub fn quote_token_symbol(&self) -> &str {
        &self.config.quote_token.symbol
    }

    pub fn quote_token_decimals(&self) -> u8 {
        self.config.quote_token.decimals
    }

    pub fn period(&self) -> u64 {
        self.config.period
    }

    /// Ids of the general underlying oracles, in order.
    pub fn oracles(&self) -> Vec<SourceId> {
        self.registry.general_ids()
    }

    /// Ids of every underlying oracle used for `token`, in consultation order.
    pub fn oracles_for(&self, token: &TokenId) -> Vec<SourceId> {
        self.registry.ids_for(token)
    }

    /// The backing store. Writing to it directly bypasses aggregation.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The stored aggregate for `token`, empty if none exists.
    pub fn observation(&self, token: &TokenId) -> Result<Observation> {
        self.store.get(token)
    }

    /// Whether the aggregate for `token` is missing or at least `period` old.
    pub fn needs_update(&self, token: &TokenId) -> Result<bool> {
        let observation = self.store.get(token)?;
        Ok(staleness::needs_update(
            &observation,
            self.config.period,
            self.clock.now(),
        ))
    }

    /// Aggregate price of `token`, regardless of age.
    pub fn consult_price(&self, token: &TokenId) -> Result<UFixed> {
        Ok(self.fresh_observation(token, None)?.price)
    }

    /// Aggregate price of `token`, at most `max_age` seconds old.
    pub fn consult_price_with_max_age(&self, token: &TokenId, max_age: u64) -> Result<UFixed> {
        Ok(self.fresh_observation(token, Some(max_age))?.price)
    }

    /// Token and quote-token liquidity of `token`, regardless of age.
    pub fn consult_liquidity(&self, token: &TokenId) -> Result<(UFixed, UFixed)> {
        let observation = self.fresh_observation(token, None)?;
        Ok((observation.token_liquidity, observation.quote_token_liquidity))
    }

    /// Token and quote-token liquidity of `token`, at most `max_age` seconds old.
    pub fn consult_liquidity_with_max_age(
        &self,
        token: &TokenId,
        max_age: u64,
    ) -> Result<(UFixed, UFixed)> {
        let observation = self.fresh_observation(token, Some(max_age))?;
        Ok((observation.token_liquidity, observation.quote_token_liquidity))
    }

    /// Price and liquidities of `token`, regardless of age.
    pub fn consult(&self, token: &TokenId) -> Result<Quote> {
        Ok(self.fresh_observation(token, None)?.quote())
    }

    /// Price and liquidities of `token`, at most `max_age` seconds old.
    pub fn consult_with_max_age(&self, token: &TokenId, max_age: u64) -> Result<Quote> {
        Ok(self.fresh_observation(token, Some(max_age))?.quote())
    }

    fn fresh_observation(&self, token: &TokenId, max_age: Option<u64>) -> Result<Observation> {
        let observation = self.store.get(token)?;
        staleness::check_fresh(token, &observation, max_age, self.clock.now())?;
        Ok(observation)
    }

    /// Refresh the underlying oracles for `token` and try to commit a new
    /// aggregate. Returns whether any underlying oracle reported a change.
    ///
    /// Source failures and aggregation rejections are reported as events
    /// and never returned.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Store`] if the new aggregate cannot be written
    pub fn update(&self, token: &TokenId) -> Result<bool> {
        let lock = self.token_lock(token);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.update_locked(token)
        };
        self.release_token_lock(token, lock);
        result
    }

    fn update_locked(&self, token: &TokenId) -> Result<bool> {
        let now = self.clock.now();

        let sources = self.registry.resolve(token);
        let underlying_updated = self.update_sources(token, &sources);
        let quotes = self.consult_sources(token, &sources);

        match aggregation::aggregate(&quotes) {
            Ok(aggregate) => self.commit(token, aggregate, now)?,
            Err(err) => {
                warn!(
                    oracle = %self.config.id,
                    %token,
                    consulted = quotes.len(),
                    error = %err,
                    "aggregate rejected"
                );
                self.events.emit(OracleEvent::UpdateErrorWithReason {
                    oracle: self.config.id,
                    token: *token,
                    reason: err.code().to_string(),
                });
            }
        }

        Ok(underlying_updated)
    }

    fn update_sources(&self, token: &TokenId, sources: &[Arc<dyn UnderlyingOracle>]) -> bool {
        let mut updated = false;
        for source in sources {
            match isolate(|| source.update(token)) {
                Ok(changed) => updated |= changed,
                Err(failure) => {
                    warn!(oracle = %source.id(), %token, %failure, "underlying update failed");
                    self.events.emit(match failure {
                        SourceFailure::Reason(reason) => OracleEvent::UpdateErrorWithReason {
                            oracle: source.id(),
                            token: *token,
                            reason,
                        },
                        SourceFailure::Raw(data) => OracleEvent::UpdateError {
                            oracle: source.id(),
                            token: *token,
                            data,
                        },
                    });
                }
            }
        }
        updated
    }

    fn consult_sources(
        &self,
        token: &TokenId,
        sources: &[Arc<dyn UnderlyingOracle>],
    ) -> Vec<Quote> {
        let target_decimals = self.config.quote_token.decimals;
        let mut quotes = Vec::with_capacity(sources.len());

        for source in sources {
            let consulted = isolate(|| {
                let quote = source.consult(token, self.config.period)?;
                let scaled = decimals::normalize_quote(
                    quote,
                    source.quote_token_decimals(),
                    target_decimals,
                )?;
                Ok(scaled)
            });
            match consulted {
                Ok(quote) => {
                    debug!(
                        oracle = %source.id(),
                        %token,
                        price = %quote.price,
                        quote_token_liquidity = %quote.quote_token_liquidity,
                        "consulted underlying oracle"
                    );
                    quotes.push(quote);
                }
                Err(failure) => {
                    warn!(oracle = %source.id(), %token, %failure, "underlying consult failed");
                    self.events.emit(match failure {
                        SourceFailure::Reason(reason) => OracleEvent::ConsultErrorWithReason {
                            oracle: source.id(),
                            token: *token,
                            reason,
                        },
                        SourceFailure::Raw(data) => OracleEvent::ConsultError {
                            oracle: source.id(),
                            token: *token,
                            data,
                        },
                    });
                }
            }
        }
        quotes
    }

    fn commit(&self, token: &TokenId, aggregate: Quote, now: u64) -> Result<()> {
        self.store.set(token, aggregate.observed_at(now))?;
        info!(
            oracle = %self.config.id,
            %token,
            timestamp = now,
            price = %aggregate.price,
            token_liquidity = %aggregate.token_liquidity,
            quote_token_liquidity = %aggregate.quote_token_liquidity,
            "aggregate committed"
        );
        self.events.emit(OracleEvent::Updated {
            token: *token,
            quote_token: self.config.quote_token.address,
            timestamp: now,
            price: aggregate.price,
            token_liquidity: aggregate.token_liquidity,
            quote_token_liquidity: aggregate.quote_token_liquidity,
        });
        Ok(())
    }

    fn token_lock(&self, token: &TokenId) -> Arc<Mutex<()>> {
        let mut locks = self.update_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(*token).or_default())
    }

    /// Drop the caller's handle and forget the token's lock once no other
    /// update holds or awaits it. Handles are only cloned or released under
    /// the map lock, so the count cannot grow behind our back.
    fn release_token_lock(&self, token: &TokenId, lock: Arc<Mutex<()>>) {
        let mut locks = self.update_locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(token)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(token);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.update_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<S: ObservationStore> UnderlyingOracle for AggregatedOracle<S> {
    fn id(&self) -> SourceId {
        self.config.id
    }

    fn quote_token_decimals(&self) -> u8 {
        self.config.quote_token.decimals
    }

    fn needs_update(&self, token: &TokenId) -> std::result::Result<bool, SourceFailure> {
        Ok(AggregatedOracle::needs_update(self, token)?)
    }

    fn update(&self, token: &TokenId) -> std::result::Result<bool, SourceFailure> {
        Ok(AggregatedOracle::update(self, token)?)
    }

    fn consult(&self, token: &TokenId, max_age: u64) -> std::result::Result<Quote, SourceFailure> {
        Ok(self.consult_with_max_age(token, max_age)?)
    }
}

impl<S> fmt::Debug for AggregatedOracle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatedOracle")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

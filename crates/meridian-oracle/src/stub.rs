//! Fixed-rate underlying oracle.
//!
//! A stub oracle reports configured rates instead of discovering prices.
//! Its `update` writes the configured rate for a token, stamped with the
//! shared clock, whenever its own observation has gone stale. This lets a
//! deployment run the aggregation pipeline before real price sources are
//! wired in.
//!
//! The `dev_*` hooks exist for development and testing: they write
//! observations directly, force the value `update` reports, and inject
//! update or consult failures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use meridian_types::{Observation, Quote, SourceId, TokenId};

use crate::clock::Clock;
use crate::source::{SourceFailure, UnderlyingOracle};
use crate::staleness;
use crate::store::{MemoryStore, ObservationStore};

/// Default refresh period of a stub oracle in seconds.
pub const DEFAULT_PERIOD: u64 = 60;

/// An underlying oracle that serves fixed rates.
pub struct StubOracle {
    id: SourceId,
    decimals: u8,
    period: u64,
    clock: Arc<dyn Clock>,
    observations: MemoryStore,
    state: Mutex<StubState>,
}

#[derive(Default)]
struct StubState {
    rates: HashMap<TokenId, Quote>,
    update_return: Option<bool>,
    update_failure: Option<SourceFailure>,
    consult_failure: Option<SourceFailure>,
    update_calls: u64,
    consult_calls: u64,
}

impl StubOracle {
    /// Create a stub oracle with no rates, reporting values with `decimals`.
    pub fn new(id: SourceId, decimals: u8, clock: Arc<dyn Clock>) -> Self {
        Self {
            id,
            decimals,
            period: DEFAULT_PERIOD,
            clock,
            observations: MemoryStore::new(),
            state: Mutex::new(StubState::default()),
        }
    }

    /// Set the refresh period.
    pub fn with_period(mut self, period: u64) -> Self {
        self.period = period;
        self
    }

    /// Serve `quote` for `token`.
    pub fn with_rate(self, token: TokenId, quote: Quote) -> Self {
        self.state().rates.insert(token, quote);
        self
    }

    /// Refresh period in seconds.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// The oracle's current observation for `token`.
    pub fn observation(&self, token: &TokenId) -> Observation {
        self.observations.observation(token)
    }

    /// Number of `update` calls received.
    pub fn update_calls(&self) -> u64 {
        self.state().update_calls
    }

    /// Number of `consult` calls received.
    pub fn consult_calls(&self) -> u64 {
        self.state().consult_calls
    }

    /// Change the rate served for `token` (development/testing only).
    ///
    /// Takes effect on the next update that finds the observation stale.
    pub fn dev_set_rate(&self, token: TokenId, quote: Quote) {
        tracing::warn!(oracle = %self.id, %token, "stub oracle: rate changed (dev only)");
        self.state().rates.insert(token, quote);
    }

    /// Overwrite the observation for `token` (development/testing only).
    pub fn dev_set_observation(&self, token: TokenId, observation: Observation) {
        self.observations.insert(token, observation);
    }

    /// Force the value `update` reports, or restore the computed value with `None`.
    pub fn dev_set_update_return(&self, value: Option<bool>) {
        self.state().update_return = value;
    }

    /// Make every `update` fail with `failure`, or stop failing with `None`.
    pub fn dev_set_update_failure(&self, failure: Option<SourceFailure>) {
        self.state().update_failure = failure;
    }

    /// Make every `consult` fail with `failure`, or stop failing with `None`.
    pub fn dev_set_consult_failure(&self, failure: Option<SourceFailure>) {
        self.state().consult_failure = failure;
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnderlyingOracle for StubOracle {
    fn id(&self) -> SourceId {
        self.id
    }

    fn quote_token_decimals(&self) -> u8 {
        self.decimals
    }

    fn needs_update(&self, token: &TokenId) -> Result<bool, SourceFailure> {
        let observation = self.observations.get(token)?;
        Ok(staleness::needs_update(&observation, self.period, self.clock.now()))
    }

    fn update(&self, token: &TokenId) -> Result<bool, SourceFailure> {
        let mut state = self.state();
        state.update_calls += 1;
        if let Some(failure) = &state.update_failure {
            return Err(failure.clone());
        }

        let mut changed = false;
        if let Some(rate) = state.rates.get(token).copied() {
            let now = self.clock.now();
            let current = self.observations.get(token)?;
            if staleness::needs_update(&current, self.period, now) {
                self.observations.set(token, rate.observed_at(now))?;
                changed = true;
            }
        }
        Ok(state.update_return.unwrap_or(changed))
    }

    fn consult(&self, token: &TokenId, max_age: u64) -> Result<Quote, SourceFailure> {
        let mut state = self.state();
        state.consult_calls += 1;
        if let Some(failure) = &state.consult_failure {
            return Err(failure.clone());
        }
        drop(state);

        let observation = self.observations.get(token)?;
        staleness::check_fresh(token, &observation, Some(max_age), self.clock.now())?;
        Ok(observation.quote())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::OracleError;

    const T0: u64 = 1_700_000_000;
    const GRT: TokenId = TokenId::repeat_byte(0xC9);

    fn setup() -> (ManualClock, StubOracle) {
        let clock = ManualClock::new(T0);
        let oracle = StubOracle::new(SourceId::repeat_byte(1), 6, Arc::new(clock.clone()));
        (clock, oracle)
    }

    #[test]
    fn test_update_without_rate_changes_nothing() {
        let (_clock, oracle) = setup();
        assert_eq!(oracle.update(&GRT), Ok(false));
        assert_eq!(oracle.update_calls(), 1);
        assert!(oracle.observation(&GRT).is_empty());
    }

    #[test]
    fn test_update_writes_rate_when_stale() {
        let (clock, oracle) = setup();
        let oracle = oracle.with_period(10).with_rate(GRT, Quote::new(5, 6, 7));

        assert_eq!(oracle.needs_update(&GRT), Ok(true));
        assert_eq!(oracle.update(&GRT), Ok(true));
        assert_eq!(oracle.observation(&GRT), Observation::new(5, 6, 7, T0));

        clock.advance(9);
        assert_eq!(oracle.needs_update(&GRT), Ok(false));
        assert_eq!(oracle.update(&GRT), Ok(false));

        clock.advance(1);
        assert_eq!(oracle.update(&GRT), Ok(true));
        assert_eq!(oracle.observation(&GRT).timestamp, T0 + 10);
    }

    #[test]
    fn test_dev_set_rate_applies_on_next_refresh() {
        let (clock, oracle) = setup();
        let oracle = oracle.with_period(10).with_rate(GRT, Quote::new(5, 6, 7));
        oracle.update(&GRT).expect("update");

        oracle.dev_set_rate(GRT, Quote::new(8, 8, 8));
        assert_eq!(oracle.observation(&GRT).price, 5);

        clock.advance(10);
        oracle.update(&GRT).expect("update");
        assert_eq!(oracle.observation(&GRT).price, 8);
    }

    #[test]
    fn test_dev_set_observation_overwrites() {
        let (_clock, oracle) = setup();
        let oracle = oracle.with_rate(GRT, Quote::new(5, 6, 7));
        oracle.update(&GRT).expect("update");

        oracle.dev_set_observation(GRT, Observation::new(1, 0, 2, T0 - 1));
        assert_eq!(oracle.observation(&GRT), Observation::new(1, 0, 2, T0 - 1));
        oracle.dev_set_observation(GRT, Observation::default());
        assert!(oracle.observation(&GRT).is_empty());
    }

    #[test]
    fn test_update_return_override() {
        let (_clock, oracle) = setup();
        oracle.dev_set_update_return(Some(true));
        assert_eq!(oracle.update(&GRT), Ok(true));
        oracle.dev_set_update_return(None);
        assert_eq!(oracle.update(&GRT), Ok(false));
    }

    #[test]
    fn test_update_failure_injection() {
        let (_clock, oracle) = setup();
        oracle.dev_set_update_failure(Some(SourceFailure::Reason("REASON".into())));
        assert_eq!(oracle.update(&GRT), Err(SourceFailure::Reason("REASON".into())));
        assert_eq!(oracle.update_calls(), 1);
    }

    #[test]
    fn test_consult_fresh_observation() {
        let (clock, oracle) = setup();
        oracle.dev_set_observation(GRT, Observation::new(1, 2, 3, T0));
        clock.advance(60);
        assert_eq!(oracle.consult(&GRT, 60), Ok(Quote::new(1, 2, 3)));
        assert_eq!(oracle.consult_calls(), 1);
    }

    #[test]
    fn test_consult_old_observation() {
        let (clock, oracle) = setup();
        oracle.dev_set_observation(GRT, Observation::new(1, 2, 3, T0));
        clock.advance(61);
        let expected = OracleError::RateTooOld {
            token: GRT,
            age: 61,
            max_age: 60,
        };
        assert_eq!(oracle.consult(&GRT, 60), Err(expected.into()));
    }

    #[test]
    fn test_consult_missing_observation() {
        let (_clock, oracle) = setup();
        let err = oracle.consult(&GRT, 60).unwrap_err();
        assert_eq!(err, OracleError::MissingObservation { token: GRT }.into());
    }

    #[test]
    fn test_consult_failure_injection() {
        let (_clock, oracle) = setup();
        oracle.dev_set_observation(GRT, Observation::new(1, 2, 3, T0));
        oracle.dev_set_consult_failure(Some(SourceFailure::Raw(vec![0x11])));
        assert_eq!(oracle.consult(&GRT, 60), Err(SourceFailure::Raw(vec![0x11])));
        oracle.dev_set_consult_failure(None);
        assert!(oracle.consult(&GRT, 60).is_ok());
    }
}

//! Staleness rules shared by every oracle.
//!
//! Two checks exist, with deliberately different boundaries:
//!
//! - [`needs_update`] is inclusive: an observation exactly `period` seconds
//!   old must be refreshed.
//! - [`check_fresh`] is exclusive: an observation exactly `max_age` seconds
//!   old is still fresh.
//!
//! Elapsed time saturates at zero, so a future-dated observation counts as
//! brand new rather than wrapping around.

use meridian_types::{Observation, Timestamp, TokenId};

use crate::{OracleError, Result};

/// Seconds elapsed since `observation`, clamped to zero.
pub fn elapsed(observation: &Observation, now: Timestamp) -> u64 {
    now.saturating_sub(observation.timestamp)
}

/// Whether an observation should be refreshed.
///
/// True when no observation exists or at least `period` seconds have passed.
pub fn needs_update(observation: &Observation, period: u64, now: Timestamp) -> bool {
    observation.is_empty() || elapsed(observation, now) >= period
}

/// Check that an observation exists and, if `max_age` is given, is no older
/// than `max_age` seconds.
///
/// # Errors
///
/// - [`OracleError::MissingObservation`] if no observation exists
/// - [`OracleError::RateTooOld`] if the observation is more than `max_age` seconds old
pub fn check_fresh(
    token: &TokenId,
    observation: &Observation,
    max_age: Option<u64>,
    now: Timestamp,
) -> Result<()> {
    if observation.is_empty() {
        return Err(OracleError::MissingObservation { token: *token });
    }
    if let Some(max_age) = max_age {
        let age = elapsed(observation, now);
        if age > max_age {
            return Err(OracleError::RateTooOld {
                token: *token,
                age,
                max_age,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: u64 = 100;
    const MAX_AGE: u64 = 60;
    const T0: Timestamp = 1_700_000_000;

    fn obs_at(timestamp: Timestamp) -> Observation {
        Observation::new(1, 1, 1, timestamp)
    }

    #[test]
    fn test_needs_update_without_observation() {
        assert!(needs_update(&Observation::default(), PERIOD, T0));
    }

    #[test]
    fn test_needs_update_at_period() {
        assert!(needs_update(&obs_at(T0), PERIOD, T0 + PERIOD));
    }

    #[test]
    fn test_needs_update_after_period() {
        assert!(needs_update(&obs_at(T0), PERIOD, T0 + PERIOD + 1));
    }

    #[test]
    fn test_no_update_before_period() {
        assert!(!needs_update(&obs_at(T0), PERIOD, T0 + PERIOD - 1));
    }

    #[test]
    fn test_no_update_at_zero_elapsed() {
        assert!(!needs_update(&obs_at(T0), PERIOD, T0));
    }

    #[test]
    fn test_future_observation_does_not_wrap() {
        let future = obs_at(T0 + 10);
        assert_eq!(elapsed(&future, T0), 0);
        assert!(!needs_update(&future, PERIOD, T0));
        check_fresh(&TokenId::ZERO, &future, Some(0), T0).expect("future is fresh");
    }

    #[test]
    fn test_check_fresh_missing() {
        let err = check_fresh(&TokenId::ZERO, &Observation::default(), None, T0).unwrap_err();
        assert!(matches!(err, OracleError::MissingObservation { .. }));

        let err = check_fresh(&TokenId::ZERO, &Observation::default(), Some(MAX_AGE), T0)
            .unwrap_err();
        assert!(matches!(err, OracleError::MissingObservation { .. }));
    }

    #[test]
    fn test_check_fresh_too_old() {
        let err = check_fresh(&TokenId::ZERO, &obs_at(T0), Some(MAX_AGE), T0 + MAX_AGE + 1)
            .unwrap_err();
        assert!(matches!(
            err,
            OracleError::RateTooOld { age: 61, max_age: 60, .. }
        ));
    }

    #[test]
    fn test_check_fresh_boundaries() {
        let obs = obs_at(T0);
        check_fresh(&TokenId::ZERO, &obs, Some(MAX_AGE), T0 + MAX_AGE).expect("age == max");
        check_fresh(&TokenId::ZERO, &obs, Some(MAX_AGE), T0 + MAX_AGE - 1).expect("age < max");
        check_fresh(&TokenId::ZERO, &obs, Some(MAX_AGE), T0).expect("age == 0");
    }

    #[test]
    fn test_check_fresh_without_bound_ignores_age() {
        check_fresh(&TokenId::ZERO, &obs_at(1), None, u64::MAX).expect("no bound");
    }
}

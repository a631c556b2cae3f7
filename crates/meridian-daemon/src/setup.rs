//! Builds the aggregated oracle from configuration.

use std::sync::Arc;

use tracing::info;

use meridian_oracle::{
    AggregatedOracle, Clock, EventSink, ObservationStore, OracleRegistry, StubOracle,
    TokenSpecificOracle, UnderlyingOracle,
};
use meridian_types::Quote;

use crate::config::{DaemonConfig, SourceConfig};

/// Instantiate one fixed-rate source.
pub fn build_source(source: &SourceConfig, clock: Arc<dyn Clock>) -> StubOracle {
    source.rates.iter().fold(
        StubOracle::new(source.id, source.decimals, clock).with_period(source.period),
        |stub, rate| {
            stub.with_rate(
                rate.token,
                Quote::new(rate.price, rate.token_liquidity, rate.quote_token_liquidity),
            )
        },
    )
}

/// Wire configured sources, store, clock and event sink into an aggregator.
pub fn build_oracle<S: ObservationStore>(
    config: &DaemonConfig,
    store: S,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
) -> anyhow::Result<AggregatedOracle<S>> {
    let mut general: Vec<Arc<dyn UnderlyingOracle>> = Vec::new();
    let mut token_specific = Vec::new();

    for source in &config.sources {
        let oracle: Arc<dyn UnderlyingOracle> = Arc::new(build_source(source, Arc::clone(&clock)));
        match source.token {
            Some(token) => token_specific.push(TokenSpecificOracle::new(token, oracle)),
            None => general.push(oracle),
        }
    }

    info!(
        general = general.len(),
        token_specific = token_specific.len(),
        "registering underlying oracles"
    );

    let registry = OracleRegistry::new(general, token_specific)?;
    let oracle = AggregatedOracle::new(
        config.aggregator.oracle_config(),
        registry,
        store,
        clock,
        events,
    )?;
    Ok(oracle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_oracle::{ManualClock, MemorySink, MemoryStore, OracleError};
    use meridian_types::{SourceId, TokenId};

    use crate::config::RateConfig;

    const GRT: TokenId = TokenId::repeat_byte(0xC9);

    fn source(id: u8, token: Option<TokenId>) -> SourceConfig {
        SourceConfig {
            id: SourceId::repeat_byte(id),
            decimals: 6,
            period: 60,
            token,
            rates: vec![RateConfig {
                token: GRT,
                price: 2_000_000,
                token_liquidity: 10,
                quote_token_liquidity: 20_000_000,
            }],
        }
    }

    #[test]
    fn test_build_oracle_splits_sources() {
        let config = DaemonConfig {
            sources: vec![source(1, None), source(2, Some(GRT))],
            ..DaemonConfig::default()
        };

        let oracle = build_oracle(
            &config,
            MemoryStore::new(),
            Arc::new(ManualClock::new(1_000)),
            Arc::new(MemorySink::new()),
        )
        .expect("build");

        assert_eq!(oracle.oracles(), vec![SourceId::repeat_byte(1)]);
        assert_eq!(
            oracle.oracles_for(&GRT),
            vec![SourceId::repeat_byte(1), SourceId::repeat_byte(2)]
        );
        assert_eq!(oracle.period(), config.aggregator.period);
    }

    #[test]
    fn test_build_oracle_without_sources_fails() {
        let err = build_oracle(
            &DaemonConfig::default(),
            MemoryStore::new(),
            Arc::new(ManualClock::new(1_000)),
            Arc::new(MemorySink::new()),
        )
        .expect_err("no sources");
        assert!(matches!(
            err.downcast_ref::<OracleError>(),
            Some(OracleError::MissingSources)
        ));
    }

    #[test]
    fn test_configured_rates_reach_the_aggregate() {
        let config = DaemonConfig {
            sources: vec![source(1, None)],
            ..DaemonConfig::default()
        };
        let oracle = build_oracle(
            &config,
            MemoryStore::new(),
            Arc::new(ManualClock::new(1_000)),
            Arc::new(MemorySink::new()),
        )
        .expect("build");

        assert_eq!(oracle.update(&GRT), Ok(true));
        assert_eq!(oracle.consult(&GRT), Ok(Quote::new(2_000_000, 10, 20_000_000)));
    }
}

//! Integration test fixtures for the Meridian oracle.
//!
//! The scenarios in `tests/` drive an [`AggregatedOracle`] over fixed-rate
//! [`StubOracle`] sources with a shared [`ManualClock`] and a recording
//! [`MemorySink`], so time and events are fully deterministic.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p meridian-integration-tests
//! ```

use std::sync::Arc;

use meridian_oracle::{
    AggregatedOracle, AggregatorConfig, ManualClock, MemorySink, MemoryStore, ObservationStore,
    OracleRegistry, StubOracle, TokenSpecificOracle, UnderlyingOracle,
};
use meridian_types::{Address, Observation, QuoteToken, SourceId, TokenId, UFixed};

/// Staleness period of the aggregator under test.
pub const PERIOD: u64 = 100;

/// Maximum age used by the bounded consult scenarios.
pub const MAX_AGE: u64 = 60;

/// Simulated start time.
pub const T0: u64 = 1_700_000_000;

/// 1.0 at 18 decimals.
pub const ONE: UFixed = 1_000_000_000_000_000_000;

/// Identifier of the aggregator under test.
pub const AGGREGATOR: SourceId = SourceId::repeat_byte(0xAA);

pub const USDC: TokenId = Address([
    0xa0, 0xb8, 0x69, 0x91, 0xc6, 0x21, 0x8b, 0x36, 0xc1, 0xd1, 0x9d, 0x4a, 0x2e, 0x9e, 0xb0,
    0xce, 0x36, 0x06, 0xeb, 0x48,
]);
pub const GRT: TokenId = Address([
    0xc9, 0x44, 0xe9, 0x0c, 0x64, 0xb2, 0xc0, 0x76, 0x62, 0xa2, 0x92, 0xbe, 0x62, 0x44, 0xbd,
    0xf0, 0x5c, 0xda, 0x44, 0xa7,
]);
pub const BAT: TokenId = Address([
    0x0d, 0x87, 0x75, 0xf6, 0x48, 0x43, 0x06, 0x79, 0xa7, 0x09, 0xe9, 0x8d, 0x2b, 0x0c, 0xb6,
    0x25, 0x0d, 0x28, 0x87, 0xef,
]);

/// Decimals of the quote token and of every stub source by default.
pub const QUOTE_DECIMALS: u8 = 6;

pub fn usdc() -> QuoteToken {
    QuoteToken {
        name: "USD Coin".to_string(),
        address: USDC,
        symbol: "USDC".to_string(),
        decimals: QUOTE_DECIMALS,
    }
}

pub fn aggregator_config(decimals: u8) -> AggregatorConfig {
    AggregatorConfig {
        id: AGGREGATOR,
        quote_token: QuoteToken {
            decimals,
            ..usdc()
        },
        period: PERIOD,
    }
}

/// Id of the `n`-th general stub (1-based).
pub fn general_id(n: u8) -> SourceId {
    SourceId::repeat_byte(n)
}

/// Id of the `n`-th token-specific stub (1-based).
pub fn token_specific_id(n: u8) -> SourceId {
    SourceId::repeat_byte(0x10 + n)
}

/// An aggregator wired to stub sources.
pub struct Harness<S = MemoryStore> {
    pub clock: ManualClock,
    pub sink: Arc<MemorySink>,
    pub general: Vec<Arc<StubOracle>>,
    pub token_specific: Vec<Arc<StubOracle>>,
    pub oracle: AggregatedOracle<S>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            general: 1,
            token_specific: Vec::new(),
            decimals: QUOTE_DECIMALS,
        }
    }
}

impl<S: ObservationStore> Harness<S> {
    /// Every stub, general first.
    pub fn sources(&self) -> impl Iterator<Item = &Arc<StubOracle>> {
        self.general.iter().chain(&self.token_specific)
    }

    /// The stored aggregate for `token`.
    pub fn stored(&self, token: &TokenId) -> Observation {
        self.oracle.observation(token).unwrap_or_default()
    }
}

pub struct HarnessBuilder {
    general: u8,
    token_specific: Vec<TokenId>,
    decimals: u8,
}

impl HarnessBuilder {
    /// Number of general stubs.
    pub fn general(mut self, count: u8) -> Self {
        self.general = count;
        self
    }

    /// Add a stub dedicated to `token`.
    pub fn token_specific(mut self, token: TokenId) -> Self {
        self.token_specific.push(token);
        self
    }

    /// Quote token decimals of the aggregator.
    pub fn decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn build(self) -> meridian_oracle::Result<Harness> {
        self.build_with_store(MemoryStore::new())
    }

    pub fn build_with_store<S: ObservationStore>(
        self,
        store: S,
    ) -> meridian_oracle::Result<Harness<S>> {
        let clock = ManualClock::new(T0);
        let sink = Arc::new(MemorySink::new());
        let stub = |id| Arc::new(StubOracle::new(id, QUOTE_DECIMALS, Arc::new(clock.clone())));

        let general: Vec<Arc<StubOracle>> = (1..=self.general).map(|n| stub(general_id(n))).collect();
        let token_specific: Vec<(TokenId, Arc<StubOracle>)> = self
            .token_specific
            .iter()
            .zip(1u8..)
            .map(|(token, n)| (*token, stub(token_specific_id(n))))
            .collect();

        let registry = OracleRegistry::new(
            general
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn UnderlyingOracle>)
                .collect(),
            token_specific
                .iter()
                .map(|(token, s)| {
                    TokenSpecificOracle::new(*token, Arc::clone(s) as Arc<dyn UnderlyingOracle>)
                })
                .collect(),
        )?;
        let oracle = AggregatedOracle::new(
            aggregator_config(self.decimals),
            registry,
            store,
            Arc::new(clock.clone()),
            sink.clone(),
        )?;

        Ok(Harness {
            clock,
            sink,
            general,
            token_specific: token_specific.into_iter().map(|(_, s)| s).collect(),
            oracle,
        })
    }
}

//! # meridian-oracle
//!
//! Aggregated price and liquidity oracle.
//!
//! An [`AggregatedOracle`] fuses the quotes of several underlying oracles for
//! one (token, quote token) pair into a single observation. Each update asks
//! every applicable source to refresh itself, consults each one with the
//! aggregator's period as the maximum age, rescales the surviving quotes to
//! the aggregator's decimals and combines them with a liquidity-weighted
//! harmonic mean. Failing sources are isolated and reported as events.
//!
//! ## Modules
//!
//! - [`aggregator`]: Update orchestration and the consult surface
//! - [`aggregation`]: Harmonic mean price and liquidity sums
//! - [`registry`]: General and token-specific source lists
//! - [`staleness`]: `needs_update` and freshness checks
//! - [`decimals`]: Fixed-point rescaling between decimal precisions
//! - [`source`]: The underlying-oracle capability and failure isolation
//! - [`store`]: Latest-observation storage
//! - [`clock`]: Shared time source
//! - [`sink`]: Event delivery
//! - [`stub`]: Fixed-rate underlying oracle

pub mod aggregation;
pub mod aggregator;
pub mod clock;
pub mod decimals;
pub mod registry;
pub mod sink;
pub mod source;
pub mod staleness;
pub mod store;
pub mod stub;

pub use aggregator::{AggregatedOracle, AggregatorConfig};
pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{OracleRegistry, TokenSpecificOracle};
pub use sink::{EventSink, LogSink, MemorySink};
pub use source::{SourceFailure, UnderlyingOracle};
pub use store::{MemoryStore, ObservationStore};
pub use stub::StubOracle;

use meridian_types::{SourceId, TokenId};

/// Error types for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Neither general nor token-specific oracles were supplied.
    #[error("missing oracles: at least one underlying oracle is required")]
    MissingSources,

    /// The same oracle would be consulted twice for some token.
    #[error("duplicate oracle: {oracle}")]
    DuplicateSource {
        /// The repeated oracle.
        oracle: SourceId,
    },

    /// No observation has been recorded for the token.
    #[error("missing observation for token {token}")]
    MissingObservation {
        /// The token that was queried.
        token: TokenId,
    },

    /// The observation is older than the caller accepts.
    #[error("rate too old for token {token}: age {age}s exceeds max age {max_age}s")]
    RateTooOld {
        /// The token that was queried.
        token: TokenId,
        /// Seconds since the observation.
        age: u64,
        /// The caller's maximum age.
        max_age: u64,
    },

    /// Too few sources produced a usable quote.
    #[error("invalid number of consultations: {valid} valid, {required} required")]
    InvalidNumConsultations {
        /// Number of valid quotes.
        valid: usize,
        /// Quorum.
        required: usize,
    },

    /// A fixed-point computation exceeded 128 bits.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// The observation store failed.
    #[error("observation store error: {0}")]
    Store(String),
}

impl OracleError {
    /// Stable identifier carried as the reason of rejection events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSources => "MissingSources",
            Self::DuplicateSource { .. } => "DuplicateSource",
            Self::MissingObservation { .. } => "MissingObservation",
            Self::RateTooOld { .. } => "RateTooOld",
            Self::InvalidNumConsultations { .. } => "InvalidNumConsultations",
            Self::Overflow(_) => "Overflow",
            Self::Store(_) => "Store",
        }
    }
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;

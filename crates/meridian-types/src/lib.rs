//! # meridian-types
//!
//! Shared domain types used across the Meridian workspace: identifiers,
//! observations, quotes and the events emitted by aggregated oracles.

pub mod address;
pub mod events;
pub mod observation;

pub use address::Address;
pub use events::OracleEvent;
pub use observation::{Observation, Quote, QuoteToken};

/// Unsigned fixed-point amount (prices and liquidities).
pub type UFixed = u128;

/// Token identifier.
pub type TokenId = Address;

/// Identifier of an oracle (underlying or aggregated).
pub type SourceId = Address;

/// Unix timestamp in seconds. Zero means "no observation".
pub type Timestamp = u64;

/// Largest decimal exponent whose power of ten fits in a [`UFixed`].
pub const MAX_UFIXED_DECIMALS: u32 = 38;

/// Error types for parsing shared types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The address string is not 20 bytes of hex.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Convenience result type for shared-type parsing.
pub type Result<T> = std::result::Result<T, TypesError>;

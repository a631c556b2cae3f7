//! The capability every underlying oracle provides.
//!
//! Aggregation never lets a misbehaving source abort an update. Every call
//! into a source goes through [`isolate`], which turns both returned
//! failures and panics into a [`SourceFailure`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use meridian_types::{Quote, SourceId, TokenId};

use crate::OracleError;

/// Why a call into a source failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    /// A human-readable reason.
    Reason(String),
    /// Opaque failure data without a reason.
    Raw(Vec<u8>),
}

impl From<OracleError> for SourceFailure {
    fn from(err: OracleError) -> Self {
        SourceFailure::Reason(err.to_string())
    }
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFailure::Reason(reason) => f.write_str(reason),
            SourceFailure::Raw(data) => write!(f, "0x{}", hex::encode(data)),
        }
    }
}

/// An oracle that can be refreshed and consulted per token.
pub trait UnderlyingOracle: Send + Sync {
    /// Identifier used for duplicate detection and event attribution.
    fn id(&self) -> SourceId;

    /// Decimals of the prices and quote-token liquidities this oracle reports.
    fn quote_token_decimals(&self) -> u8;

    /// Whether the oracle's observation for `token` should be refreshed.
    fn needs_update(&self, token: &TokenId) -> Result<bool, SourceFailure>;

    /// Refresh the observation for `token`. Returns whether anything changed.
    fn update(&self, token: &TokenId) -> Result<bool, SourceFailure>;

    /// Latest quote for `token`, no older than `max_age` seconds.
    fn consult(&self, token: &TokenId, max_age: u64) -> Result<Quote, SourceFailure>;
}

/// Run `call`, converting a panic into [`SourceFailure`].
///
/// A panic with a string payload becomes [`SourceFailure::Reason`]; any
/// other payload becomes an empty [`SourceFailure::Raw`].
pub fn isolate<T>(call: impl FnOnce() -> Result<T, SourceFailure>) -> Result<T, SourceFailure> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| Err(panic_failure(payload)))
}

fn panic_failure(payload: Box<dyn Any + Send>) -> SourceFailure {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        SourceFailure::Reason((*msg).to_string())
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        SourceFailure::Reason(msg.clone())
    } else {
        SourceFailure::Raw(Vec::new())
    }
}

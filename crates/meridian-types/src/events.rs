//! Events emitted by aggregated oracles.
//!
//! Every update reports its outcome through these events: one `Updated`
//! per committed aggregate, and one error event per failing source or
//! rejected aggregation.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as, DisplayFromStr};

use crate::{SourceId, Timestamp, TokenId, UFixed};

/// An oracle event.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OracleEvent {
    /// A new aggregate observation was committed.
    Updated {
        token: TokenId,
        quote_token: TokenId,
        timestamp: Timestamp,
        #[serde_as(as = "DisplayFromStr")]
        price: UFixed,
        #[serde_as(as = "DisplayFromStr")]
        token_liquidity: UFixed,
        #[serde_as(as = "DisplayFromStr")]
        quote_token_liquidity: UFixed,
    },
    /// A source's update failed without a readable reason.
    UpdateError {
        oracle: SourceId,
        token: TokenId,
        #[serde_as(as = "Hex")]
        data: Vec<u8>,
    },
    /// A source's update failed, or the aggregate was rejected when
    /// `oracle` is the aggregator itself.
    UpdateErrorWithReason {
        oracle: SourceId,
        token: TokenId,
        reason: String,
    },
    /// A source's consultation failed without a readable reason.
    ConsultError {
        oracle: SourceId,
        token: TokenId,
        #[serde_as(as = "Hex")]
        data: Vec<u8>,
    },
    /// A source's consultation failed.
    ConsultErrorWithReason {
        oracle: SourceId,
        token: TokenId,
        reason: String,
    },
}

impl OracleEvent {
    /// Short event name, e.g. `"Updated"`.
    pub fn name(&self) -> &'static str {
        match self {
            OracleEvent::Updated { .. } => "Updated",
            OracleEvent::UpdateError { .. } => "UpdateError",
            OracleEvent::UpdateErrorWithReason { .. } => "UpdateErrorWithReason",
            OracleEvent::ConsultError { .. } => "ConsultError",
            OracleEvent::ConsultErrorWithReason { .. } => "ConsultErrorWithReason",
        }
    }

    /// The token the event concerns.
    pub fn token(&self) -> TokenId {
        match self {
            OracleEvent::Updated { token, .. }
            | OracleEvent::UpdateError { token, .. }
            | OracleEvent::UpdateErrorWithReason { token, .. }
            | OracleEvent::ConsultError { token, .. }
            | OracleEvent::ConsultErrorWithReason { token, .. } => *token,
        }
    }

    /// Whether this event reports a failure.
    pub fn is_error(&self) -> bool {
        !matches!(self, OracleEvent::Updated { .. })
    }
}

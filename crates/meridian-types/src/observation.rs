//! Observation and quote records.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Timestamp, TokenId, UFixed};

/// The latest observation an oracle holds for one token.
///
/// A `timestamp` of zero marks the absence of an observation.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    #[serde_as(as = "DisplayFromStr")]
    pub price: UFixed,
    #[serde_as(as = "DisplayFromStr")]
    pub token_liquidity: UFixed,
    #[serde_as(as = "DisplayFromStr")]
    pub quote_token_liquidity: UFixed,
    pub timestamp: Timestamp,
}

impl Observation {
    pub fn new(
        price: UFixed,
        token_liquidity: UFixed,
        quote_token_liquidity: UFixed,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            price,
            token_liquidity,
            quote_token_liquidity,
            timestamp,
        }
    }

    /// Whether this is the "no observation" sentinel.
    pub fn is_empty(&self) -> bool {
        self.timestamp == 0
    }

    /// The observation's values without its timestamp.
    pub fn quote(&self) -> Quote {
        Quote {
            price: self.price,
            token_liquidity: self.token_liquidity,
            quote_token_liquidity: self.quote_token_liquidity,
        }
    }
}

/// Price and liquidities as returned by a consultation.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde_as(as = "DisplayFromStr")]
    pub price: UFixed,
    #[serde_as(as = "DisplayFromStr")]
    pub token_liquidity: UFixed,
    #[serde_as(as = "DisplayFromStr")]
    pub quote_token_liquidity: UFixed,
}

impl Quote {
    pub fn new(price: UFixed, token_liquidity: UFixed, quote_token_liquidity: UFixed) -> Self {
        Self {
            price,
            token_liquidity,
            quote_token_liquidity,
        }
    }

    /// Stamp this quote into an observation.
    pub fn observed_at(self, timestamp: Timestamp) -> Observation {
        Observation::new(
            self.price,
            self.token_liquidity,
            self.quote_token_liquidity,
            timestamp,
        )
    }
}

/// Metadata of the token every price is denominated in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteToken {
    pub name: String,
    pub address: TokenId,
    pub symbol: String,
    /// Fixed-point scale of prices and quote-token liquidities.
    pub decimals: u8,
}

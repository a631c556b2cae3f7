//! Fusion of per-source quotes into one aggregate.
//!
//! The aggregate price is the harmonic mean of the source prices weighted by
//! each source's quote-token liquidity:
//!
//! ```text
//! price = sum(L_i) / sum(L_i / P_i)
//! ```
//!
//! where `L_i` is the quote-token liquidity and `P_i` the price of source
//! `i`. Thin sources therefore carry little weight. Both liquidities of the
//! aggregate are plain sums.
//!
//! The weighted sum is accumulated in 256 bits with every `L_i` shifted left
//! by [`SCALE_BITS`] before its division, and the shifted `sum(L_i)` is
//! divided by it once at the end. A term never truncates to zero, so a
//! source whose liquidity is below its price still counts, and a single
//! source's price comes back unchanged.

use meridian_types::{Quote, UFixed};
use primitive_types::U256;

use crate::{OracleError, Result};

/// Minimum number of valid quotes required to produce an aggregate.
pub const MIN_CONSULTATIONS: usize = 1;

/// Left shift applied to each liquidity before dividing by its price.
pub const SCALE_BITS: usize = 128;

/// Whether a quote may take part in aggregation.
///
/// Requires a non-zero price and a non-zero quote-token liquidity. Token
/// liquidity may be zero.
pub fn is_valid(quote: &Quote) -> bool {
    quote.price != 0 && quote.quote_token_liquidity != 0
}

/// Aggregate the valid quotes among `quotes`. Invalid quotes are skipped.
///
/// # Errors
///
/// - [`OracleError::InvalidNumConsultations`] if fewer than [`MIN_CONSULTATIONS`] quotes are valid
/// - [`OracleError::Overflow`] if a liquidity sum or the price exceeds [`UFixed::MAX`]
///
/// # Examples
///
/// ```
/// use meridian_oracle::aggregation::aggregate;
/// use meridian_types::Quote;
///
/// let agg = aggregate(&[Quote::new(100, 5, 1_000), Quote::new(200, 5, 2_000)]).unwrap();
/// // (1000 + 2000) / (1000/100 + 2000/200) = 3000 / 20
/// assert_eq!(agg.price, 150);
/// assert_eq!(agg.token_liquidity, 10);
/// assert_eq!(agg.quote_token_liquidity, 3_000);
/// ```
pub fn aggregate(quotes: &[Quote]) -> Result<Quote> {
    let mut valid = 0usize;
    let mut token_liquidity: UFixed = 0;
    let mut quote_token_liquidity: UFixed = 0;
    let mut denominator = U256::zero();

    for quote in quotes.iter().filter(|q| is_valid(q)) {
        valid += 1;
        token_liquidity = token_liquidity
            .checked_add(quote.token_liquidity)
            .ok_or(OracleError::Overflow("token liquidity sum"))?;
        quote_token_liquidity = quote_token_liquidity
            .checked_add(quote.quote_token_liquidity)
            .ok_or(OracleError::Overflow("quote token liquidity sum"))?;
        // Each term is at most L_i << 128, so the sum stays below 2^256.
        let weight = U256::from(quote.quote_token_liquidity) << SCALE_BITS;
        denominator += weight / U256::from(quote.price);
    }

    if valid < MIN_CONSULTATIONS {
        return Err(OracleError::InvalidNumConsultations {
            valid,
            required: MIN_CONSULTATIONS,
        });
    }

    // Non-zero: every term is at least (L_i << 128) / UFixed::MAX.
    let price = (U256::from(quote_token_liquidity) << SCALE_BITS) / denominator;
    let price = UFixed::try_from(price).map_err(|_| OracleError::Overflow("aggregate price"))?;

    Ok(Quote {
        price,
        token_liquidity,
        quote_token_liquidity,
    })
}

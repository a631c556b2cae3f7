//! Rescaling of fixed-point values between decimal precisions.
//!
//! ```text
//! to > from:  value * 10^(to - from)
//! to < from:  value / 10^(from - to)   (truncating)
//! ```
//!
//! Scaling down is lossy for values that are not multiples of the divisor.

use meridian_types::{Quote, UFixed, MAX_UFIXED_DECIMALS};

use crate::{OracleError, Result};

/// Rescale `value` from `from_decimals` to `to_decimals`.
///
/// # Errors
///
/// - [`OracleError::Overflow`] if scaling up exceeds [`UFixed::MAX`]
///
/// # Examples
///
/// ```
/// use meridian_oracle::decimals::normalize;
///
/// assert_eq!(normalize(1_000_000, 6, 8).unwrap(), 100_000_000);
/// assert_eq!(normalize(1_234_567, 6, 4).unwrap(), 12_345);
/// ```
pub fn normalize(value: UFixed, from_decimals: u8, to_decimals: u8) -> Result<UFixed> {
    if to_decimals > from_decimals {
        let factor = pow10(u32::from(to_decimals - from_decimals))
            .ok_or(OracleError::Overflow("decimal normalization"))?;
        value
            .checked_mul(factor)
            .ok_or(OracleError::Overflow("decimal normalization"))
    } else if to_decimals < from_decimals {
        // A divisor beyond 10^38 exceeds every representable value.
        Ok(pow10(u32::from(from_decimals - to_decimals)).map_or(0, |factor| value / factor))
    } else {
        Ok(value)
    }
}

/// Rescale the price and quote-token liquidity of a quote.
///
/// Token liquidity is denominated in the base token and is left untouched.
pub fn normalize_quote(quote: Quote, from_decimals: u8, to_decimals: u8) -> Result<Quote> {
    Ok(Quote {
        price: normalize(quote.price, from_decimals, to_decimals)?,
        token_liquidity: quote.token_liquidity,
        quote_token_liquidity: normalize(quote.quote_token_liquidity, from_decimals, to_decimals)?,
    })
}

fn pow10(exp: u32) -> Option<UFixed> {
    if exp > MAX_UFIXED_DECIMALS {
        return None;
    }
    10u128.checked_pow(exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_E18: UFixed = 1_000_000_000_000_000_000;

    #[test]
    fn test_identity() {
        assert_eq!(normalize(ONE_E18, 18, 18).expect("identity"), ONE_E18);
        assert_eq!(normalize(0, 6, 6).expect("identity"), 0);
    }

    #[test]
    fn test_scale_up_two_decimals() {
        assert_eq!(normalize(ONE_E18, 6, 8).expect("up"), ONE_E18 * 100);
    }

    #[test]
    fn test_scale_down_two_decimals() {
        assert_eq!(normalize(ONE_E18, 6, 4).expect("down"), ONE_E18 / 100);
    }

    #[test]
    fn test_scale_down_truncates() {
        assert_eq!(normalize(199, 2, 0).expect("down"), 1);
        assert_eq!(normalize(99, 2, 0).expect("down"), 0);
    }

    #[test]
    fn test_roundtrip_multiples() {
        for k in [1u8, 2, 6, 12] {
            let value = 42 * 10u128.pow(u32::from(k));
            let up = normalize(value, 6, 6 + k).expect("up");
            let back = normalize(up, 6 + k, 6).expect("down");
            assert_eq!(back, value);

            let down = normalize(value, 6 + k, 6).expect("down");
            let restored = normalize(down, 6, 6 + k).expect("up");
            assert_eq!(restored, value);
        }
    }

    #[test]
    fn test_roundtrip_lossy_for_non_multiples() {
        let down = normalize(12_345, 4, 2).expect("down");
        assert_eq!(normalize(down, 2, 4).expect("up"), 12_300);
    }

    #[test]
    fn test_scale_up_overflow() {
        let err = normalize(UFixed::MAX, 0, 1).unwrap_err();
        assert!(matches!(err, OracleError::Overflow(_)));

        let err = normalize(1, 0, 39).unwrap_err();
        assert!(matches!(err, OracleError::Overflow(_)));
    }

    #[test]
    fn test_huge_scale_down_is_zero() {
        assert_eq!(normalize(UFixed::MAX, 200, 0).expect("down"), 0);
        assert_eq!(normalize(UFixed::MAX, 38, 0).expect("down"), UFixed::MAX / 10u128.pow(38));
    }

    #[test]
    fn test_normalize_quote_leaves_token_liquidity() {
        let quote = Quote::new(ONE_E18, ONE_E18, ONE_E18);
        let scaled = normalize_quote(quote, 6, 8).expect("scale");
        assert_eq!(scaled.price, ONE_E18 * 100);
        assert_eq!(scaled.token_liquidity, ONE_E18);
        assert_eq!(scaled.quote_token_liquidity, ONE_E18 * 100);
    }
}

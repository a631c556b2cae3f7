//! 20-byte identifiers for tokens and oracles.
//!
//! Addresses render as `0x`-prefixed lowercase hex and parse with or
//! without the prefix.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{Result, TypesError};

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte identifier.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Build an address whose every byte is `byte`. Handy for fixtures.
    pub const fn repeat_byte(byte: u8) -> Self {
        Address([byte; ADDRESS_LEN])
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| TypesError::InvalidAddress(format!("{s}: {e}")))?;
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| TypesError::InvalidAddress(format!("{s}: {} bytes", v.len())))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

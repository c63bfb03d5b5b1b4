//! Fixed-precision decimals used by host-chain coin amounts.

use crate::U256;
use core::fmt;

/// Number of fractional digits carried by a [`Dec`].
pub const PRECISION: u32 = 18;

/// `10^PRECISION`, the scaling factor between a decimal and its raw integer.
const UNIT: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Non-negative decimal with [`PRECISION`] fractional digits, stored as a
/// scaled 256-bit integer.
///
/// The EVM balance maps onto coin amounts without rescaling: a balance `b`
/// becomes the decimal `b * 10^-18`, whose raw representation is `b` itself.
/// Reading the raw integer back therefore reconstructs the balance bit-exact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dec(U256);

impl Dec {
    /// The zero amount.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Builds a decimal from an integer already scaled by `10^PRECISION`.
    pub const fn from_scaled(int: U256) -> Self {
        Self(int)
    }

    /// Builds the decimal representing the whole number `int`.
    ///
    /// # Panics
    ///
    /// Panics if `int * 10^PRECISION` overflows 256 bits.
    pub fn from_int(int: U256) -> Self {
        Self(int.checked_mul(UNIT).expect("decimal overflows 256 bits"))
    }

    /// Raw scaled integer backing this decimal.
    pub const fn scaled(&self) -> U256 {
        self.0
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction. `None` when the result would be negative.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl From<U256> for Dec {
    fn from(int: U256) -> Self {
        Self::from_scaled(int)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / UNIT;
        let frac = (self.0 % UNIT).to_string();
        let pad = PRECISION as usize - frac.len();
        write!(f, "{int}.")?;
        for _ in 0..pad {
            f.write_str("0")?;
        }
        f.write_str(&frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_round_trip_is_identity() {
        let raw = U256::from(123_456_789_u64);
        assert_eq!(Dec::from_scaled(raw).scaled(), raw);
    }

    #[test]
    fn display_pads_fractional_digits() {
        assert_eq!(Dec::from_scaled(U256::from(15u64) * UNIT / U256::from(10u64)).to_string(), "1.500000000000000000");
        assert_eq!(Dec::from_scaled(U256::from(100u64)).to_string(), "0.000000000000000100");
        assert_eq!(Dec::ZERO.to_string(), "0.000000000000000000");
    }

    #[test]
    fn from_int_scales_up() {
        assert_eq!(Dec::from_int(U256::from(2u64)).scaled(), U256::from(2u64) * UNIT);
    }

    #[test]
    fn checked_sub_refuses_negative_results() {
        let one = Dec::from_int(U256::from(1u64));
        let two = Dec::from_int(U256::from(2u64));
        assert_eq!(two.checked_sub(one), Some(one));
        assert_eq!(one.checked_sub(two), None);
    }
}

//! Denominated coin amounts held by host-chain accounts.

use crate::Dec;
use core::fmt;

/// A single denominated amount.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coin {
    /// Denomination of the coin.
    pub denom: String,
    /// Decimal amount of the coin.
    pub amount: Dec,
}

impl Coin {
    /// Creates a coin of the given denomination and amount.
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// A coin is valid when its denomination is well formed. Amounts are
    /// non-negative by construction.
    pub fn is_valid(&self) -> bool {
        is_valid_denom(&self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Whether `denom` is a well-formed denomination: 3 to 128 characters, an
/// ASCII letter first, then letters, digits or one of `/:._-`.
pub fn is_valid_denom(denom: &str) -> bool {
    if !(3..=128).contains(&denom.len()) {
        return false;
    }
    let mut chars = denom.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}

/// A set of coins, kept ordered by denomination with at most one coin per
/// denomination. Zero amounts are not stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// An empty coin set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Amount held in `denom`, zero when absent.
    pub fn amount_of(&self, denom: &str) -> Dec {
        match self.0.binary_search_by(|coin| coin.denom.as_str().cmp(denom)) {
            Ok(idx) => self.0[idx].amount,
            Err(_) => Dec::ZERO,
        }
    }

    /// Replaces the coin of `coin.denom` outright. A zero amount removes the
    /// denomination from the set.
    pub fn set(&mut self, coin: Coin) {
        match self.0.binary_search_by(|c| c.denom.cmp(&coin.denom)) {
            Ok(idx) => {
                if coin.amount.is_zero() {
                    self.0.remove(idx);
                } else {
                    self.0[idx] = coin;
                }
            }
            Err(idx) => {
                if !coin.amount.is_zero() {
                    self.0.insert(idx, coin);
                }
            }
        }
    }

    /// Whether no coins are held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates coins in denomination order.
    pub fn iter(&self) -> core::slice::Iter<'_, Coin> {
        self.0.iter()
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<I: IntoIterator<Item = Coin>>(iter: I) -> Self {
        let mut coins = Self::new();
        for coin in iter {
            coins.set(coin);
        }
        coins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U256;

    #[test]
    fn denom_validation() {
        assert!(is_valid_denom("aphoton"));
        assert!(is_valid_denom("ibc/27394FB092D2ECCD56123C74F36E4C1F"));
        assert!(!is_valid_denom("ab"));
        assert!(!is_valid_denom("1denom"));
        assert!(!is_valid_denom("bad denom"));
        assert!(!is_valid_denom(""));
    }

    #[test]
    fn set_overwrites_existing_amount() {
        let mut coins = Coins::new();
        coins.set(Coin::new("aphoton", Dec::from_scaled(U256::from(5u64))));
        coins.set(Coin::new("aphoton", Dec::from_scaled(U256::from(7u64))));

        assert_eq!(coins.amount_of("aphoton").scaled(), U256::from(7u64));
        assert_eq!(coins.iter().count(), 1);
    }

    #[test]
    fn set_zero_removes_denomination() {
        let mut coins = Coins::new();
        coins.set(Coin::new("aphoton", Dec::from_scaled(U256::from(5u64))));
        coins.set(Coin::new("aphoton", Dec::ZERO));

        assert!(coins.is_empty());
        assert!(coins.amount_of("aphoton").is_zero());
    }

    #[test]
    fn coins_stay_sorted_by_denom() {
        let mut coins = Coins::new();
        coins.set(Coin::new("uosmo", Dec::from_scaled(U256::from(1u64))));
        coins.set(Coin::new("aphoton", Dec::from_scaled(U256::from(2u64))));

        let denoms: Vec<_> = coins.iter().map(|c| c.denom.as_str()).collect();
        assert_eq!(denoms, ["aphoton", "uosmo"]);
    }
}

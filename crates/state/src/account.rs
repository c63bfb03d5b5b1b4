//! The host-chain account record mirrored by the overlay.

use cosmovm_primitives::{Address, Coin, Coins, Dec, B256, KECCAK_EMPTY, U256};

/// Mirror of an external account record: an address, its coin balances, the
/// hash of its contract code and a sequence number doubling as the EVM nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
    /// Account address.
    pub address: Address,
    /// Coin balances held by the account.
    pub coins: Coins,
    /// Keccak-256 hash of the account's contract code.
    pub code_hash: B256,
    /// Sequence number, incremented per transaction; the EVM nonce.
    pub sequence: u64,
}

impl Account {
    /// Creates an empty account at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            coins: Coins::new(),
            code_hash: KECCAK_EMPTY,
            sequence: 0,
        }
    }

    /// EVM balance of the account in the given denomination.
    pub fn balance(&self, denom: &str) -> U256 {
        self.coins.amount_of(denom).scaled()
    }

    /// Replaces the coin of `denom` with the given EVM balance.
    ///
    /// The overlay balance is authoritative: the previous amount is
    /// overwritten, never accumulated. Other denominations are untouched.
    pub fn set_balance(&mut self, denom: &str, balance: U256) {
        self.coins.set(Coin::new(denom, Dec::from_scaled(balance)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_round_trips_through_coins() {
        let mut account = Account::new(Address::ZERO);
        let balance = U256::from(123_456_789_000_000_000_000u128);

        account.set_balance("aphoton", balance);
        assert_eq!(account.balance("aphoton"), balance);
        assert_eq!(account.balance("uosmo"), U256::ZERO);
    }

    #[test]
    fn set_balance_overwrites() {
        let mut account = Account::new(Address::ZERO);
        account.set_balance("aphoton", U256::from(100u64));
        account.set_balance("aphoton", U256::from(7u64));

        assert_eq!(account.balance("aphoton"), U256::from(7u64));
    }
}

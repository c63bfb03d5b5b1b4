//! Transaction logs emitted by the EVM.

use crate::{Address, Bytes, B256};

/// A log record emitted during transaction execution.
///
/// The contract fills in `address`, `topics` and `data`; the overlay stamps
/// the block and transaction metadata when the log is added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Log {
    /// Address of the emitting contract.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<B256>,
    /// Unindexed payload.
    pub data: Bytes,
    /// Hash of the transaction that emitted the log.
    pub tx_hash: B256,
    /// Index of the transaction inside the block.
    pub tx_index: u64,
    /// Hash of the containing block.
    pub block_hash: B256,
    /// Running index of the log inside the transaction.
    pub index: u64,
}

impl Log {
    /// Creates a log record with zeroed transaction metadata.
    pub fn new(address: Address, topics: Vec<B256>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
            ..Default::default()
        }
    }
}

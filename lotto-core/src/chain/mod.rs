//! In-process host chain.
//!
//! Stands in for the execution environment the lottery contracts run on:
//! per-account balances, native value transfer, a block counter and an
//! ordered notification log.

pub mod events;

pub use events::{EventRecord, Notification, NotificationKind};

use crate::error::{CoreError, Result};
use crate::types::{Address, H256};
use bitcoin::Amount;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const BLOCK_INTERVAL_SECS: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    pub hash: H256,
    pub timestamp: DateTime<Utc>,
}

/// Caller identity plus the value attached to a payable call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Msg {
    pub sender: Address,
    pub value: Amount,
}

impl Msg {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            value: Amount::ZERO,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Chain {
    genesis: DateTime<Utc>,
    block: BlockInfo,
    balances: HashMap<Address, Amount>,
    log: Vec<EventRecord>,
    nonce: u64,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::with_genesis(Utc::now())
    }

    pub fn with_genesis(genesis: DateTime<Utc>) -> Self {
        let hash = H256::new(Sha256::digest(genesis.timestamp().to_be_bytes()).into());
        Self {
            genesis,
            block: BlockInfo {
                number: 0,
                hash,
                timestamp: genesis,
            },
            balances: HashMap::new(),
            log: Vec::new(),
            nonce: 0,
        }
    }

    pub fn block(&self) -> &BlockInfo {
        &self.block
    }

    pub fn block_number(&self) -> u64 {
        self.block.number
    }

    pub fn advance_blocks(&mut self, count: u64) {
        for _ in 0..count {
            let number = self.block.number + 1;
            let mut hasher = Sha256::new();
            hasher.update(self.block.hash.as_bytes());
            hasher.update(number.to_be_bytes());
            self.block = BlockInfo {
                number,
                hash: H256::new(hasher.finalize().into()),
                timestamp: self.genesis + Duration::seconds(BLOCK_INTERVAL_SECS * number as i64),
            };
        }
        tracing::debug!("Advanced to block {}", self.block.number);
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    /// Mint value into an account
    pub fn fund(&mut self, account: Address, amount: Amount) -> Result<()> {
        let balance = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or_else(|| CoreError::overflow(format!("balance of {}", account)))?;
        self.balances.insert(account, balance);
        Ok(())
    }

    /// Moves value between accounts; either fully applies or leaves both balances untouched.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        if amount == Amount::ZERO {
            return Ok(());
        }

        let available = self.balance_of(&from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(CoreError::InsufficientFunds {
                need: amount.to_sat(),
                available: available.to_sat(),
            })?;

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| CoreError::overflow(format!("balance of {}", to)))?;

        self.balances.insert(from, remaining);
        self.balances.insert(to, credited);

        tracing::debug!("Transferred {} sats from {} to {}", amount.to_sat(), from, to);
        Ok(())
    }

    /// Moves the value attached to `msg` into `to`
    pub fn receive(&mut self, msg: &Msg, to: Address) -> Result<()> {
        self.transfer(msg.sender, to, msg.value)
    }

    /// Allocates a fresh contract address for a deployment by `deployer`
    pub fn allocate_address(&mut self, deployer: &Address) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(deployer.as_bytes());
        hasher.update(self.nonce.to_be_bytes());
        self.nonce += 1;

        let digest = hasher.finalize();
        let mut bytes = [0u8; Address::LEN];
        bytes.copy_from_slice(&digest[..Address::LEN]);
        Address::new(bytes)
    }

    pub fn emit(&mut self, source: Address, notification: Notification) {
        let record = EventRecord {
            block: self.block.number,
            sequence: self.log.len() as u64,
            source,
            notification,
        };
        tracing::debug!(
            "Block {} #{}: {} from {}",
            record.block,
            record.sequence,
            record.kind(),
            source
        );
        self.log.push(record);
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.log
    }

    pub fn events_at(&self, block: u64) -> impl Iterator<Item = &EventRecord> + '_ {
        self.log.iter().filter(move |record| record.block == block)
    }

    pub fn events_of(&self, source: Address) -> impl Iterator<Item = &EventRecord> + '_ {
        self.log.iter().filter(move |record| record.source == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pick;

    fn sats(n: u64) -> Amount {
        Amount::from_sat(n)
    }

    #[test]
    fn test_transfer_moves_value() {
        let mut chain = Chain::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        chain.fund(alice, sats(1_000)).unwrap();

        chain.transfer(alice, bob, sats(400)).unwrap();

        assert_eq!(chain.balance_of(&alice), sats(600));
        assert_eq!(chain.balance_of(&bob), sats(400));
    }

    #[test]
    fn test_failed_transfer_leaves_balances() {
        let mut chain = Chain::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        chain.fund(alice, sats(100)).unwrap();

        let err = chain.transfer(alice, bob, sats(101)).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientFunds {
                need: 101,
                available: 100
            }
        ));
        assert_eq!(chain.balance_of(&alice), sats(100));
        assert_eq!(chain.balance_of(&bob), Amount::ZERO);
    }

    #[test]
    fn test_receive_uses_attached_value() {
        let mut chain = Chain::new();
        let alice = Address::from_label("alice");
        let contract = chain.allocate_address(&alice);
        chain.fund(alice, sats(50)).unwrap();

        chain
            .receive(&Msg::new(alice).with_value(sats(20)), contract)
            .unwrap();

        assert_eq!(chain.balance_of(&contract), sats(20));
    }

    #[test]
    fn test_blocks_advance_with_fresh_hashes() {
        let mut chain = Chain::new();
        let first = *chain.block();

        chain.advance_blocks(3);

        assert_eq!(chain.block_number(), 3);
        assert_ne!(chain.block().hash, first.hash);
        assert_eq!(
            chain.block().timestamp - first.timestamp,
            Duration::seconds(45)
        );
    }

    #[test]
    fn test_allocated_addresses_are_unique() {
        let mut chain = Chain::new();
        let deployer = Address::from_label("deployer");
        let a = chain.allocate_address(&deployer);
        let b = chain.allocate_address(&deployer);
        assert_ne!(a, b);
    }

    #[test]
    fn test_events_are_ordered_and_filterable() {
        let mut chain = Chain::new();
        let round = Address::from_label("round");
        let holder = Address::from_label("holder");

        chain.emit(
            round,
            Notification::Draw {
                pick: Pick::new(1),
                holder,
            },
        );
        chain.advance_blocks(1);
        chain.emit(
            round,
            Notification::Draw {
                pick: Pick::new(2),
                holder,
            },
        );

        assert_eq!(chain.events().len(), 2);
        assert_eq!(chain.events()[1].sequence, 1);
        assert_eq!(chain.events_at(0).count(), 1);
        assert_eq!(chain.events_at(1).count(), 1);
        assert_eq!(chain.events_of(round).count(), 2);
        assert_eq!(chain.events_of(holder).count(), 0);
    }
}

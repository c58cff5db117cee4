//! Core primitives for the commit-reveal lottery
//!
//! Value and identity types, the in-process host chain that the lottery
//! contracts execute against, configuration, and SQLite persistence of
//! notifications and finalized rounds.

pub mod chain;
pub mod config;
pub mod error;
pub mod storage;
pub mod types;

pub use chain::{BlockInfo, Chain, EventRecord, Msg, Notification, NotificationKind};
pub use config::LottoConfig;
pub use error::{CoreError, Result};
pub use storage::{EventStore, RoundStore, Storage};
pub use types::{Address, Pick, RoundSummary, Salt, H256, PICK_MASK};

pub use ::bitcoin::Amount;

use crate::error::{CoreError, Result};
use bitcoin::Amount;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Every digit of a valid pick keeps its high bit clear.
pub const PICK_MASK: u32 = 0x7f7f_7f7f;

macro_rules! hex_bytes_type {
    ($name:ident, $len:expr) => {
        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let raw = hex::decode(digits).map_err(|e| {
                    CoreError::invalid_input(format!("{} is not valid hex: {}", stringify!($name), e))
                })?;
                let bytes: [u8; $len] = raw.try_into().map_err(|raw: Vec<u8>| {
                    CoreError::invalid_input(format!(
                        "{} must be {} bytes, got {}",
                        stringify!($name),
                        $len,
                        raw.len()
                    ))
                })?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Account or contract address on the host chain
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

hex_bytes_type!(Address, 20);

impl Address {
    /// Deterministic address for a human-readable account label
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }
}

/// 32-byte digest used for commitments and block hashes
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct H256([u8; 32]);

hex_bytes_type!(H256, 32);

/// The curator's committed secret
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt([u8; 32]);

hex_bytes_type!(Salt, 32);

/// A four-digit wager, one byte per digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pick(u32);

impl Pick {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 & !PICK_MASK == 0
    }

    /// Builds a valid pick from arbitrary bytes by clearing each digit's high bit.
    pub fn from_bytes_masked(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes) & PICK_MASK)
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl FromStr for Pick {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        u32::from_str_radix(digits, 16)
            .map(Pick)
            .map_err(|e| CoreError::invalid_input(format!("Invalid pick '{}': {}", s, e)))
    }
}

/// Outcome of a finalized round, as recorded in the registry history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub address: Address,
    pub version: String,
    pub winning_pick: Option<Pick>,
    pub total_wagered: Amount,
    pub prize_pool: Amount,
    pub owner_fee: Amount,
    pub prize_value: Amount,
    pub winners: Vec<Address>,
    pub ticket_count: u64,
}

impl RoundSummary {
    pub fn has_winner(&self) -> bool {
        !self.winners.is_empty()
    }
}

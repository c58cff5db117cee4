use lotto_core::{Address, BlockInfo, Pick};
use sha2::{Digest, Sha256};
use std::fmt;

/// Seed for randomized wagers.
///
/// Implementations are best-effort and not cryptographically secure; the
/// winning pick comes from the commit-reveal, never from this source.
pub trait EntropySource: fmt::Debug + Send + Sync {
    fn seed(&self, block: &BlockInfo, holder: &Address, nonce: u64) -> [u8; 32];

    fn pick(&self, block: &BlockInfo, holder: &Address, nonce: u64) -> Pick {
        let seed = self.seed(block, holder, nonce);
        Pick::from_bytes_masked([seed[0], seed[1], seed[2], seed[3]])
    }
}

/// Hashes block-level values; whoever produces blocks can bias it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockEntropy;

impl EntropySource for BlockEntropy {
    fn seed(&self, block: &BlockInfo, holder: &Address, nonce: u64) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(block.hash.as_bytes());
        hasher.update(block.number.to_be_bytes());
        hasher.update(block.timestamp.timestamp().to_be_bytes());
        hasher.update(holder.as_bytes());
        hasher.update(nonce.to_be_bytes());
        hasher.finalize().into()
    }
}

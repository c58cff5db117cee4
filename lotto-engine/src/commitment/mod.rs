pub mod scheme;

pub use scheme::{CommitmentPair, CommitmentScheme, Reveal, SaltChainScheme};

use lotto_core::{Pick, Salt, H256};
use rand::RngCore;
use sha3::{Digest, Keccak256};
use std::fmt;

pub fn keccak256(data: &[u8]) -> H256 {
    H256::new(Keccak256::digest(data).into())
}

/// Salt for a human-chosen secret phrase
pub fn salt_from_phrase(phrase: &str) -> Salt {
    Salt::new(Keccak256::digest(phrase.as_bytes()).into())
}

/// Rnd salt for a new round
pub fn generate_salt() -> Salt {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Salt::new(bytes)
}

/// Digest after `steps` applications of keccak256; step 0 is the salt itself.
pub fn chain_step(salt: &Salt, steps: u8) -> H256 {
    let mut digest = H256::new(*salt.as_bytes());
    for _ in 0..steps {
        digest = keccak256(digest.as_bytes());
    }
    digest
}

pub fn salt_hash(salt: &Salt, iterations: u8) -> H256 {
    chain_step(salt, iterations)
}

pub fn salt_n_hash(salt: &Salt, iterations: u8) -> H256 {
    let mut packed = [0u8; 65];
    packed[..32].copy_from_slice(salt.as_bytes());
    packed[32] = iterations;
    packed[33..].copy_from_slice(salt.as_bytes());
    keccak256(&packed)
}

/// Zero iterations would make the commitment the salt itself, so it never verifies.
pub fn verify_salt_chain(salt: &Salt, iterations: u8, salt_hash: &H256) -> bool {
    iterations > 0 && chain_step(salt, iterations) == *salt_hash
}

pub fn verify_iteration_binding(salt: &Salt, iterations: u8, salt_n_hash: &H256) -> bool {
    self::salt_n_hash(salt, iterations) == *salt_n_hash
}

/// Maps a verified reveal to the pick it determines
pub trait PickDerivation: fmt::Debug + Send + Sync {
    fn derive(&self, reveal: &Reveal) -> Pick;
}

/// Takes the winning digits from the preimage of the committed salt hash,
/// which stays unknown until the reveal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreimageDerivation;

impl PickDerivation for PreimageDerivation {
    fn derive(&self, reveal: &Reveal) -> Pick {
        let preimage = chain_step(&reveal.salt, reveal.iterations.saturating_sub(1));
        let bytes = preimage.as_bytes();
        Pick::from_bytes_masked([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Rehearsal rounds: the winning pick is fixed up front
#[derive(Debug, Clone, Copy)]
pub struct FixedDerivation(pub Pick);

impl PickDerivation for FixedDerivation {
    fn derive(&self, _reveal: &Reveal) -> Pick {
        self.0
    }
}

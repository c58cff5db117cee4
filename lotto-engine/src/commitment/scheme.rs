use super::{salt_hash, salt_n_hash, verify_iteration_binding, verify_salt_chain};
use lotto_core::{Salt, H256};
use serde::{Deserialize, Serialize};

/// Trait for commitment schemes
pub trait CommitmentScheme {
    type Secret;
    type Commitment;

    fn commit(secret: &Self::Secret) -> Self::Commitment;
    fn verify(commitment: &Self::Commitment, secret: &Self::Secret) -> bool;
}

/// What the curator discloses once wagering has closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    pub salt: Salt,
    pub iterations: u8,
}

impl Reveal {
    pub fn new(salt: Salt, iterations: u8) -> Self {
        Self { salt, iterations }
    }

    pub fn from_phrase(phrase: &str, iterations: u8) -> Self {
        Self::new(super::salt_from_phrase(phrase), iterations)
    }
}

/// The two digests a round is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentPair {
    /// `keccak256` applied `iterations` times to the salt
    pub salt_hash: H256,
    /// `keccak256(salt || iterations || salt)`
    pub salt_n_hash: H256,
}

impl CommitmentPair {
    pub fn new(salt_hash: H256, salt_n_hash: H256) -> Self {
        Self {
            salt_hash,
            salt_n_hash,
        }
    }

    pub fn for_reveal(reveal: &Reveal) -> Self {
        SaltChainScheme::commit(reveal)
    }

    pub fn verify(&self, reveal: &Reveal) -> bool {
        SaltChainScheme::verify(self, reveal)
    }
}

/// Hash-chain commitment binding both the salt and the chain length
pub struct SaltChainScheme;

impl CommitmentScheme for SaltChainScheme {
    type Secret = Reveal;
    type Commitment = CommitmentPair;

    fn commit(secret: &Reveal) -> CommitmentPair {
        CommitmentPair {
            salt_hash: salt_hash(&secret.salt, secret.iterations),
            salt_n_hash: salt_n_hash(&secret.salt, secret.iterations),
        }
    }

    fn verify(commitment: &CommitmentPair, secret: &Reveal) -> bool {
        verify_salt_chain(&secret.salt, secret.iterations, &commitment.salt_hash)
            && verify_iteration_binding(&secret.salt, secret.iterations, &commitment.salt_n_hash)
    }
}

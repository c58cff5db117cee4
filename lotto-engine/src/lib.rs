//! Commit-reveal lottery engine
//!
//! The curator commits to a secret salt and hash-chain length before a round
//! opens. Holders buy tickets on four-digit picks until the closing block;
//! the curator then reveals the salt, which fixes the winning pick, and the
//! pooled wagers are split between winners and the curator's fee.

pub mod commitment;
pub mod entropy;
pub mod error;
pub mod factory;
pub mod logic;
pub mod registry;
pub mod round;
pub mod tickets;

pub use commitment::{
    CommitmentPair, CommitmentScheme, FixedDerivation, PickDerivation, PreimageDerivation, Reveal,
    SaltChainScheme,
};
pub use entropy::{BlockEntropy, EntropySource};
pub use error::{LotteryError, Result};
pub use factory::RoundFactory;
pub use logic::{GameLogic, LotteryGameLogic};
pub use registry::Lotto;
pub use round::{LotteryRound, RoundParams, RoundState};
pub use tickets::TicketLedger;

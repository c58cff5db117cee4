use lotto_core::{Address, Pick};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LotteryError>;

#[derive(Error, Debug)]
pub enum LotteryError {
    #[error("Lotto core error: {0}")]
    Core(#[from] lotto_core::CoreError),

    #[error("Invalid round state: {0}")]
    InvalidState(String),

    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),

    #[error("Invalid pick {0}: every digit must be below 128")]
    InvalidPick(Pick),

    #[error("Invalid payment: ticket costs {expected} sats, got {got} sats")]
    InvalidPayment { expected: u64, got: u64 },

    #[error("Iteration count {got} outside 1..={max}")]
    IterationsOutOfRange { got: u8, max: u8 },

    #[error("Revealed salt does not match the round commitments")]
    CommitmentMismatch,

    #[error("Claimed winning pick {claimed} does not match derived pick {derived}")]
    DerivationMismatch { claimed: Pick, derived: Pick },

    #[error("A round is already in progress")]
    RoundInProgress,

    #[error("No round is in progress")]
    NoActiveRound,

    #[error("No round factory configured")]
    NoFactory,

    #[error("Game logic upgrade not allowed")]
    UpgradeNotAllowed,

    #[error("Force close is disabled for this round")]
    ForceCloseDisabled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LotteryError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

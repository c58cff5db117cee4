use crate::commitment::CommitmentPair;
use crate::round::{LotteryRound, RoundParams};
use crate::{LotteryError, Result};
use lotto_core::{Address, Chain, CoreError, Msg, Notification};

/// Deploys rounds sharing one set of rules and a protocol version
#[derive(Debug, Clone)]
pub struct RoundFactory {
    address: Address,
    owner: Address,
    params: RoundParams,
}

impl RoundFactory {
    pub fn deploy(chain: &mut Chain, deployer: Address, params: RoundParams) -> Self {
        let address = chain.allocate_address(&deployer);
        tracing::info!(
            "Round factory {} deployed by {} (version {})",
            address,
            deployer,
            params.version
        );

        Self {
            address,
            owner: deployer,
            params,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn version(&self) -> &str {
        &self.params.version
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        if caller != self.owner {
            return Err(LotteryError::Unauthorized(caller));
        }

        self.owner = new_owner;
        tracing::debug!("Round factory {} now owned by {}", self.address, new_owner);
        Ok(())
    }

    /// Creates a round funded with the value attached to `msg` and hands it to the caller.
    pub fn create_round(
        &self,
        chain: &mut Chain,
        msg: &Msg,
        commitment: CommitmentPair,
    ) -> Result<LotteryRound> {
        if msg.sender != self.owner {
            return Err(LotteryError::Unauthorized(msg.sender));
        }

        let available = chain.balance_of(&msg.sender);
        if available < msg.value {
            return Err(CoreError::InsufficientFunds {
                need: msg.value.to_sat(),
                available: available.to_sat(),
            }
            .into());
        }

        let address = chain.allocate_address(&self.address);
        chain.receive(msg, address)?;

        let mut round = LotteryRound::open(
            chain,
            address,
            self.address,
            commitment,
            self.params.clone(),
        )?;
        round.transfer_ownership(self.address, msg.sender)?;

        chain.emit(
            self.address,
            Notification::RoundCreated {
                version: self.params.version.clone(),
                round: address,
            },
        );

        tracing::info!(
            "Round factory {} created round {} with {} sats",
            self.address,
            address,
            msg.value.to_sat()
        );
        Ok(round)
    }
}

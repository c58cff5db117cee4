use crate::logic::GameLogic;
use crate::{LotteryError, Result};
use lotto_core::{Address, Chain, RoundSummary};

/// Long-lived entry point: holds the active game logic and the history of finalized rounds.
///
/// The registry must own its game logic for [`Lotto::finalize_round`] to succeed.
#[derive(Debug)]
pub struct Lotto {
    address: Address,
    owner: Address,
    game_logic: Box<dyn GameLogic>,
    previous_rounds: Vec<RoundSummary>,
}

impl Lotto {
    pub fn deploy(chain: &mut Chain, deployer: Address, game_logic: Box<dyn GameLogic>) -> Self {
        let address = chain.allocate_address(&deployer);
        tracing::info!(
            "Lotto {} deployed with game logic {}",
            address,
            game_logic.address()
        );

        Self {
            address,
            owner: deployer,
            game_logic,
            previous_rounds: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn game_logic(&self) -> &dyn GameLogic {
        self.game_logic.as_ref()
    }

    pub fn game_logic_mut(&mut self) -> &mut dyn GameLogic {
        self.game_logic.as_mut()
    }

    /// Swaps in a new game logic, returning the retired one
    pub fn set_new_game_logic(
        &mut self,
        chain: &Chain,
        caller: Address,
        game_logic: Box<dyn GameLogic>,
    ) -> Result<Box<dyn GameLogic>> {
        if caller != self.owner {
            return Err(LotteryError::Unauthorized(caller));
        }

        if !self.game_logic.is_upgrade_allowed(chain) {
            return Err(LotteryError::UpgradeNotAllowed);
        }

        tracing::info!(
            "Lotto {} upgrading game logic {} -> {}",
            self.address,
            self.game_logic.address(),
            game_logic.address()
        );
        Ok(std::mem::replace(&mut self.game_logic, game_logic))
    }

    /// Finalizes the active logic's round and appends it to the history.
    pub fn finalize_round(&mut self, chain: &mut Chain, caller: Address) -> Result<&RoundSummary> {
        if caller != self.owner {
            return Err(LotteryError::Unauthorized(caller));
        }

        let summary = self.game_logic.finalize_round(chain, self.address)?;
        tracing::info!(
            "Lotto {} recorded round {} as #{}",
            self.address,
            summary.address,
            self.previous_rounds.len()
        );
        self.previous_rounds.push(summary);
        self.previous_rounds
            .last()
            .ok_or_else(|| LotteryError::internal("round history is empty after push"))
    }

    pub fn current_round(&self) -> Option<Address> {
        self.game_logic.current_round()
    }

    pub fn previous_rounds_count(&self) -> usize {
        self.previous_rounds.len()
    }

    pub fn previous_rounds(&self, index: usize) -> Option<&RoundSummary> {
        self.previous_rounds.get(index)
    }
}

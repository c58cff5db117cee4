//! Round orchestration.
//!
//! A game logic owns the round factory and at most one live round. The
//! curator starts and reveals rounds; the owner (normally the [`Lotto`]
//! registry) funds it and finalizes completed rounds.
//!
//! [`Lotto`]: crate::registry::Lotto

use crate::commitment::{CommitmentPair, Reveal};
use crate::factory::RoundFactory;
use crate::round::{LotteryRound, RoundState};
use crate::{LotteryError, Result};
use lotto_core::{Address, Amount, Chain, LottoConfig, Msg, Pick, RoundSummary};
use std::fmt;

/// Orchestrator interface the registry drives
pub trait GameLogic: fmt::Debug + Send {
    fn address(&self) -> Address;
    fn owner(&self) -> Address;
    fn curator(&self) -> Address;
    fn current_round(&self) -> Option<Address>;
    fn round(&self) -> Option<&LotteryRound>;
    fn round_mut(&mut self) -> Option<&mut LotteryRound>;

    /// True when no round is live and the held balance is below the upgrade threshold
    fn is_upgrade_allowed(&self, chain: &Chain) -> bool;

    fn deposit(&mut self, chain: &mut Chain, msg: &Msg) -> Result<()>;
    fn start_round(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        commitment: CommitmentPair,
    ) -> Result<Address>;
    fn close_round(&mut self, chain: &mut Chain, caller: Address, reveal: &Reveal) -> Result<Pick>;
    fn force_close_round(&mut self, caller: Address) -> Result<()>;
    fn finalize_round(&mut self, chain: &mut Chain, caller: Address) -> Result<RoundSummary>;
    fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()>;
}

#[derive(Debug)]
pub struct LotteryGameLogic {
    address: Address,
    owner: Address,
    curator: Address,
    factory: Option<RoundFactory>,
    round: Option<LotteryRound>,
    upgrade_threshold: Amount,
}

impl LotteryGameLogic {
    pub fn deploy(chain: &mut Chain, deployer: Address, curator: Address, config: &LottoConfig) -> Self {
        let address = chain.allocate_address(&deployer);
        tracing::info!("Game logic {} deployed, curator {}", address, curator);

        Self {
            address,
            owner: deployer,
            curator,
            factory: None,
            round: None,
            upgrade_threshold: config.upgrade_threshold,
        }
    }

    pub fn factory(&self) -> Option<&RoundFactory> {
        self.factory.as_ref()
    }

    pub fn balance(&self, chain: &Chain) -> Amount {
        chain.balance_of(&self.address)
    }

    /// Installs a factory this logic already owns, returning the one it replaces
    pub fn set_factory(&mut self, caller: Address, factory: RoundFactory) -> Result<Option<RoundFactory>> {
        self.ensure_owner(caller)?;
        self.ensure_idle()?;

        if factory.owner() != self.address {
            return Err(LotteryError::invalid_state(format!(
                "Factory {} is not owned by game logic {}",
                factory.address(),
                self.address
            )));
        }

        tracing::info!("Game logic {} now uses factory {}", self.address, factory.address());
        Ok(self.factory.replace(factory))
    }

    pub fn set_curator(&mut self, caller: Address, curator: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.ensure_idle()?;

        self.curator = curator;
        tracing::info!("Game logic {} curator set to {}", self.address, curator);
        Ok(())
    }

    /// Hands the factory back to this logic's owner
    pub fn relinquish_factory(&mut self, caller: Address) -> Result<RoundFactory> {
        self.ensure_owner(caller)?;
        self.ensure_idle()?;

        let mut factory = self.factory.take().ok_or(LotteryError::NoFactory)?;
        factory.transfer_ownership(self.address, self.owner)?;

        tracing::info!("Game logic {} relinquished factory {}", self.address, factory.address());
        Ok(factory)
    }

    fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(LotteryError::Unauthorized(caller));
        }
        Ok(())
    }

    fn ensure_curator(&self, caller: Address) -> Result<()> {
        if caller != self.curator {
            return Err(LotteryError::Unauthorized(caller));
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.round.is_some() {
            return Err(LotteryError::RoundInProgress);
        }
        Ok(())
    }
}

impl GameLogic for LotteryGameLogic {
    fn address(&self) -> Address {
        self.address
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn curator(&self) -> Address {
        self.curator
    }

    fn current_round(&self) -> Option<Address> {
        self.round.as_ref().map(LotteryRound::address)
    }

    fn round(&self) -> Option<&LotteryRound> {
        self.round.as_ref()
    }

    fn round_mut(&mut self) -> Option<&mut LotteryRound> {
        self.round.as_mut()
    }

    fn is_upgrade_allowed(&self, chain: &Chain) -> bool {
        self.round.is_none() && self.balance(chain) < self.upgrade_threshold
    }

    fn deposit(&mut self, chain: &mut Chain, msg: &Msg) -> Result<()> {
        self.ensure_owner(msg.sender)?;
        self.ensure_idle()?;

        chain.receive(msg, self.address)?;
        tracing::info!("Game logic {} received deposit of {} sats", self.address, msg.value.to_sat());
        Ok(())
    }

    /// Opens a round through the factory, seeding it with everything deposited so far.
    fn start_round(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        commitment: CommitmentPair,
    ) -> Result<Address> {
        self.ensure_idle()?;
        self.ensure_curator(caller)?;
        let factory = self.factory.as_ref().ok_or(LotteryError::NoFactory)?;

        let seed = Msg::new(self.address).with_value(self.balance(chain));
        let round = factory.create_round(chain, &seed, commitment)?;
        let address = round.address();
        self.round = Some(round);

        tracing::info!(
            "Game logic {} started round {} with {} sats",
            self.address,
            address,
            seed.value.to_sat()
        );
        Ok(address)
    }

    /// Reveals the current round's secret, closing it first if its closing block has passed.
    fn close_round(&mut self, chain: &mut Chain, caller: Address, reveal: &Reveal) -> Result<Pick> {
        self.ensure_curator(caller)?;
        let address = self.address;
        let round = self.round.as_mut().ok_or(LotteryError::NoActiveRound)?;

        let pick = round.check_reveal(address, reveal)?;
        if round.state() == RoundState::Open {
            round.close(chain)?;
        }
        round.reveal(chain, address, reveal, pick)?;
        Ok(pick)
    }

    fn force_close_round(&mut self, caller: Address) -> Result<()> {
        self.ensure_curator(caller)?;
        let address = self.address;
        let round = self.round.as_mut().ok_or(LotteryError::NoActiveRound)?;
        round.force_close(address)
    }

    /// Settles the completed round, clears it and reports its outcome.
    ///
    /// Winners and the curator's fee are paid out; a round nobody won is
    /// drained back into this logic.
    fn finalize_round(&mut self, chain: &mut Chain, caller: Address) -> Result<RoundSummary> {
        self.ensure_owner(caller)?;
        let address = self.address;
        let curator = self.curator;
        let round = self.round.as_mut().ok_or(LotteryError::NoActiveRound)?;

        match round.state() {
            RoundState::Completed | RoundState::Settled => {}
            state => {
                return Err(LotteryError::invalid_state(format!(
                    "Cannot finalize round {} in state {:?}",
                    round.address(),
                    state
                )))
            }
        }

        if round.has_winner() {
            round.distribute_winnings(chain)?;
            round.claim_owner_fee(chain, address, curator)?;
        } else {
            round.withdraw(chain, address)?;
        }

        let summary = round.summary();
        self.round = None;

        tracing::info!(
            "Game logic {} finalized round {} ({} winner(s))",
            self.address,
            summary.address,
            summary.winners.len()
        );
        Ok(summary)
    }

    fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.owner = new_owner;
        tracing::debug!("Game logic {} now owned by {}", self.address, new_owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::FixedDerivation;
    use crate::round::RoundParams;
    use std::sync::Arc;

    const PRICE: Amount = Amount::from_sat(10_000);

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn secret() -> Reveal {
        Reveal::from_phrase("secret", 12)
    }

    fn commitment() -> CommitmentPair {
        CommitmentPair::for_reveal(&secret())
    }

    fn setup_with(params: RoundParams) -> (Chain, LotteryGameLogic) {
        let mut chain = Chain::new();
        chain.fund(addr("owner"), Amount::from_sat(10_000_000)).unwrap();
        chain.fund(addr("player"), Amount::from_sat(1_000_000)).unwrap();

        let config = LottoConfig::rehearsal();
        let mut logic = LotteryGameLogic::deploy(&mut chain, addr("owner"), addr("curator"), &config);
        let mut factory = RoundFactory::deploy(&mut chain, addr("owner"), params);
        factory
            .transfer_ownership(addr("owner"), logic.address())
            .unwrap();
        logic.set_factory(addr("owner"), factory).unwrap();
        (chain, logic)
    }

    fn setup() -> (Chain, LotteryGameLogic) {
        let params = RoundParams::from_config(&LottoConfig::rehearsal())
            .with_derivation(Arc::new(FixedDerivation(Pick::new(0x11223344))));
        setup_with(params)
    }

    fn deposit(chain: &mut Chain, logic: &mut LotteryGameLogic, sats: u64) -> Result<()> {
        let msg = Msg::new(addr("owner")).with_value(Amount::from_sat(sats));
        logic.deposit(chain, &msg)
    }

    #[test]
    fn test_deployment() {
        let (chain, logic) = setup();
        assert_eq!(logic.owner(), addr("owner"));
        assert_eq!(logic.curator(), addr("curator"));
        assert_eq!(logic.current_round(), None);
        assert!(logic.is_upgrade_allowed(&chain));
    }

    #[test]
    fn test_set_curator() {
        let (mut chain, mut logic) = setup();
        assert!(logic.set_curator(addr("player"), addr("player")).is_err());
        logic.set_curator(addr("owner"), addr("other")).unwrap();
        assert_eq!(logic.curator(), addr("other"));

        logic
            .start_round(&mut chain, addr("other"), commitment())
            .unwrap();
        assert!(matches!(
            logic.set_curator(addr("owner"), addr("curator")),
            Err(LotteryError::RoundInProgress)
        ));
    }

    #[test]
    fn test_set_factory_requires_ownership() {
        let (mut chain, mut logic) = setup();
        let foreign = RoundFactory::deploy(&mut chain, addr("owner"), RoundParams::default());
        assert!(logic.set_factory(addr("owner"), foreign).is_err());
    }

    #[test]
    fn test_upgrade_threshold() {
        let (mut chain, mut logic) = setup();

        deposit(&mut chain, &mut logic, 10_000).unwrap();
        assert!(logic.is_upgrade_allowed(&chain));

        deposit(&mut chain, &mut logic, 1_000_000).unwrap();
        assert!(!logic.is_upgrade_allowed(&chain));
    }

    #[test]
    fn test_upgrade_blocked_by_live_round() {
        let (mut chain, mut logic) = setup();
        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();
        assert!(!logic.is_upgrade_allowed(&chain));
    }

    #[test]
    fn test_start_round() {
        let (mut chain, mut logic) = setup();

        assert!(matches!(
            logic.start_round(&mut chain, addr("player"), commitment()),
            Err(LotteryError::Unauthorized(_))
        ));

        let round = logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();
        assert_eq!(logic.current_round(), Some(round));
        assert_eq!(logic.round().unwrap().owner(), logic.address());
    }

    #[test]
    fn test_start_round_forwards_deposits() {
        let (mut chain, mut logic) = setup();
        deposit(&mut chain, &mut logic, 200_000).unwrap();

        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();

        assert_eq!(logic.balance(&chain), Amount::ZERO);
        assert_eq!(logic.round().unwrap().balance(&chain), Amount::from_sat(200_000));
    }

    #[test]
    fn test_second_round_is_rejected() {
        let (mut chain, mut logic) = setup();
        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();

        for caller in ["curator", "owner", "player"] {
            assert!(matches!(
                logic.start_round(&mut chain, addr(caller), commitment()),
                Err(LotteryError::RoundInProgress)
            ));
        }
    }

    #[test]
    fn test_start_round_without_factory() {
        let (mut chain, mut logic) = setup();
        let factory = logic.relinquish_factory(addr("owner")).unwrap();
        assert_eq!(factory.owner(), addr("owner"));

        assert!(matches!(
            logic.start_round(&mut chain, addr("curator"), commitment()),
            Err(LotteryError::NoFactory)
        ));
        assert!(matches!(
            logic.relinquish_factory(addr("owner")),
            Err(LotteryError::NoFactory)
        ));
    }

    #[test]
    fn test_close_round() {
        let (mut chain, mut logic) = setup();
        assert!(matches!(
            logic.close_round(&mut chain, addr("curator"), &secret()),
            Err(LotteryError::NoActiveRound)
        ));

        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();

        // too early
        assert!(logic
            .close_round(&mut chain, addr("curator"), &secret())
            .is_err());
        assert_eq!(logic.round().unwrap().state(), RoundState::Open);

        logic.force_close_round(addr("curator")).unwrap();
        assert!(logic
            .close_round(&mut chain, addr("player"), &secret())
            .is_err());

        let pick = logic
            .close_round(&mut chain, addr("curator"), &secret())
            .unwrap();
        assert_eq!(pick, Pick::new(0x11223344));
        assert_eq!(logic.round().unwrap().state(), RoundState::Completed);
    }

    #[test]
    fn test_close_round_after_closing_block() {
        let (mut chain, mut logic) = setup_with(RoundParams::default());
        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();
        chain.advance_blocks(12_500);

        // a bad reveal leaves the round open
        assert!(logic
            .close_round(&mut chain, addr("curator"), &Reveal::from_phrase("secret", 11))
            .is_err());
        assert_eq!(logic.round().unwrap().state(), RoundState::Open);

        let pick = logic
            .close_round(&mut chain, addr("curator"), &secret())
            .unwrap();
        assert_eq!(logic.round().unwrap().winning_pick(), Some(pick));
    }

    #[test]
    fn test_finalize_preconditions() {
        let (mut chain, mut logic) = setup();
        assert!(matches!(
            logic.finalize_round(&mut chain, addr("owner")),
            Err(LotteryError::NoActiveRound)
        ));

        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();
        assert!(matches!(
            logic.finalize_round(&mut chain, addr("owner")),
            Err(LotteryError::InvalidState(_))
        ));

        logic.force_close_round(addr("curator")).unwrap();
        logic
            .close_round(&mut chain, addr("curator"), &secret())
            .unwrap();
        assert!(matches!(
            logic.finalize_round(&mut chain, addr("curator")),
            Err(LotteryError::Unauthorized(_))
        ));

        logic.finalize_round(&mut chain, addr("owner")).unwrap();
        assert_eq!(logic.current_round(), None);
    }

    #[test]
    fn test_finalize_reclaims_balance_without_winner() {
        let (mut chain, mut logic) = setup();
        deposit(&mut chain, &mut logic, 2_000_000).unwrap();
        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();

        let round = logic.round_mut().unwrap();
        let msg = Msg::new(addr("player")).with_value(PRICE);
        round.place_wager(&mut chain, &msg, Pick::new(0x01020304)).unwrap();

        logic.force_close_round(addr("curator")).unwrap();
        logic
            .close_round(&mut chain, addr("curator"), &secret())
            .unwrap();
        let summary = logic.finalize_round(&mut chain, addr("owner")).unwrap();

        assert!(!summary.has_winner());
        assert_eq!(logic.balance(&chain), Amount::from_sat(2_010_000));
    }

    #[test]
    fn test_finalize_pays_winner_and_curator() {
        let (mut chain, mut logic) = setup();
        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();

        let round = logic.round_mut().unwrap();
        let msg = Msg::new(addr("player")).with_value(PRICE);
        round.place_wager(&mut chain, &msg, Pick::new(0x11223344)).unwrap();

        logic.force_close_round(addr("curator")).unwrap();
        logic
            .close_round(&mut chain, addr("curator"), &secret())
            .unwrap();
        let summary = logic.finalize_round(&mut chain, addr("owner")).unwrap();

        assert_eq!(summary.winners, vec![addr("player")]);
        assert_eq!(chain.balance_of(&addr("player")), Amount::from_sat(999_500));
        assert_eq!(chain.balance_of(&addr("curator")), Amount::from_sat(500));
        assert_eq!(logic.balance(&chain), Amount::ZERO);
    }

    #[test]
    fn test_deposit_rules() {
        let (mut chain, mut logic) = setup();

        let stranger = Msg::new(addr("player")).with_value(PRICE);
        assert!(matches!(
            logic.deposit(&mut chain, &stranger),
            Err(LotteryError::Unauthorized(_))
        ));

        deposit(&mut chain, &mut logic, 100_000).unwrap();
        assert_eq!(logic.balance(&chain), Amount::from_sat(100_000));

        logic
            .start_round(&mut chain, addr("curator"), commitment())
            .unwrap();
        assert!(matches!(
            deposit(&mut chain, &mut logic, 100_000),
            Err(LotteryError::RoundInProgress)
        ));
    }

    #[test]
    fn test_transfer_ownership() {
        let (_, mut logic) = setup();
        assert!(logic
            .transfer_ownership(addr("player"), addr("player"))
            .is_err());
        logic
            .transfer_ownership(addr("owner"), addr("registry"))
            .unwrap();
        assert_eq!(logic.owner(), addr("registry"));
    }
}

use crate::commitment::{CommitmentPair, PickDerivation, PreimageDerivation, Reveal};
use crate::entropy::{BlockEntropy, EntropySource};
use crate::tickets::TicketLedger;
use crate::{LotteryError, Result};
use lotto_core::{
    Address, Amount, Chain, CoreError, LottoConfig, Msg, Notification, Pick, RoundSummary, H256,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Lifecycle of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    Open,
    Closed,
    Completed,
    Settled,
    Destroyed,
}

/// Rules a round is created with; fixed for its whole life
#[derive(Debug, Clone)]
pub struct RoundParams {
    pub ticket_price: Amount,
    pub payout_fraction: u64,
    pub fraction_base: u64,
    pub round_length: u64,
    pub max_iterations: u8,
    pub allow_force_close: bool,
    pub version: String,
    pub derivation: Arc<dyn PickDerivation>,
    pub entropy: Arc<dyn EntropySource>,
}

impl RoundParams {
    pub fn from_config(config: &LottoConfig) -> Self {
        Self {
            ticket_price: config.ticket_price,
            payout_fraction: config.payout_fraction,
            fraction_base: config.fraction_base,
            round_length: config.round_length,
            max_iterations: config.max_iterations,
            allow_force_close: config.allow_force_close,
            version: config.version.clone(),
            derivation: Arc::new(PreimageDerivation),
            entropy: Arc::new(BlockEntropy),
        }
    }

    pub fn with_derivation(mut self, derivation: Arc<dyn PickDerivation>) -> Self {
        self.derivation = derivation;
        self
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }
}

impl Default for RoundParams {
    fn default() -> Self {
        Self::from_config(&LottoConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct LotteryRound {
    address: Address,
    owner: Address,
    ownership_transferred: bool,
    params: RoundParams,
    commitment: CommitmentPair,
    closing_block: u64,
    state: RoundState,
    tickets: TicketLedger,
    winning_pick: Option<Pick>,
    prize_pool: Amount,
    owner_fee: Amount,
    winners: Vec<Address>,
    paid_winners: HashSet<Address>,
    owner_fee_paid: bool,
}

impl LotteryRound {
    /// Opens a round at `address`; wagers are accepted until the closing block.
    pub fn open(
        chain: &mut Chain,
        address: Address,
        owner: Address,
        commitment: CommitmentPair,
        params: RoundParams,
    ) -> Result<Self> {
        let closing_block = chain
            .block_number()
            .checked_add(params.round_length)
            .ok_or_else(|| CoreError::overflow("closing block"))?;

        chain.emit(
            address,
            Notification::RoundStarted {
                salt_hash: commitment.salt_hash,
                salt_n_hash: commitment.salt_n_hash,
                closing_block,
                version: params.version.clone(),
            },
        );

        tracing::info!(
            "Round {} opened, closing at block {}",
            address,
            closing_block
        );

        Ok(Self {
            address,
            owner,
            ownership_transferred: false,
            tickets: TicketLedger::new(params.ticket_price),
            params,
            commitment,
            closing_block,
            state: RoundState::Open,
            winning_pick: None,
            prize_pool: Amount::ZERO,
            owner_fee: Amount::ZERO,
            winners: Vec::new(),
            paid_winners: HashSet::new(),
            owner_fee_paid: false,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn version(&self) -> &str {
        &self.params.version
    }

    pub fn commitment(&self) -> &CommitmentPair {
        &self.commitment
    }

    pub fn salt_hash(&self) -> H256 {
        self.commitment.salt_hash
    }

    pub fn salt_n_hash(&self) -> H256 {
        self.commitment.salt_n_hash
    }

    pub fn closing_block(&self) -> u64 {
        self.closing_block
    }

    pub fn ticket_price(&self) -> Amount {
        self.params.ticket_price
    }

    pub fn total_wagered(&self) -> Amount {
        self.tickets.total_wagered()
    }

    pub fn ticket_count(&self) -> u64 {
        self.tickets.ticket_count()
    }

    pub fn winning_pick(&self) -> Option<Pick> {
        self.winning_pick
    }

    pub fn prize_pool(&self) -> Amount {
        self.prize_pool
    }

    pub fn owner_fee(&self) -> Amount {
        self.owner_fee
    }

    pub fn winners(&self) -> &[Address] {
        &self.winners
    }

    pub fn has_winner(&self) -> bool {
        !self.winners.is_empty()
    }

    pub fn balance(&self, chain: &Chain) -> Amount {
        chain.balance_of(&self.address)
    }

    /// Share paid to each distinct winner; the floor-division remainder stays in the round.
    pub fn prize_value(&self) -> Amount {
        self.prize_pool
            .checked_div(self.winners.len() as u64)
            .unwrap_or(Amount::ZERO)
    }

    pub fn is_accepting_wagers(&self, chain: &Chain) -> bool {
        self.state == RoundState::Open && chain.block_number() < self.closing_block
    }

    /// Hands the round to its long-term owner. Only ever happens once.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if self.ownership_transferred {
            return Err(LotteryError::invalid_state(
                "Round ownership was already transferred",
            ));
        }

        self.owner = new_owner;
        self.ownership_transferred = true;
        tracing::debug!("Round {} now owned by {}", self.address, new_owner);
        Ok(())
    }

    /// Public check that a salt and iteration count match both commitments
    pub fn proof_of_salt(&self, reveal: &Reveal) -> bool {
        self.commitment.verify(reveal)
    }

    /// The winning pick a reveal determines under this round's derivation
    pub fn intended_winning_pick(&self, reveal: &Reveal) -> Pick {
        self.params.derivation.derive(reveal)
    }

    pub fn place_wager(&mut self, chain: &mut Chain, msg: &Msg, pick: Pick) -> Result<()> {
        if !self.is_accepting_wagers(chain) {
            return Err(LotteryError::invalid_state(format!(
                "Round {} is not accepting wagers",
                self.address
            )));
        }

        self.tickets.check_wager(pick, msg.value)?;
        chain.receive(msg, self.address)?;
        self.tickets.record_wager(pick, msg.sender, msg.value)?;

        chain.emit(
            self.address,
            Notification::Draw {
                pick,
                holder: msg.sender,
            },
        );

        tracing::info!("Round {}: {} wagered on {}", self.address, msg.sender, pick);
        Ok(())
    }

    /// Wagers on a pick drawn from the round's entropy source
    pub fn place_random_wager(&mut self, chain: &mut Chain, msg: &Msg) -> Result<Pick> {
        let pick = self
            .params
            .entropy
            .pick(chain.block(), &msg.sender, self.tickets.ticket_count());
        self.place_wager(chain, msg, pick)?;
        Ok(pick)
    }

    /// Stops wagering once the closing block is reached. Anyone may call it.
    pub fn close(&mut self, chain: &Chain) -> Result<()> {
        if self.state != RoundState::Open {
            return Err(LotteryError::invalid_state(format!(
                "Cannot close round in state {:?}",
                self.state
            )));
        }

        if chain.block_number() < self.closing_block {
            return Err(LotteryError::invalid_state(format!(
                "Round closes at block {}, current block is {}",
                self.closing_block,
                chain.block_number()
            )));
        }

        self.state = RoundState::Closed;
        tracing::info!("Round {} closed", self.address);
        Ok(())
    }

    pub fn force_close(&mut self, caller: Address) -> Result<()> {
        if !self.params.allow_force_close {
            return Err(LotteryError::ForceCloseDisabled);
        }
        self.ensure_owner(caller)?;
        if self.state != RoundState::Open {
            return Err(LotteryError::invalid_state(format!(
                "Cannot close round in state {:?}",
                self.state
            )));
        }

        self.state = RoundState::Closed;
        tracing::warn!("Round {} force closed at its owner's request", self.address);
        Ok(())
    }

    /// Validates caller, iteration range and both commitments, returning the pick the reveal determines.
    pub fn check_reveal(&self, caller: Address, reveal: &Reveal) -> Result<Pick> {
        self.ensure_owner(caller)?;

        if reveal.iterations == 0 || reveal.iterations > self.params.max_iterations {
            return Err(LotteryError::IterationsOutOfRange {
                got: reveal.iterations,
                max: self.params.max_iterations,
            });
        }

        if !self.commitment.verify(reveal) {
            return Err(LotteryError::CommitmentMismatch);
        }

        Ok(self.intended_winning_pick(reveal))
    }

    /// Verifies the curator's reveal and settles the winning pick, the prize pool and the fee.
    pub fn reveal(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        reveal: &Reveal,
        claimed_pick: Pick,
    ) -> Result<()> {
        if self.state != RoundState::Closed {
            return Err(LotteryError::invalid_state(format!(
                "Cannot reveal in state {:?}",
                self.state
            )));
        }
        let derived = self.check_reveal(caller, reveal)?;
        if derived != claimed_pick {
            return Err(LotteryError::DerivationMismatch {
                claimed: claimed_pick,
                derived,
            });
        }

        let winners: Vec<Address> = self
            .tickets
            .wagers_matching(derived)
            .into_iter()
            .map(|(holder, _)| holder)
            .collect();

        let (prize_pool, owner_fee) = if winners.is_empty() {
            (Amount::ZERO, Amount::ZERO)
        } else {
            self.split_pool()?
        };

        self.winning_pick = Some(derived);
        self.prize_pool = prize_pool;
        self.owner_fee = owner_fee;
        self.winners = winners;
        self.state = RoundState::Completed;

        chain.emit(
            self.address,
            Notification::RoundCompleted {
                winning_pick: derived,
                salt: reveal.salt,
                iterations: reveal.iterations,
            },
        );
        for holder in &self.winners {
            chain.emit(
                self.address,
                Notification::Winner {
                    holder: *holder,
                    winning_pick: derived,
                },
            );
        }

        tracing::info!(
            "Round {} completed: winning pick {}, {} winner(s), prize pool {} sats",
            self.address,
            derived,
            self.winners.len(),
            self.prize_pool.to_sat()
        );
        Ok(())
    }

    /// Pays every unpaid winner their share. Calling again pays nothing further.
    pub fn distribute_winnings(&mut self, chain: &mut Chain) -> Result<Amount> {
        self.ensure_settling()?;
        if !self.has_winner() {
            return Err(LotteryError::invalid_state(format!(
                "Round {} has no winner to pay",
                self.address
            )));
        }

        let pending: Vec<Address> = self
            .winners
            .iter()
            .filter(|holder| !self.paid_winners.contains(*holder))
            .copied()
            .collect();
        if pending.is_empty() {
            return Ok(Amount::ZERO);
        }

        let share = self.prize_value();
        let total = share
            .checked_mul(pending.len() as u64)
            .ok_or_else(|| CoreError::overflow("winnings payout"))?;
        self.ensure_covered(chain, total)?;

        self.paid_winners.extend(pending.iter().copied());
        self.mark_settled_if_done();

        for holder in &pending {
            chain.transfer(self.address, *holder, share)?;
            tracing::info!("Round {} paid {} sats to {}", self.address, share.to_sat(), holder);
        }
        Ok(total)
    }

    /// Pays the owner fee to `recipient` once; later calls, or a round without winners, pay nothing.
    pub fn claim_owner_fee(
        &mut self,
        chain: &mut Chain,
        caller: Address,
        recipient: Address,
    ) -> Result<Amount> {
        self.ensure_owner(caller)?;
        self.ensure_settling()?;

        if !self.has_winner() || self.owner_fee_paid {
            return Ok(Amount::ZERO);
        }

        let fee = self.owner_fee;
        self.ensure_covered(chain, fee)?;

        self.owner_fee_paid = true;
        self.mark_settled_if_done();

        chain.transfer(self.address, recipient, fee)?;
        tracing::info!("Round {} paid owner fee of {} sats to {}", self.address, fee.to_sat(), recipient);
        Ok(fee)
    }

    /// Returns the whole balance to the owner when nobody won; pays nothing otherwise.
    pub fn withdraw(&mut self, chain: &mut Chain, caller: Address) -> Result<Amount> {
        self.ensure_owner(caller)?;
        self.ensure_settling()?;

        if self.has_winner() {
            return Ok(Amount::ZERO);
        }

        let balance = self.balance(chain);
        self.state = RoundState::Settled;

        chain.transfer(self.address, self.owner, balance)?;
        tracing::info!("Round {} returned {} sats to {}", self.address, balance.to_sat(), self.owner);
        Ok(balance)
    }

    /// Like [`Self::withdraw`] but pays `beneficiary` and retires the round.
    pub fn destroy(&mut self, chain: &mut Chain, caller: Address, beneficiary: Address) -> Result<Amount> {
        self.ensure_owner(caller)?;
        self.ensure_settling()?;

        if self.has_winner() {
            return Ok(Amount::ZERO);
        }

        let balance = self.balance(chain);
        self.state = RoundState::Destroyed;

        chain.transfer(self.address, beneficiary, balance)?;
        tracing::info!("Round {} destroyed, {} sats sent to {}", self.address, balance.to_sat(), beneficiary);
        Ok(balance)
    }

    /// True for any distinct winner while the round is completed
    pub fn winnings_claimable(&self, holder: &Address) -> bool {
        self.state == RoundState::Completed && self.winners.contains(holder)
    }

    pub fn summary(&self) -> RoundSummary {
        RoundSummary {
            address: self.address,
            version: self.params.version.clone(),
            winning_pick: self.winning_pick,
            total_wagered: self.total_wagered(),
            prize_pool: self.prize_pool,
            owner_fee: self.owner_fee,
            prize_value: self.prize_value(),
            winners: self.winners.clone(),
            ticket_count: self.ticket_count(),
        }
    }

    fn split_pool(&self) -> Result<(Amount, Amount)> {
        let total = self.tickets.total_wagered();
        let prize_pool = total
            .checked_mul(self.params.payout_fraction)
            .and_then(|scaled| scaled.checked_div(self.params.fraction_base))
            .ok_or_else(|| CoreError::overflow("prize pool"))?;
        let owner_fee = total
            .checked_sub(prize_pool)
            .ok_or_else(|| CoreError::overflow("owner fee"))?;
        Ok((prize_pool, owner_fee))
    }

    fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(LotteryError::Unauthorized(caller));
        }
        Ok(())
    }

    fn ensure_settling(&self) -> Result<()> {
        match self.state {
            RoundState::Completed | RoundState::Settled => Ok(()),
            state => Err(LotteryError::invalid_state(format!(
                "Round {} is {:?}, not completed",
                self.address, state
            ))),
        }
    }

    fn ensure_covered(&self, chain: &Chain, amount: Amount) -> Result<()> {
        let available = self.balance(chain);
        if available < amount {
            return Err(CoreError::InsufficientFunds {
                need: amount.to_sat(),
                available: available.to_sat(),
            }
            .into());
        }
        Ok(())
    }

    fn mark_settled_if_done(&mut self) {
        if self.state == RoundState::Completed
            && self.owner_fee_paid
            && self.paid_winners.len() == self.winners.len()
        {
            self.state = RoundState::Settled;
            tracing::info!("Round {} settled", self.address);
        }
    }
}

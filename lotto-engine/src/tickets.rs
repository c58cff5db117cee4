use crate::{LotteryError, Result};
use lotto_core::{Address, Amount, CoreError, Pick};
use std::collections::HashMap;

/// Wagers placed in one round, indexed by pick
#[derive(Debug, Clone)]
pub struct TicketLedger {
    ticket_price: Amount,
    by_pick: HashMap<Pick, Vec<Address>>,
    total_wagered: Amount,
    ticket_count: u64,
}

impl TicketLedger {
    pub fn new(ticket_price: Amount) -> Self {
        Self {
            ticket_price,
            by_pick: HashMap::new(),
            total_wagered: Amount::ZERO,
            ticket_count: 0,
        }
    }

    pub fn total_wagered(&self) -> Amount {
        self.total_wagered
    }

    pub fn ticket_count(&self) -> u64 {
        self.ticket_count
    }

    /// Validates a wager without recording it, returning the wagered total it would produce.
    pub fn check_wager(&self, pick: Pick, amount: Amount) -> Result<Amount> {
        if !pick.is_valid() {
            return Err(LotteryError::InvalidPick(pick));
        }

        if amount != self.ticket_price {
            return Err(LotteryError::InvalidPayment {
                expected: self.ticket_price.to_sat(),
                got: amount.to_sat(),
            });
        }

        let total = self
            .total_wagered
            .checked_add(amount)
            .ok_or_else(|| CoreError::overflow("total wagered"))?;
        Ok(total)
    }

    pub fn record_wager(&mut self, pick: Pick, holder: Address, amount: Amount) -> Result<()> {
        let total = self.check_wager(pick, amount)?;

        self.by_pick.entry(pick).or_default().push(holder);
        self.total_wagered = total;
        self.ticket_count += 1;
        Ok(())
    }

    /// Holders who wagered `pick`, each once, with how many tickets they hold on it.
    /// Order follows each holder's first matching wager.
    pub fn wagers_matching(&self, pick: Pick) -> Vec<(Address, u64)> {
        let mut grouped: Vec<(Address, u64)> = Vec::new();
        for holder in self.by_pick.get(&pick).into_iter().flatten() {
            match grouped.iter_mut().find(|(seen, _)| seen == holder) {
                Some((_, count)) => *count += 1,
                None => grouped.push((*holder, 1)),
            }
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE: Amount = Amount::from_sat(10_000);

    fn holder(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn test_records_valid_wager() {
        let mut ledger = TicketLedger::new(PRICE);
        ledger
            .record_wager(Pick::new(0x7f7f7f7f), holder("a"), PRICE)
            .unwrap();

        assert_eq!(ledger.total_wagered(), PRICE);
        assert_eq!(ledger.ticket_count(), 1);
        assert_eq!(
            ledger.wagers_matching(Pick::new(0x7f7f7f7f)),
            vec![(holder("a"), 1)]
        );
    }

    #[test]
    fn test_rejects_out_of_range_pick() {
        let mut ledger = TicketLedger::new(PRICE);
        let err = ledger
            .record_wager(Pick::new(0x81223344), holder("a"), PRICE)
            .unwrap_err();

        assert!(matches!(err, LotteryError::InvalidPick(_)));
        assert_eq!(ledger.total_wagered(), Amount::ZERO);
        assert_eq!(ledger.ticket_count(), 0);
    }

    #[test]
    fn test_rejects_wrong_payment() {
        let mut ledger = TicketLedger::new(PRICE);

        for amount in [Amount::ZERO, Amount::from_sat(9_999), Amount::from_sat(20_000)] {
            let err = ledger
                .record_wager(Pick::new(0x11223344), holder("a"), amount)
                .unwrap_err();
            assert!(matches!(err, LotteryError::InvalidPayment { expected: 10_000, .. }));
        }
        assert_eq!(ledger.ticket_count(), 0);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut ledger = TicketLedger::new(PRICE);
        let pick = Pick::new(0x11224433);
        ledger.record_wager(pick, holder("b"), PRICE).unwrap();
        ledger.record_wager(pick, holder("b"), PRICE).unwrap();
        ledger.record_wager(pick, holder("c"), PRICE).unwrap();

        assert_eq!(ledger.ticket_count(), 3);
        assert_eq!(ledger.total_wagered(), Amount::from_sat(30_000));
        assert_eq!(
            ledger.wagers_matching(pick),
            vec![(holder("b"), 2), (holder("c"), 1)]
        );
    }

    #[test]
    fn test_no_matches() {
        let mut ledger = TicketLedger::new(PRICE);
        ledger
            .record_wager(Pick::new(0x11223344), holder("a"), PRICE)
            .unwrap();
        assert!(ledger.wagers_matching(Pick::new(0x21222324)).is_empty());
    }
}

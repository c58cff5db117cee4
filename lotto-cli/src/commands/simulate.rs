use crate::config::CliConfig;
use anyhow::{bail, Context};
use comfy_table::{presets::UTF8_FULL, Table};
use lotto_core::{Address, Amount, Chain, EventStore, Msg, Pick, RoundStore, RoundSummary, Storage};
use lotto_engine::commitment::{self, FixedDerivation};
use lotto_engine::{
    CommitmentPair, GameLogic, Lotto, LotteryGameLogic, Reveal, RoundFactory, RoundParams,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub players: u32,
    pub tickets: u32,
    pub phrase: Option<String>,
    pub iterations: u8,
    pub winning_pick: Option<String>,
    pub picks: Vec<String>,
}

/// Participants of one simulated deployment
struct Cast {
    owner: Address,
    curator: Address,
    players: Vec<Address>,
}

impl Cast {
    /// Labels are salted per run so repeated simulations never share addresses
    fn new(players: u32) -> Self {
        let run = commitment::generate_salt();
        Self {
            owner: Address::from_label(&format!("{}:owner", run)),
            curator: Address::from_label(&format!("{}:curator", run)),
            players: (0..players)
                .map(|i| Address::from_label(&format!("{}:player-{}", run, i)))
                .collect(),
        }
    }
}

/// Runs a full round on an in-process chain and records it in the data directory.
pub async fn simulate(config: &CliConfig, opts: SimulateOptions) -> anyhow::Result<()> {
    if opts.players == 0 {
        bail!("At least one player is required");
    }
    if opts.iterations == 0 {
        bail!("Iterations must be at least 1");
    }

    let explicit: Vec<Pick> = opts
        .picks
        .iter()
        .map(|raw| raw.parse::<Pick>())
        .collect::<Result<_, _>>()
        .context("Invalid --pick")?;

    let mut rules = config.lotto.clone();
    let mut params = RoundParams::from_config(&rules);
    if let Some(raw) = &opts.winning_pick {
        let pick: Pick = raw.parse().context("Invalid --winning-pick")?;
        if !pick.is_valid() {
            bail!("Winning pick {} has a digit of 128 or more", pick);
        }
        rules.allow_force_close = true;
        params = RoundParams::from_config(&rules).with_derivation(Arc::new(FixedDerivation(pick)));
        tracing::warn!("Rehearsal round: winning pick fixed to {}", pick);
    }
    rules.validate()?;

    let reveal = match &opts.phrase {
        Some(phrase) => Reveal::from_phrase(phrase, opts.iterations),
        None => Reveal::new(commitment::generate_salt(), opts.iterations),
    };

    let mut chain = Chain::new();
    let cast = Cast::new(opts.players);
    let price = rules.ticket_price;
    let stake = price
        .checked_mul(u64::from(opts.tickets) + explicit.len() as u64)
        .context("Stake overflows")?;
    for player in &cast.players {
        chain.fund(*player, stake)?;
    }

    let mut logic = LotteryGameLogic::deploy(&mut chain, cast.owner, cast.curator, &rules);
    let mut factory = RoundFactory::deploy(&mut chain, cast.owner, params);
    factory.transfer_ownership(cast.owner, logic.address())?;
    logic.set_factory(cast.owner, factory)?;

    let mut lotto = Lotto::deploy(&mut chain, cast.owner, Box::new(logic));
    let registry = lotto.address();
    lotto.game_logic_mut().transfer_ownership(cast.owner, registry)?;

    let round_address = lotto.game_logic_mut().start_round(
        &mut chain,
        cast.curator,
        CommitmentPair::for_reveal(&reveal),
    )?;
    println!("Round {} started at block {}", round_address, chain.block_number());

    let round = lotto
        .game_logic_mut()
        .round_mut()
        .context("Round vanished after start")?;
    for pick in &explicit {
        let msg = Msg::new(cast.players[0]).with_value(price);
        round.place_wager(&mut chain, &msg, *pick)?;
    }
    for player in &cast.players {
        for _ in 0..opts.tickets {
            round.place_random_wager(&mut chain, &Msg::new(*player).with_value(price))?;
        }
    }
    println!(
        "{} ticket(s) sold, {} sats wagered",
        round.ticket_count(),
        round.total_wagered().to_sat()
    );

    chain.advance_blocks(round.closing_block() - chain.block_number());
    let winning_pick = lotto
        .game_logic_mut()
        .close_round(&mut chain, cast.curator, &reveal)?;
    println!("Revealed at block {}: winning pick {}", chain.block_number(), winning_pick);

    let summary = lotto.finalize_round(&mut chain, cast.owner)?.clone();

    let storage = Storage::new(&config.db_path()).await?;
    EventStore::new(&storage).save_events(chain.events()).await?;
    RoundStore::new(&storage).save_round(&summary).await?;

    print_summary(&summary, &chain, cast.curator);
    println!();
    println!(
        "Saved {} notification(s) to {}",
        chain.events().len(),
        config.db_path().display()
    );
    Ok(())
}

fn print_summary(summary: &RoundSummary, chain: &Chain, curator: Address) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Round", "Value"]);
    table.add_row(vec!["Address".to_string(), summary.address.to_string()]);
    table.add_row(vec!["Version".to_string(), summary.version.clone()]);
    table.add_row(vec![
        "Winning pick".to_string(),
        summary
            .winning_pick
            .map(|pick| pick.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Tickets".to_string(), summary.ticket_count.to_string()]);
    table.add_row(vec!["Total wagered".to_string(), sats(summary.total_wagered)]);
    table.add_row(vec!["Prize pool".to_string(), sats(summary.prize_pool)]);
    table.add_row(vec!["Owner fee".to_string(), sats(summary.owner_fee)]);
    table.add_row(vec!["Prize per winner".to_string(), sats(summary.prize_value)]);
    table.add_row(vec!["Curator balance".to_string(), sats(chain.balance_of(&curator))]);
    println!("{table}");

    if !summary.has_winner() {
        println!("No winners this round; the pot went back to the game logic.");
        return;
    }

    let mut winners = Table::new();
    winners.load_preset(UTF8_FULL);
    winners.set_header(vec!["Winner", "Balance"]);
    for holder in &summary.winners {
        winners.add_row(vec![holder.to_string(), sats(chain.balance_of(holder))]);
    }
    println!("{winners}");
}

pub(crate) fn sats(amount: Amount) -> String {
    format!("{} sats", amount.to_sat())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options() -> SimulateOptions {
        SimulateOptions {
            players: 3,
            tickets: 2,
            phrase: Some("secret".to_string()),
            iterations: 12,
            winning_pick: Some("0x44332211".to_string()),
            picks: vec!["0x44332211".to_string()],
        }
    }

    #[tokio::test]
    async fn test_simulation_persists_round() {
        let dir = tempdir().unwrap();
        let config = CliConfig::resolve(Some(dir.path().to_path_buf()), None, false).unwrap();

        simulate(&config, options()).await.unwrap();

        let storage = Storage::new(&config.db_path()).await.unwrap();
        let rounds = RoundStore::new(&storage).list_rounds().await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].winning_pick, Some(Pick::new(0x44332211)));
        assert_eq!(rounds[0].ticket_count, 7);
        assert_eq!(rounds[0].winners.len(), 1);
        assert!(EventStore::new(&storage).count_events().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_rejects_invalid_winning_pick() {
        let dir = tempdir().unwrap();
        let config = CliConfig::resolve(Some(dir.path().to_path_buf()), None, false).unwrap();

        let opts = SimulateOptions {
            winning_pick: Some("0x80000000".to_string()),
            ..options()
        };
        assert!(simulate(&config, opts).await.is_err());
        assert!(!config.db_path().exists());
    }
}

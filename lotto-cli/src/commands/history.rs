use super::simulate::sats;
use crate::config::CliConfig;
use comfy_table::{presets::UTF8_FULL, Table};
use lotto_core::{EventStore, NotificationKind, RoundStore, Storage};

pub async fn history(config: &CliConfig) -> anyhow::Result<()> {
    let storage = Storage::new(&config.db_path()).await?;
    let rounds = RoundStore::new(&storage).list_rounds().await?;

    if rounds.is_empty() {
        println!("No finalized rounds found.");
        println!("Run a round with: lotto simulate");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "#",
        "Round",
        "Version",
        "Winning pick",
        "Tickets",
        "Wagered",
        "Winners",
        "Prize each",
    ]);

    for (index, round) in rounds.iter().enumerate() {
        table.add_row(vec![
            index.to_string(),
            round.address.to_string(),
            round.version.clone(),
            round
                .winning_pick
                .map(|pick| pick.to_string())
                .unwrap_or_else(|| "-".to_string()),
            round.ticket_count.to_string(),
            sats(round.total_wagered),
            round.winners.len().to_string(),
            sats(round.prize_value),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub async fn events(config: &CliConfig, block: u64, kind: Option<NotificationKind>) -> anyhow::Result<()> {
    let storage = Storage::new(&config.db_path()).await?;
    let records = EventStore::new(&storage).load_events_at(block, kind).await?;

    if records.is_empty() {
        println!("No notifications at block {}.", block);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Seq", "Source", "Kind", "Payload"]);

    for record in &records {
        table.add_row(vec![
            record.sequence.to_string(),
            record.source.to_string(),
            record.kind().to_string(),
            serde_json::to_string(&record.notification)?,
        ]);
    }

    println!("{table}");
    Ok(())
}

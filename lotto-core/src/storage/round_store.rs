use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Address, RoundSummary};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

pub struct RoundStore<'a> {
    storage: &'a Storage,
}

impl<'a> RoundStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Appends a finalized round to the persisted history
    pub async fn save_round(&self, summary: &RoundSummary) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO rounds
             (address, version, winning_pick, total_wagered, winner_count, summary, finalized_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                summary.address.to_string(),
                summary.version,
                summary.winning_pick.map(|pick| pick.raw() as i64),
                summary.total_wagered.to_sat() as i64,
                summary.winners.len() as i64,
                serde_json::to_string(summary)?,
                Utc::now().timestamp(),
            ],
        )?;

        tracing::info!(
            "Saved round {} with {} winner(s)",
            summary.address,
            summary.winners.len()
        );
        Ok(())
    }

    pub async fn load_round(&self, address: &Address) -> Result<Option<RoundSummary>> {
        let conn = self.storage.get_connection().await;

        let summary: Option<String> = conn
            .query_row(
                "SELECT summary FROM rounds WHERE address = ?1",
                params![address.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match summary {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn list_rounds(&self) -> Result<Vec<RoundSummary>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT summary FROM rounds ORDER BY position")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut rounds = Vec::new();
        for row in rows {
            rounds.push(serde_json::from_str(&row?)?);
        }

        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pick;
    use bitcoin::Amount;

    fn summary(label: &str, winners: Vec<Address>) -> RoundSummary {
        RoundSummary {
            address: Address::from_label(label),
            version: "0.1.0".to_string(),
            winning_pick: Some(Pick::new(0x44332211)),
            total_wagered: Amount::from_sat(50_000),
            prize_pool: Amount::from_sat(47_500),
            owner_fee: Amount::from_sat(2_500),
            prize_value: Amount::from_sat(23_750),
            winners,
            ticket_count: 5,
        }
    }

    #[tokio::test]
    async fn test_rounds_listed_in_history_order() {
        let storage = Storage::in_memory().await.unwrap();
        let store = RoundStore::new(&storage);

        let first = summary("first", vec![Address::from_label("carol")]);
        let second = summary("second", Vec::new());
        store.save_round(&first).await.unwrap();
        store.save_round(&second).await.unwrap();

        assert_eq!(store.list_rounds().await.unwrap(), vec![first.clone(), second]);
        assert_eq!(
            store.load_round(&first.address).await.unwrap(),
            Some(first)
        );
        assert_eq!(
            store.load_round(&Address::from_label("missing")).await.unwrap(),
            None
        );
    }
}

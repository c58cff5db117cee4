use crate::chain::{EventRecord, NotificationKind};
use crate::error::Result;
use crate::storage::Storage;
use chrono::Utc;
use rusqlite::params;

pub struct EventStore<'a> {
    storage: &'a Storage,
}

impl<'a> EventStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_events(&self, records: &[EventRecord]) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        let recorded_at = Utc::now().timestamp();

        for record in records {
            tx.execute(
                "INSERT INTO events (block, sequence, source, kind, payload, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.block as i64,
                    record.sequence as i64,
                    record.source.to_string(),
                    record.kind().as_str(),
                    serde_json::to_string(&record.notification)?,
                    recorded_at,
                ],
            )?;
        }

        tx.commit()?;
        tracing::info!("Saved {} notifications", records.len());
        Ok(())
    }

    /// Notifications emitted at `block`, optionally narrowed to one kind
    pub async fn load_events_at(
        &self,
        block: u64,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<EventRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT block, sequence, source, payload FROM events
             WHERE block = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![block as i64, kind.map(|k| k.as_str())], |row| {
            let block: i64 = row.get(0)?;
            let sequence: i64 = row.get(1)?;
            let source: String = row.get(2)?;
            let payload: String = row.get(3)?;
            Ok((block, sequence, source, payload))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (block, sequence, source, payload) = row?;
            records.push(EventRecord {
                block: block as u64,
                sequence: sequence as u64,
                source: source.parse()?,
                notification: serde_json::from_str(&payload)?,
            });
        }

        Ok(records)
    }

    pub async fn count_events(&self) -> Result<u64> {
        let conn = self.storage.get_connection().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

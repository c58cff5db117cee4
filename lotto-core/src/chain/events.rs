use crate::error::{CoreError, Result};
use crate::types::{Address, Pick, Salt, H256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Notification emitted by a lottery contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    RoundCreated {
        version: String,
        round: Address,
    },
    RoundStarted {
        salt_hash: H256,
        salt_n_hash: H256,
        closing_block: u64,
        version: String,
    },
    Draw {
        pick: Pick,
        holder: Address,
    },
    RoundCompleted {
        winning_pick: Pick,
        salt: Salt,
        iterations: u8,
    },
    Winner {
        holder: Address,
        winning_pick: Pick,
    },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::RoundCreated { .. } => NotificationKind::RoundCreated,
            Notification::RoundStarted { .. } => NotificationKind::RoundStarted,
            Notification::Draw { .. } => NotificationKind::Draw,
            Notification::RoundCompleted { .. } => NotificationKind::RoundCompleted,
            Notification::Winner { .. } => NotificationKind::Winner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RoundCreated,
    RoundStarted,
    Draw,
    RoundCompleted,
    Winner,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::RoundCreated => "round_created",
            NotificationKind::RoundStarted => "round_started",
            NotificationKind::Draw => "draw",
            NotificationKind::RoundCompleted => "round_completed",
            NotificationKind::Winner => "winner",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "round_created" => Ok(NotificationKind::RoundCreated),
            "round_started" => Ok(NotificationKind::RoundStarted),
            "draw" => Ok(NotificationKind::Draw),
            "round_completed" => Ok(NotificationKind::RoundCompleted),
            "winner" => Ok(NotificationKind::Winner),
            other => Err(CoreError::invalid_input(format!(
                "Unknown notification kind: {}",
                other
            ))),
        }
    }
}

/// A notification pinned to the block and log position it was emitted at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub block: u64,
    pub sequence: u64,
    pub source: Address,
    pub notification: Notification,
}

impl EventRecord {
    pub fn kind(&self) -> NotificationKind {
        self.notification.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            NotificationKind::RoundCreated,
            NotificationKind::RoundStarted,
            NotificationKind::Draw,
            NotificationKind::RoundCompleted,
            NotificationKind::Winner,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("jackpot".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn test_notification_json_is_tagged() {
        let notification = Notification::Draw {
            pick: Pick::new(0x11223344),
            holder: Address::from_label("alice"),
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["kind"], "draw");
        assert_eq!(json["pick"], 0x11223344);
    }
}

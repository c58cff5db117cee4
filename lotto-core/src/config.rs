use crate::error::{CoreError, Result};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LottoConfig {
    /// Exact payment required per wager
    pub ticket_price: Amount,
    /// Share of the wagered total reserved for winners, out of `fraction_base`
    pub payout_fraction: u64,
    pub fraction_base: u64,
    /// Blocks between round creation and its closing block
    pub round_length: u64,
    /// Upper bound on the revealed hash-chain length
    pub max_iterations: u8,
    /// Orchestrator balance at or above which an upgrade is refused
    pub upgrade_threshold: Amount,
    /// Protocol version stamped on every created round
    pub version: String,
    /// Lets the round owner close before the closing block
    pub allow_force_close: bool,
}

impl Default for LottoConfig {
    fn default() -> Self {
        Self {
            ticket_price: Amount::from_sat(10_000),
            payout_fraction: 950,
            fraction_base: 1000,
            round_length: 12_500,
            max_iterations: u8::MAX,
            upgrade_threshold: Amount::from_sat(1_000_000),
            version: "0.1.0".to_string(),
            allow_force_close: false,
        }
    }
}

impl LottoConfig {
    /// Config for rehearsal deployments where rounds may be closed early
    pub fn rehearsal() -> Self {
        Self {
            allow_force_close: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fraction_base == 0 {
            return Err(CoreError::config("Fraction base must be greater than 0"));
        }

        if self.payout_fraction > self.fraction_base {
            return Err(CoreError::config(format!(
                "Payout fraction {} exceeds fraction base {}",
                self.payout_fraction, self.fraction_base
            )));
        }

        if self.ticket_price == Amount::ZERO {
            return Err(CoreError::config("Ticket price must be greater than 0"));
        }

        if self.round_length == 0 {
            return Err(CoreError::config("Round length must be at least one block"));
        }

        if self.max_iterations == 0 {
            return Err(CoreError::config("Max iterations must be greater than 0"));
        }

        if self.version.is_empty() {
            return Err(CoreError::config("Version cannot be empty"));
        }

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

use lotto_core::LottoConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "lotto.json";
const DB_FILE: &str = "lotto.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub verbose: bool,
    pub lotto: LottoConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lotto"),
            verbose: false,
            lotto: LottoConfig::default(),
        }
    }
}

impl CliConfig {
    /// Applies command-line overrides. Game rules come from `config_path` when
    /// given, else from `lotto.json` in the data directory if present.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        config_path: Option<&Path>,
        verbose: bool,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        config.verbose = verbose;

        let default_path = config.data_dir.join(CONFIG_FILE);
        config.lotto = match config_path {
            Some(path) => LottoConfig::load(path)?,
            None if default_path.exists() => LottoConfig::load(&default_path)?,
            None => LottoConfig::default(),
        };

        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }
}

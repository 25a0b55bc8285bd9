use portfolio_optimizer_core::backtest::WeightPolicy;
use portfolio_optimizer_core::portfolio_optimization::SolverSettings;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory searched for `<TICKER>.csv` when neither flag nor file names one.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Defaults loaded from `--config <file.yaml>`. Command-line flags override
/// every value here.
///
/// ```yaml
/// data_dir: ./prices
/// risk_free_rate: 0.045
/// frontier_points: 40
/// lookback_days: 365
/// weight_policy: renormalize
/// solver:
///   max_iterations: 5000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    /// Annual risk-free rate as a decimal (0.06 = 6%).
    pub risk_free_rate: Option<Decimal>,
    pub frontier_points: Option<usize>,
    pub lookback_days: Option<u32>,
    pub solver: Option<SolverSettings>,
    pub weight_policy: Option<WeightPolicy>,
}

impl CliConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
        let config: CliConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// `--data-dir` beats the file, which beats `./data`.
    pub fn resolve_data_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    pub fn solver_settings(&self) -> SolverSettings {
        self.solver.clone().unwrap_or_default()
    }
}

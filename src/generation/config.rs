use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::generation::generator::DEFAULT_MAX_ATTEMPTS;
use crate::generation::sampler::{HestonPriors, RBergomiPriors};
use crate::generation::types::ModelKind;
use crate::models::heston::{HestonEngine, DEFAULT_MAX_EVALUATIONS, DEFAULT_TOLERANCE};
use crate::models::rbergomi::{RBergomiEngine, DEFAULT_PATHS, DEFAULT_STEPS_PER_YEAR};

/// Slice of the shared input file processed by one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Partition index (offset in units of `size`)
    #[serde(default)]
    pub id: usize,
    /// Rows per partition
    #[serde(default = "default_part_size")]
    pub size: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            id: 0,
            size: default_part_size(),
        }
    }
}

impl PartitionConfig {
    /// Positional row range `[id * size, (id + 1) * size)`.
    pub fn range(&self) -> Result<Range<usize>> {
        let start = self
            .id
            .checked_mul(self.size)
            .ok_or_else(|| anyhow!("Partition start overflows: {} * {}", self.id, self.size))?;
        let end = start
            .checked_add(self.size)
            .ok_or_else(|| anyhow!("Partition end overflows: {} + {}", start, self.size))?;
        Ok(start..end)
    }
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Strike/maturity CSV shared by every partition
    #[serde(default = "default_input")]
    pub input: PathBuf,
    /// Output directory; defaults to `./data/heston` or `./data/rBergomi`
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Output files are named `<file_prefix>_<part_id>.csv`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Names of the input columns holding the contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnsConfig {
    /// Moneyness column, used as the strike against a unit spot
    #[serde(default = "default_strike_column")]
    pub strike: String,
    /// Time to maturity in years
    #[serde(default = "default_maturity_column")]
    pub maturity: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            strike: default_strike_column(),
            maturity: default_maturity_column(),
        }
    }
}

/// Market state shared by every contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Spot of the underlying
    #[serde(default = "default_spot")]
    pub spot: f64,
    /// Risk-free rate (Heston only; rBergomi is simulated at zero rate)
    #[serde(default)]
    pub rate: f64,
    /// Dividend yield (Heston only)
    #[serde(default)]
    pub dividend_yield: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            spot: default_spot(),
            rate: 0.0,
            dividend_yield: 0.0,
        }
    }
}

/// Rough Bergomi Monte Carlo budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Paths per rBergomi price
    #[serde(default = "default_mc_samples")]
    pub samples: usize,
    /// Time steps per year of maturity; a contract uses at least one step
    #[serde(default = "default_steps_per_year")]
    pub steps_per_year: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            samples: default_mc_samples(),
            steps_per_year: default_steps_per_year(),
        }
    }
}

impl From<MonteCarloConfig> for RBergomiEngine {
    fn from(config: MonteCarloConfig) -> Self {
        RBergomiEngine::new(config.samples, config.steps_per_year)
    }
}

/// Heston pricing integral settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HestonEngineConfig {
    /// Absolute accuracy of the pricing integral
    #[serde(default = "default_heston_tolerance")]
    pub tolerance: f64,
    /// Integrand evaluations allowed per price before it counts as an engine failure
    #[serde(default = "default_heston_max_evaluations")]
    pub max_evaluations: usize,
}

impl Default for HestonEngineConfig {
    fn default() -> Self {
        Self {
            tolerance: default_heston_tolerance(),
            max_evaluations: default_heston_max_evaluations(),
        }
    }
}

impl From<HestonEngineConfig> for HestonEngine {
    fn from(config: HestonEngineConfig) -> Self {
        HestonEngine::new(config.tolerance, config.max_evaluations)
    }
}

/// Truncated-normal priors of every model parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriorsConfig {
    /// Used when `model = "heston"`
    #[serde(default)]
    pub heston: HestonPriors,
    /// Used when `model = "rbergomi"`; the Hurst exponent table is `[priors.rbergomi.H]`
    #[serde(default)]
    pub rbergomi: RBergomiPriors,
}

/// Contract ranges for in-memory dataset generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Closed moneyness range `[lo, hi]` of the drawn strikes
    #[serde(default = "default_moneyness_range")]
    pub moneyness: (f64, f64),
    /// Closed maturity range `[lo, hi]` in years
    #[serde(default = "default_maturity_range")]
    pub maturity: (f64, f64),
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            moneyness: default_moneyness_range(),
            maturity: default_maturity_range(),
        }
    }
}

/// Main configuration struct for data generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Model labeling the data
    #[serde(default)]
    pub model: ModelKind,

    /// Resampling attempts per strike/maturity pair
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Log progress every this many rows (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Seed for all random streams; `None` draws from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,

    /// Which slice of the input this run labels
    #[serde(default)]
    pub partition: PartitionConfig,

    /// Input file and output location
    #[serde(default)]
    pub paths: PathsConfig,

    /// Input column names
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Spot, rate and dividend yield
    #[serde(default)]
    pub market: MarketConfig,

    /// rBergomi engine settings
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,

    /// Heston engine settings
    #[serde(default)]
    pub heston_engine: HestonEngineConfig,

    /// Parameter priors of both models
    #[serde(default)]
    pub priors: PriorsConfig,

    /// Contract ranges for `generate_data`
    #[serde(default)]
    pub dataset: DatasetConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            max_attempts: default_max_attempts(),
            progress_interval: default_progress_interval(),
            seed: None,
            partition: PartitionConfig::default(),
            paths: PathsConfig::default(),
            columns: ColumnsConfig::default(),
            market: MarketConfig::default(),
            monte_carlo: MonteCarloConfig::default(),
            heston_engine: HestonEngineConfig::default(),
            priors: PriorsConfig::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// rBergomi production run: 40,000 paths, 365 steps per year
    pub fn rbergomi() -> Self {
        Self {
            model: ModelKind::Rbergomi,
            ..Self::default()
        }
    }

    /// Heston production run with the 1e-15 / 1e6 integration settings
    pub fn heston() -> Self {
        Self {
            model: ModelKind::Heston,
            ..Self::default()
        }
    }

    /// Small seeded rBergomi configuration for quick checks and tests
    pub fn smoke() -> Self {
        Self {
            model: ModelKind::Rbergomi,
            partition: PartitionConfig { id: 0, size: 10 },
            progress_interval: 0,
            seed: Some(20_240_101),
            monte_carlo: MonteCarloConfig {
                samples: 500,
                steps_per_year: 52,
            },
            ..Self::default()
        }
    }

    /// Parse a TOML document; every field is optional.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse generator configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialise generator configuration")
    }

    pub fn validate(&self) -> Result<()> {
        if self.partition.size == 0 {
            return Err(anyhow!("partition.size must be > 0"));
        }
        self.partition.range()?;
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.market.spot <= 0.0 || !self.market.spot.is_finite() {
            return Err(anyhow!("market.spot must be > 0, got {}", self.market.spot));
        }
        if !self.market.rate.is_finite() || !self.market.dividend_yield.is_finite() {
            return Err(anyhow!("market.rate and market.dividend_yield must be finite"));
        }
        if self.monte_carlo.samples == 0 || self.monte_carlo.steps_per_year == 0 {
            return Err(anyhow!(
                "monte_carlo.samples and monte_carlo.steps_per_year must be > 0"
            ));
        }
        if !(self.heston_engine.tolerance > 0.0 && self.heston_engine.tolerance.is_finite())
            || self.heston_engine.max_evaluations == 0
        {
            return Err(anyhow!(
                "heston_engine.tolerance and heston_engine.max_evaluations must be > 0"
            ));
        }
        if self.columns.strike == self.columns.maturity {
            return Err(anyhow!(
                "Strike and maturity columns must differ, both are '{}'",
                self.columns.strike
            ));
        }
        let (m_lo, m_hi) = self.dataset.moneyness;
        let (t_lo, t_hi) = self.dataset.maturity;
        let finite = [m_lo, m_hi, t_lo, t_hi].iter().all(|v| v.is_finite());
        if !(finite && m_lo > 0.0 && m_lo <= m_hi && t_lo > 0.0 && t_lo <= t_hi) {
            return Err(anyhow!(
                "dataset ranges must be finite, positive and ordered, got moneyness {:?}, maturity {:?}",
                self.dataset.moneyness,
                self.dataset.maturity
            ));
        }
        match self.model {
            ModelKind::Heston => self.priors.heston.validate(),
            ModelKind::Rbergomi => self.priors.rbergomi.validate(),
        }
    }

    /// Output directory after applying the per-model default.
    pub fn output_dir(&self) -> PathBuf {
        match (&self.paths.output_dir, self.model) {
            (Some(dir), _) => dir.clone(),
            (None, ModelKind::Heston) => PathBuf::from("./data/heston"),
            (None, ModelKind::Rbergomi) => PathBuf::from("./data/rBergomi"),
        }
    }

    /// `<output_dir>/<file_prefix>_<part_id>.csv`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir().join(format!(
            "{}_{}.csv",
            self.paths.file_prefix, self.partition.id
        ))
    }
}

fn default_part_size() -> usize {
    10_000
}

fn default_input() -> PathBuf {
    PathBuf::from("./data/strike_maturity.csv")
}

fn default_file_prefix() -> String {
    "labled_data_all".to_string()
}

fn default_strike_column() -> String {
    "Moneyness".to_string()
}

fn default_maturity_column() -> String {
    "Time to Maturity (years)".to_string()
}

fn default_spot() -> f64 {
    1.0
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_progress_interval() -> usize {
    100
}

fn default_mc_samples() -> usize {
    DEFAULT_PATHS
}

fn default_steps_per_year() -> usize {
    DEFAULT_STEPS_PER_YEAR
}

fn default_heston_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_heston_max_evaluations() -> usize {
    DEFAULT_MAX_EVALUATIONS
}

fn default_moneyness_range() -> (f64, f64) {
    (0.8, 1.2)
}

fn default_maturity_range() -> (f64, f64) {
    (0.05, 2.0)
}

//! # Surface-Datagen: Synthetic Implied Volatility Data for Surrogate Models
//!
//! `surface-datagen` produces labeled training data for neural-network surrogates of
//! stochastic-volatility pricers. For every strike/maturity pair it draws model
//! parameters from truncated-normal priors, prices a European call under the chosen
//! model and stores the Black-Scholes implied volatility of that price as the label.
//!
//! ## Core Features
//!
//! - **Heston**: semi-analytic pricing through an adaptive Gauss-Lobatto integral
//! - **Rough Bergomi**: hybrid-scheme Monte Carlo with seeded random streams
//! - **Bounded resampling**: up to ten parameter draws per contract before it is dropped
//! - **Partitioned batches**: disjoint slices of a shared input file, one output file each
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use surface_datagen::{default_configs, run_partition};
//!
//! let mut config = default_configs::heston();
//! config.partition.id = 3;
//! config.seed = Some(42);
//!
//! let summary = run_partition(&config)?;
//! println!("wrote {} rows to {}", summary.rows_written, summary.output_path.display());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Output Layout
//!
//! Each partition writes `<output_dir>/labled_data_all_<part_id>.csv`: the input
//! columns without the index, then the model parameter columns, then `iv`. Rows whose
//! resampling budget ran out are absent, so no persisted row carries a NaN label.
//!
//! ## Configuration Presets
//!
//! - `rbergomi()`: 40,000 Monte Carlo paths, 365 steps per year
//! - `heston()`: integration tolerance 1e-15, at most 1e6 integrand evaluations
//! - `smoke()`: seeded rBergomi run with a tiny Monte Carlo budget

// ================================================================================================
// MODULES
// ================================================================================================

pub mod generation;
pub mod logging;
pub mod model_params;
pub mod models;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Configuration
pub use generation::config::{
    ColumnsConfig, DatasetConfig, GeneratorConfig, HestonEngineConfig, MarketConfig,
    MonteCarloConfig, PartitionConfig, PathsConfig, PriorsConfig,
};

// Generation building blocks
pub use generation::dataset::{generate_data, generate_data_with, Dataset};
pub use generation::generator::{generate_sample, DEFAULT_MAX_ATTEMPTS};
pub use generation::pipeline::{run_partition, run_partition_with, PartitionSummary};
pub use generation::pricer::{HestonPricer, PricerAdapter, RBergomiPricer};
pub use generation::sampler::{
    stream_rng, HestonPriors, HestonSampler, ParameterSampler, RBergomiPriors, RBergomiSampler,
    TruncatedNormal,
};
pub use generation::types::{Contract, LabeledSample, ModelKind, PricingResult, SampleOutcome};

// Model parameter types
pub use model_params::{HestonParams, ModelParams, RBergomiParams};

// Pricing engines
pub use models::bs::{bs_call_price, implied_volatility};
pub use models::heston::HestonEngine;
pub use models::rbergomi::RBergomiEngine;

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured generator settings.
///
/// # Available Configurations
///
/// - [`rbergomi()`]: Production rough Bergomi run
/// - [`heston()`]: Production Heston run
/// - [`smoke()`]: Quick seeded run for checks
pub mod default_configs {
    use crate::generation::config::GeneratorConfig;

    /// Production rough Bergomi configuration.
    ///
    /// **Characteristics:**
    /// - 40,000 Monte Carlo paths per price
    /// - 365 time steps per year of maturity
    /// - Output under `./data/rBergomi`
    ///
    /// # Example
    ///
    /// ```rust
    /// use surface_datagen::default_configs;
    ///
    /// let config = default_configs::rbergomi();
    /// assert_eq!(config.monte_carlo.samples, 40_000);
    /// ```
    pub fn rbergomi() -> GeneratorConfig {
        GeneratorConfig::rbergomi()
    }

    /// Production Heston configuration.
    ///
    /// **Characteristics:**
    /// - Absolute integration tolerance 1e-15
    /// - At most 1,000,000 integrand evaluations per price
    /// - Output under `./data/heston`
    ///
    /// # Example
    ///
    /// ```rust
    /// use surface_datagen::{default_configs, ModelKind};
    ///
    /// let config = default_configs::heston();
    /// assert_eq!(config.model, ModelKind::Heston);
    /// ```
    pub fn heston() -> GeneratorConfig {
        GeneratorConfig::heston()
    }

    /// Seeded rough Bergomi configuration with 10-row partitions and 500 paths.
    ///
    /// Meant for tests and for checking an input file before a full run.
    pub fn smoke() -> GeneratorConfig {
        GeneratorConfig::smoke()
    }
}

//! `surface-datagen` command line.
//!
//! - `surface-datagen partition --model heston --part-id 3` labels one partition of
//!   the strike/maturity file
//! - `surface-datagen generate --samples 1000 --output data/train.csv` writes an
//!   in-memory dataset over random contracts
//! - `surface-datagen show-config` prints the effective configuration as TOML

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use surface_datagen::logging::init_tracing;
use surface_datagen::{generate_data, run_partition, GeneratorConfig, ModelKind};

/// Synthetic implied volatility data under Heston and rough Bergomi
#[derive(Parser)]
#[command(name = "surface-datagen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Values that take precedence over the configuration file
#[derive(Args)]
struct Overrides {
    /// Pricing model
    #[arg(short, long, global = true, value_enum)]
    model: Option<ModelKind>,

    /// Partition index
    #[arg(long, global = true)]
    part_id: Option<usize>,

    /// Rows per partition
    #[arg(long, global = true)]
    part_size: Option<usize>,

    /// Strike/maturity input file
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Directory for partition output files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Monte Carlo paths per rBergomi price
    #[arg(long, global = true)]
    mc_samples: Option<usize>,

    /// Seed for all random streams
    #[arg(short, long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Label one partition of the strike/maturity file
    Partition,

    /// Label randomly drawn contracts and write them as a feature/label CSV
    Generate {
        /// Number of contracts to draw
        #[arg(short = 'n', long, default_value = "1000")]
        samples: usize,

        /// Output CSV path
        #[arg(short, long, default_value = "./data/dataset.csv")]
        output: PathBuf,
    },

    /// Print the effective configuration
    ShowConfig,
}

impl Overrides {
    fn apply(self, config: &mut GeneratorConfig) {
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(id) = self.part_id {
            config.partition.id = id;
        }
        if let Some(size) = self.part_size {
            config.partition.size = size;
        }
        if let Some(input) = self.input {
            config.paths.input = input;
        }
        if let Some(dir) = self.output_dir {
            config.paths.output_dir = Some(dir);
        }
        if let Some(samples) = self.mc_samples {
            config.monte_carlo.samples = samples;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

fn load_config(path: Option<&PathBuf>, overrides: Overrides) -> Result<GeneratorConfig> {
    let mut config = match path {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref(), cli.overrides)?;

    match cli.command {
        Commands::Partition => {
            let summary = run_partition(&config)?;
            info!(
                "partition {} rows {}..{}: loaded {}, written {}, exhausted {}, missing input {} -> {}",
                summary.part_id,
                summary.range.start,
                summary.range.end,
                summary.rows_loaded,
                summary.rows_written,
                summary.rows_exhausted,
                summary.rows_missing_input,
                summary.output_path.display()
            );
        }
        Commands::Generate { samples, output } => {
            let dataset = generate_data(samples, &config)?;
            dataset.write_csv(&output)?;
            info!(
                "wrote {} of {} samples to {}",
                dataset.len(),
                samples,
                output.display()
            );
        }
        Commands::ShowConfig => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

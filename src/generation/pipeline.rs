use std::ops::Range;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::generation::config::GeneratorConfig;
use crate::generation::generator::generate_sample;
use crate::generation::io::{read_partition, write_labeled_rows, LabeledRow};
use crate::generation::pricer::{HestonPricer, PricerAdapter, RBergomiPricer};
use crate::generation::sampler::{stream_rng, HestonSampler, ParameterSampler, RBergomiSampler};
use crate::generation::types::{Contract, ModelKind, SampleOutcome};
use crate::model_params::ModelParams;

/// What one partition run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary {
    pub part_id: usize,
    /// Positional input range requested
    pub range: Range<usize>,
    /// Rows actually present in the input for that range
    pub rows_loaded: usize,
    pub rows_written: usize,
    /// Rows whose resampling budget ran out
    pub rows_exhausted: usize,
    /// Rows dropped for missing input values, without pricing
    pub rows_missing_input: usize,
    pub output_path: PathBuf,
}

/// Random stream ids of one partition: samplers and Monte Carlo never share a stream,
/// and neither do two partitions.
fn sampler_stream(part_id: usize) -> u64 {
    2 * part_id as u64
}

fn pricer_stream(part_id: usize) -> u64 {
    2 * part_id as u64 + 1
}

/// Run the configured model over the configured partition and write its output file.
pub fn run_partition(config: &GeneratorConfig) -> Result<PartitionSummary> {
    config.validate()?;
    let part_id = config.partition.id;

    match config.model {
        ModelKind::Heston => {
            let sampler = HestonSampler::new(
                config.priors.heston.clone(),
                stream_rng(config.seed, sampler_stream(part_id)),
            );
            let pricer = HestonPricer::new(config.heston_engine.into());
            run_partition_with(config, sampler, pricer)
        }
        ModelKind::Rbergomi => {
            let sampler = RBergomiSampler::new(
                config.priors.rbergomi.clone(),
                stream_rng(config.seed, sampler_stream(part_id)),
            );
            let pricer = RBergomiPricer::new(
                config.monte_carlo.into(),
                stream_rng(config.seed, pricer_stream(part_id)),
            );
            run_partition_with(config, sampler, pricer)
        }
    }
}

/// Batch driver over an arbitrary sampler/pricer pair.
///
/// Every row is resolved independently; no row-level failure aborts the run.
/// Only I/O and malformed-input errors are returned.
pub fn run_partition_with<S, A>(
    config: &GeneratorConfig,
    mut sampler: S,
    mut pricer: A,
) -> Result<PartitionSummary>
where
    S: ParameterSampler,
    S::Params: ModelParams,
    A: PricerAdapter<Params = S::Params>,
{
    let range = config.partition.range()?;
    info!("loading K_T data from {}", config.paths.input.display());
    info!("rows from {} to {}", range.start, range.end);

    let input = read_partition(&config.paths.input, &config.columns, range.clone())?;
    let rows_loaded = input.rows.len();
    info!("K_T shape: ({}, {})", rows_loaded, input.headers.len());
    for row in input.rows.iter().take(5) {
        debug!("K_T row {} (line {}): {:?}", row.row_id, row.position, row.cells);
    }

    info!("start generating data with model {}", config.model);
    let mut labeled = Vec::with_capacity(rows_loaded);
    let mut rows_exhausted = 0;
    let mut rows_missing_input = 0;

    for (i, row) in input.rows.iter().enumerate() {
        if config.progress_interval > 0 && i > 0 && i % config.progress_interval == 0 {
            info!("progress: {}/{} rows", i, rows_loaded);
        }

        if row.has_missing_value() {
            debug!(
                "row {} (line {}): missing input value, skipped",
                row.row_id, row.position
            );
            rows_missing_input += 1;
            continue;
        }

        let contract = Contract {
            strike: row.moneyness,
            maturity: row.time_to_maturity_years,
            spot: config.market.spot,
            rate: config.market.rate,
            dividend_yield: config.market.dividend_yield,
        };

        match generate_sample(&contract, &mut sampler, &mut pricer, config.max_attempts) {
            SampleOutcome::Resolved(sample) => {
                let labeled_row = LabeledRow {
                    cells: row.cells.clone(),
                    params: sample.params.values(),
                    implied_vol: sample.implied_vol,
                };
                if labeled_row.is_complete() {
                    labeled.push(labeled_row);
                }
            }
            SampleOutcome::Exhausted { attempts, .. } => {
                debug!(
                    "row {} (line {}): dropped after {} attempts",
                    row.row_id, row.position, attempts
                );
                rows_exhausted += 1;
            }
        }
    }
    info!("progress: {}/{} rows", rows_loaded, rows_loaded);

    info!(
        "labeled {} of {} rows ({} exhausted, {} missing input)",
        labeled.len(),
        rows_loaded,
        rows_exhausted,
        rows_missing_input
    );

    let output_path = config.output_path();
    info!("writing to {}", output_path.display());
    write_labeled_rows(
        &output_path,
        &input.headers,
        S::Params::column_names(),
        &labeled,
    )?;

    Ok(PartitionSummary {
        part_id: config.partition.id,
        range,
        rows_loaded,
        rows_written: labeled.len(),
        rows_exhausted,
        rows_missing_input,
        output_path,
    })
}

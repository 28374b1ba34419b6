//! In-memory dataset generation over randomly drawn contracts.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{info, warn};

use crate::generation::config::GeneratorConfig;
use crate::generation::generator::generate_sample;
use crate::generation::io::IV_COLUMN;
use crate::generation::pricer::{HestonPricer, PricerAdapter, RBergomiPricer};
use crate::generation::sampler::{stream_rng, HestonSampler, ParameterSampler, RBergomiSampler};
use crate::generation::types::{Contract, ModelKind, SampleOutcome};
use crate::model_params::ModelParams;

/// Stream ids reserved for dataset generation, disjoint from any realistic partition id.
const CONTRACT_STREAM: u64 = u64::MAX;
const SAMPLER_STREAM: u64 = u64::MAX - 1;
const PRICER_STREAM: u64 = u64::MAX - 2;

/// Feature matrix and labels ready for a surrogate model.
///
/// Each feature row is `[params..., strike, maturity]`; `labels[i]` is the
/// implied volatility of `features[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Write features and labels to `path`, label last.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create dataset file {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);

        let mut header: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        header.push(IV_COLUMN);
        writer.write_record(&header)?;

        for (row, label) in self.features.iter().zip(&self.labels) {
            let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            record.push(label.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Draw `n_samples` contracts and label each with the configured model.
///
/// Contracts whose resampling budget runs out are left out, so the dataset may
/// hold fewer than `n_samples` rows.
pub fn generate_data(n_samples: usize, config: &GeneratorConfig) -> Result<Dataset> {
    config.validate()?;
    let contract_rng = stream_rng(config.seed, CONTRACT_STREAM);

    match config.model {
        ModelKind::Heston => {
            let sampler = HestonSampler::new(
                config.priors.heston.clone(),
                stream_rng(config.seed, SAMPLER_STREAM),
            );
            let pricer = HestonPricer::new(config.heston_engine.into());
            generate_data_with(n_samples, config, contract_rng, sampler, pricer)
        }
        ModelKind::Rbergomi => {
            let sampler = RBergomiSampler::new(
                config.priors.rbergomi.clone(),
                stream_rng(config.seed, SAMPLER_STREAM),
            );
            let pricer = RBergomiPricer::new(
                config.monte_carlo.into(),
                stream_rng(config.seed, PRICER_STREAM),
            );
            generate_data_with(n_samples, config, contract_rng, sampler, pricer)
        }
    }
}

/// [`generate_data`] over an explicit contract stream, sampler and pricer.
pub fn generate_data_with<R, S, A>(
    n_samples: usize,
    config: &GeneratorConfig,
    mut contract_rng: R,
    mut sampler: S,
    mut pricer: A,
) -> Result<Dataset>
where
    R: Rng,
    S: ParameterSampler,
    S::Params: ModelParams,
    A: PricerAdapter<Params = S::Params>,
{
    let (m_lo, m_hi) = config.dataset.moneyness;
    let (t_lo, t_hi) = config.dataset.maturity;

    let mut feature_names: Vec<String> = S::Params::column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    feature_names.push("strike".to_string());
    feature_names.push("maturity".to_string());

    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);

    info!("generating {} samples with model {}", n_samples, config.model);
    for i in 0..n_samples {
        if config.progress_interval > 0 && i > 0 && i % config.progress_interval == 0 {
            info!("progress: {}/{} samples", i, n_samples);
        }

        let contract = Contract {
            strike: draw_in(&mut contract_rng, m_lo, m_hi),
            maturity: draw_in(&mut contract_rng, t_lo, t_hi),
            spot: config.market.spot,
            rate: config.market.rate,
            dividend_yield: config.market.dividend_yield,
        };

        if let SampleOutcome::Resolved(sample) =
            generate_sample(&contract, &mut sampler, &mut pricer, config.max_attempts)
        {
            let mut row = sample.params.values();
            row.push(contract.strike);
            row.push(contract.maturity);
            features.push(row);
            labels.push(sample.implied_vol);
        }
    }

    if labels.len() < n_samples {
        warn!(
            "{} of {} contracts could not be labeled",
            n_samples - labels.len(),
            n_samples
        );
    }

    Ok(Dataset {
        feature_names,
        features,
        labels,
    })
}

fn draw_in<R: Rng>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if lo < hi {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::types::PricingResult;
    use crate::model_params::HestonParams;

    fn fixed_params() -> HestonParams {
        HestonParams {
            lambda: 1.5,
            vbar: 0.04,
            eta: 0.3,
            rho: -0.7,
            v0: 0.04,
        }
    }

    struct ConstantPricer(f64);

    impl PricerAdapter for ConstantPricer {
        type Params = HestonParams;

        fn price(&mut self, _: &HestonParams, _: &Contract) -> PricingResult {
            PricingResult {
                price: 0.1,
                implied_vol: self.0,
            }
        }
    }

    #[test]
    fn test_features_follow_parameter_columns() {
        let config = GeneratorConfig::heston();
        let dataset = generate_data_with(
            20,
            &config,
            stream_rng(Some(3), 0),
            fixed_params,
            ConstantPricer(0.25),
        )
        .unwrap();

        assert_eq!(
            dataset.feature_names,
            vec!["lambda", "vbar", "eta", "rho", "v0", "strike", "maturity"]
        );
        assert_eq!(dataset.len(), 20);
        for row in &dataset.features {
            assert_eq!(row.len(), 7);
            assert_eq!(&row[..5], fixed_params().values().as_slice());
            assert!((0.8..=1.2).contains(&row[5]));
            assert!((0.05..=2.0).contains(&row[6]));
        }
        assert!(dataset.labels.iter().all(|&iv| iv == 0.25));
    }

    #[test]
    fn test_unlabeled_contracts_are_dropped() {
        let config = GeneratorConfig::heston();
        let dataset = generate_data_with(
            5,
            &config,
            stream_rng(Some(3), 0),
            fixed_params,
            ConstantPricer(f64::NAN),
        )
        .unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.feature_names.len(), 7);
    }

    #[test]
    fn test_heston_dataset_is_labeled() {
        let mut config = GeneratorConfig::heston();
        config.seed = Some(11);
        let dataset = generate_data(4, &config).unwrap();
        assert!(!dataset.is_empty());
        assert!(dataset.labels.iter().all(|iv| iv.is_finite() && *iv > 0.0));
    }
}

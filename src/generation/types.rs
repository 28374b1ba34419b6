use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which stochastic model labels the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Heston, priced with the semi-analytic engine
    Heston,
    /// Rough Bergomi, priced by Monte Carlo
    #[default]
    #[serde(alias = "rBergomi")]
    #[value(alias = "rBergomi")]
    Rbergomi,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Heston => write!(f, "heston"),
            ModelKind::Rbergomi => write!(f, "rbergomi"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "heston" => Ok(ModelKind::Heston),
            "rbergomi" => Ok(ModelKind::Rbergomi),
            other => Err(anyhow::anyhow!("Unknown model: {}", other)),
        }
    }
}

/// European call contract and market state handed to a pricer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contract {
    /// Strike (the input moneyness, spot being normalised to 1)
    pub strike: f64,
    /// Time to maturity in years
    pub maturity: f64,
    /// Spot price
    pub spot: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Continuous dividend yield
    pub dividend_yield: f64,
}

/// Model price and Black-Scholes implied volatility for one contract.
///
/// Both fields are NaN when the pricing engine failed; only `implied_vol` is NaN
/// when the price failed the intrinsic-value floor or could not be inverted.
#[derive(Debug, Clone, Copy)]
pub struct PricingResult {
    pub price: f64,
    pub implied_vol: f64,
}

impl PricingResult {
    /// Result of a failed engine call.
    pub fn nan() -> Self {
        Self {
            price: f64::NAN,
            implied_vol: f64::NAN,
        }
    }

    /// True when the implied volatility is a usable label.
    pub fn is_valid(&self) -> bool {
        self.implied_vol.is_finite()
    }
}

/// One input row of the strike/maturity file.
#[derive(Debug, Clone, PartialEq)]
pub struct StrikeMaturityRow {
    /// Value of the leading index column (falls back to the file position)
    pub row_id: u64,
    /// Zero-based position among the data records of the input file
    pub position: usize,
    /// Moneyness, used directly as the strike; NaN when missing or unparsable
    pub moneyness: f64,
    /// Time to maturity in years; NaN when missing or unparsable
    pub time_to_maturity_years: f64,
    /// Raw cells of the row without the index column, written back verbatim
    pub cells: Vec<String>,
}

/// Spellings treated as missing values in input cells.
const MISSING_MARKERS: [&str; 6] = ["", "nan", "na", "n/a", "null", "none"];

pub(crate) fn is_missing_cell(cell: &str) -> bool {
    let trimmed = cell.trim().to_lowercase();
    MISSING_MARKERS.contains(&trimmed.as_str())
}

impl StrikeMaturityRow {
    /// True when any input cell is missing or the contract fields are not finite.
    pub fn has_missing_value(&self) -> bool {
        !self.moneyness.is_finite()
            || !self.time_to_maturity_years.is_finite()
            || self.cells.iter().any(|c| is_missing_cell(c))
    }
}

/// A resolved draw: the parameters that produced a finite implied volatility.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample<P> {
    pub params: P,
    pub implied_vol: f64,
    /// Number of sampling attempts spent, including the successful one
    pub attempts: usize,
}

/// Outcome of the bounded resampling loop for one strike/maturity pair.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome<P> {
    Resolved(LabeledSample<P>),
    /// Every attempt failed; carries the parameters of the last attempt.
    Exhausted { last_params: P, attempts: usize },
}

impl<P> SampleOutcome<P> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, SampleOutcome::Resolved(_))
    }

    /// Parameters of the successful (or last) attempt.
    pub fn params(&self) -> &P {
        match self {
            SampleOutcome::Resolved(sample) => &sample.params,
            SampleOutcome::Exhausted { last_params, .. } => last_params,
        }
    }

    /// Implied volatility label, NaN for an exhausted outcome.
    pub fn implied_vol(&self) -> f64 {
        match self {
            SampleOutcome::Resolved(sample) => sample.implied_vol,
            SampleOutcome::Exhausted { .. } => f64::NAN,
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            SampleOutcome::Resolved(sample) => sample.attempts,
            SampleOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn into_sample(self) -> Option<LabeledSample<P>> {
        match self {
            SampleOutcome::Resolved(sample) => Some(sample),
            SampleOutcome::Exhausted { .. } => None,
        }
    }
}

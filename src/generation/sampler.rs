//! Parameter samplers: independent truncated-normal priors per model parameter.
//!
//! Bounds follow the `scipy.stats.truncnorm(a, b, loc, scale)` convention: `lower`
//! and `upper` are expressed in standard deviations from the mean.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};

use crate::model_params::{HestonParams, RBergomiParams};

/// Source of model parameter tuples.
pub trait ParameterSampler {
    type Params;

    fn sample(&mut self) -> Self::Params;
}

impl<P, F: FnMut() -> P> ParameterSampler for F {
    type Params = P;

    fn sample(&mut self) -> P {
        self()
    }
}

/// Build the RNG for one stream of a run.
///
/// With a seed, each `stream` gets its own deterministic generator; without one the
/// generator is seeded from OS entropy.
pub fn stream_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_entropy(),
    }
}

fn std_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

fn std_normal_inv_cdf(p: f64) -> f64 {
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

fn std_normal_sf(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

fn std_normal_inv_sf(q: f64) -> f64 {
    std::f64::consts::SQRT_2 * erfc_inv(2.0 * q)
}

/// Normal distribution truncated to `[mean + lower*std, mean + upper*std]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncatedNormal {
    pub mean: f64,
    pub std: f64,
    /// Lower bound, in standard deviations from the mean
    pub lower: f64,
    /// Upper bound, in standard deviations from the mean
    pub upper: f64,
}

impl TruncatedNormal {
    pub fn new(mean: f64, std: f64, lower: f64, upper: f64) -> Result<Self> {
        let dist = Self {
            mean,
            std,
            lower,
            upper,
        };
        dist.validate()?;
        Ok(dist)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mean.is_finite() {
            return Err(anyhow!("Prior mean must be finite, got {}", self.mean));
        }
        if self.std <= 0.0 || !self.std.is_finite() {
            return Err(anyhow!("Prior std must be > 0 and finite, got {}", self.std));
        }
        if self.lower.is_nan() || self.upper.is_nan() || self.lower >= self.upper {
            return Err(anyhow!(
                "Prior bounds must satisfy lower < upper, got [{}, {}]",
                self.lower,
                self.upper
            ));
        }
        Ok(())
    }

    /// Closed support `[min, max]` in parameter units.
    pub fn support(&self) -> (f64, f64) {
        (
            self.mean + self.lower * self.std,
            self.mean + self.upper * self.std,
        )
    }

    /// Inverse-CDF draw, clipped to the support.
    ///
    /// Bands above the mean are inverted through the survival function so that
    /// far upper-tail truncations keep their resolution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        let z = if self.lower > 0.0 {
            let q_lo = std_normal_sf(self.lower);
            let q_hi = std_normal_sf(self.upper);
            std_normal_inv_sf(q_hi + (q_lo - q_hi) * u)
        } else {
            let p_lo = std_normal_cdf(self.lower);
            let p_hi = std_normal_cdf(self.upper);
            std_normal_inv_cdf(p_lo + (p_hi - p_lo) * u)
        };
        self.mean + self.std * z.clamp(self.lower, self.upper)
    }
}

/// Priors of the Heston parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HestonPriors {
    /// Mean-reversion speed
    pub lambda: TruncatedNormal,
    pub vbar: TruncatedNormal,
    pub eta: TruncatedNormal,
    pub rho: TruncatedNormal,
    pub v0: TruncatedNormal,
}

impl Default for HestonPriors {
    fn default() -> Self {
        Self {
            lambda: TruncatedNormal {
                mean: 1.5,
                std: 1.0,
                lower: -1.4,
                upper: 5.0,
            },
            vbar: TruncatedNormal {
                mean: 0.06,
                std: 0.04,
                lower: -1.25,
                upper: 6.0,
            },
            eta: TruncatedNormal {
                mean: 0.5,
                std: 0.3,
                lower: -1.5,
                upper: 5.0,
            },
            rho: TruncatedNormal {
                mean: -0.6,
                std: 0.25,
                lower: -1.56,
                upper: 2.4,
            },
            v0: TruncatedNormal {
                mean: 0.06,
                std: 0.04,
                lower: -1.25,
                upper: 6.0,
            },
        }
    }
}

impl HestonPriors {
    pub fn validate(&self) -> Result<()> {
        for (name, prior) in [
            ("lambda", &self.lambda),
            ("vbar", &self.vbar),
            ("eta", &self.eta),
            ("rho", &self.rho),
            ("v0", &self.v0),
        ] {
            prior
                .validate()
                .map_err(|e| anyhow!("Heston prior '{}': {}", name, e))?;
        }
        Ok(())
    }
}

/// Priors of the rough Bergomi parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RBergomiPriors {
    /// Hurst exponent; draws outside (0, 0.5] are rejected by the engine and resampled
    #[serde(rename = "H")]
    pub h: TruncatedNormal,
    pub eta: TruncatedNormal,
    pub rho: TruncatedNormal,
    pub v0: TruncatedNormal,
}

impl Default for RBergomiPriors {
    fn default() -> Self {
        Self {
            h: TruncatedNormal {
                mean: 0.07,
                std: 0.05,
                lower: -1.2,
                upper: 8.6,
            },
            eta: TruncatedNormal {
                mean: 2.5,
                std: 0.5,
                lower: -3.0,
                upper: 3.0,
            },
            rho: TruncatedNormal {
                mean: -0.95,
                std: 0.2,
                lower: -0.25,
                upper: 2.25,
            },
            v0: TruncatedNormal {
                mean: 0.3,
                std: 0.1,
                lower: -2.5,
                upper: 7.0,
            },
        }
    }
}

impl RBergomiPriors {
    pub fn validate(&self) -> Result<()> {
        for (name, prior) in [
            ("H", &self.h),
            ("eta", &self.eta),
            ("rho", &self.rho),
            ("v0", &self.v0),
        ] {
            prior
                .validate()
                .map_err(|e| anyhow!("rBergomi prior '{}': {}", name, e))?;
        }
        Ok(())
    }
}

/// Draws [`HestonParams`] from [`HestonPriors`].
#[derive(Debug, Clone)]
pub struct HestonSampler<R = StdRng> {
    priors: HestonPriors,
    rng: R,
}

impl<R: Rng> HestonSampler<R> {
    pub fn new(priors: HestonPriors, rng: R) -> Self {
        Self { priors, rng }
    }
}

impl<R: Rng> ParameterSampler for HestonSampler<R> {
    type Params = HestonParams;

    fn sample(&mut self) -> HestonParams {
        let p = &self.priors;
        HestonParams {
            lambda: p.lambda.sample(&mut self.rng),
            vbar: p.vbar.sample(&mut self.rng),
            eta: p.eta.sample(&mut self.rng),
            rho: p.rho.sample(&mut self.rng),
            v0: p.v0.sample(&mut self.rng),
        }
    }
}

/// Draws [`RBergomiParams`] from [`RBergomiPriors`].
#[derive(Debug, Clone)]
pub struct RBergomiSampler<R = StdRng> {
    priors: RBergomiPriors,
    rng: R,
}

impl<R: Rng> RBergomiSampler<R> {
    pub fn new(priors: RBergomiPriors, rng: R) -> Self {
        Self { priors, rng }
    }
}

impl<R: Rng> ParameterSampler for RBergomiSampler<R> {
    type Params = RBergomiParams;

    fn sample(&mut self) -> RBergomiParams {
        let p = &self.priors;
        RBergomiParams {
            h: p.h.sample(&mut self.rng),
            eta: p.eta.sample(&mut self.rng),
            rho: p.rho.sample(&mut self.rng),
            v0: p.v0.sample(&mut self.rng),
        }
    }
}

//! Model parameter tuples drawn by the samplers and consumed by the pricers.
//!
//! Every model provides its own struct implementing [`ModelParams`] so that the
//! batch driver can append the drawn parameters to an output row without knowing
//! which model produced them.

use serde::{Deserialize, Serialize};

/// Common interface of the per-model parameter tuples.
pub trait ModelParams: Clone + std::fmt::Debug {
    /// Output column names, in the order produced by [`ModelParams::values`].
    fn column_names() -> &'static [&'static str];

    /// Parameter values in column order.
    fn values(&self) -> Vec<f64>;
}

/// Heston stochastic-volatility parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HestonParams {
    /// Mean-reversion speed of the variance.
    pub lambda: f64,
    /// Long-run variance (> 0).
    pub vbar: f64,
    /// Volatility of variance (> 0).
    pub eta: f64,
    /// Spot/variance correlation in [-1, 1].
    pub rho: f64,
    /// Spot variance (> 0).
    pub v0: f64,
}

impl ModelParams for HestonParams {
    fn column_names() -> &'static [&'static str] {
        &["lambda", "vbar", "eta", "rho", "v0"]
    }

    fn values(&self) -> Vec<f64> {
        vec![self.lambda, self.vbar, self.eta, self.rho, self.v0]
    }
}

/// Rough Bergomi parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RBergomiParams {
    /// Hurst exponent of the fractional variance driver, in (0, 0.5].
    #[serde(rename = "H")]
    pub h: f64,
    /// Volatility of variance (> 0).
    pub eta: f64,
    /// Spot/variance correlation in [-1, 1].
    pub rho: f64,
    /// Spot variance, used as a flat forward variance curve (> 0).
    pub v0: f64,
}

impl ModelParams for RBergomiParams {
    fn column_names() -> &'static [&'static str] {
        &["H", "eta", "rho", "v0"]
    }

    fn values(&self) -> Vec<f64> {
        vec![self.h, self.eta, self.rho, self.v0]
    }
}

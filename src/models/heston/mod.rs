//! Semi-analytic Heston pricing for European calls.
//!
//! The call price is obtained from the Lewis/Gatheral single-integral representation
//!
//! ```text
//! C = e^{-rT} * (F - sqrt(F K) / π * ∫_0^∞ Re[e^{i u ln(F/K)} ψ(u - i/2)] / (u² + 1/4) du)
//! ```
//!
//! where ψ is the characteristic function of `ln(S_T / F)` in the "little trap"
//! formulation (no branch-cut discontinuities).  The half-line is mapped onto
//! `[0, 1)` through `u = x / (1 - x)` and integrated with adaptive Gauss–Lobatto.

use std::f64::consts::PI;

use anyhow::{anyhow, Result};
use num_complex::Complex64;

use crate::model_params::HestonParams;
use crate::models::quadrature::GaussLobatto;

/// Default absolute accuracy of the pricing integral.
pub const DEFAULT_TOLERANCE: f64 = 1e-15;
/// Default cap on integrand evaluations.
pub const DEFAULT_MAX_EVALUATIONS: usize = 1_000_000;

/// Closed-form Heston engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonEngine {
    integrator: GaussLobatto,
}

impl Default for HestonEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_MAX_EVALUATIONS)
    }
}

fn validate_heston_params(p: &HestonParams) -> Result<()> {
    if !p.lambda.is_finite() {
        return Err(anyhow!("Heston lambda must be finite, got {}", p.lambda));
    }
    if p.vbar < 0.0 || !p.vbar.is_finite() {
        return Err(anyhow!("Heston vbar must be >= 0 and finite, got {}", p.vbar));
    }
    if p.eta <= 0.0 || !p.eta.is_finite() {
        return Err(anyhow!("Heston eta must be > 0 and finite, got {}", p.eta));
    }
    if !(-1.0..=1.0).contains(&p.rho) {
        return Err(anyhow!("Heston rho must be in [-1, 1], got {}", p.rho));
    }
    if p.v0 < 0.0 || !p.v0.is_finite() {
        return Err(anyhow!("Heston v0 must be >= 0 and finite, got {}", p.v0));
    }
    Ok(())
}

/// Characteristic function of `ln(S_T / F)` evaluated at complex `u`.
fn characteristic_fn(p: &HestonParams, u: Complex64, t: f64) -> Complex64 {
    let i = Complex64::new(0.0, 1.0);
    let one = Complex64::new(1.0, 0.0);

    let sigma2 = p.eta * p.eta;
    let iu = i * u;
    let beta = Complex64::new(p.lambda, 0.0) - p.rho * p.eta * iu;
    let quad = u * u + iu;

    let d = (beta * beta + sigma2 * quad).sqrt();
    // beta - d without cancellation: (beta^2 - d^2) / (beta + d)
    let beta_minus_d = -sigma2 * quad / (beta + d);
    let g = beta_minus_d / (beta + d);
    let exp_neg_dt = (-d * t).exp();

    let log_term = ((one - g * exp_neg_dt) / (one - g)).ln();
    let c = (p.lambda * p.vbar / sigma2) * (beta_minus_d * t - 2.0 * log_term);
    let dd = (beta_minus_d / sigma2) * ((one - exp_neg_dt) / (one - g * exp_neg_dt));

    (c + dd * p.v0).exp()
}

impl HestonEngine {
    pub fn new(tolerance: f64, max_evaluations: usize) -> Self {
        Self {
            integrator: GaussLobatto::new(tolerance, max_evaluations),
        }
    }

    /// Price of a European call with maturity `t` (years).
    ///
    /// Returns an error when the parameters are outside the model domain or the
    /// integration does not converge within the evaluation budget.
    pub fn call_price(
        &self,
        params: &HestonParams,
        spot: f64,
        strike: f64,
        t: f64,
        rate: f64,
        dividend_yield: f64,
    ) -> Result<f64> {
        validate_heston_params(params)?;
        if spot <= 0.0 || strike <= 0.0 || !spot.is_finite() || !strike.is_finite() {
            return Err(anyhow!(
                "Spot and strike must be > 0 and finite, got spot={}, strike={}",
                spot,
                strike
            ));
        }
        if !t.is_finite() {
            return Err(anyhow!("Maturity must be finite, got {}", t));
        }
        if t <= 0.0 {
            return Ok((spot - strike).max(0.0));
        }

        let forward = spot * ((rate - dividend_yield) * t).exp();
        let log_moneyness = (forward / strike).ln();
        let half_i = Complex64::new(0.0, 0.5);

        let integrand = |x: f64| -> f64 {
            if x >= 1.0 {
                return 0.0;
            }
            let u = x / (1.0 - x);
            let jacobian = 1.0 / ((1.0 - x) * (1.0 - x));
            let phi = characteristic_fn(params, Complex64::new(u, 0.0) - half_i, t);
            let numerator = Complex64::new(0.0, u * log_moneyness).exp() * phi;
            numerator.re / (u * u + 0.25) * jacobian
        };

        let integral = self.integrator.integrate(integrand, 0.0, 1.0)?;
        let price = (-rate * t).exp() * (forward - (forward * strike).sqrt() * integral / PI);

        if !price.is_finite() {
            return Err(anyhow!("Heston call price is non-finite: {}", price));
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bs::bs_call_price;

    fn reference_params() -> HestonParams {
        HestonParams {
            lambda: 1.5,
            vbar: 0.04,
            eta: 0.3,
            rho: -0.7,
            v0: 0.04,
        }
    }

    #[test]
    fn test_black_scholes_limit() {
        // Vanishing vol-of-vol with v0 = vbar collapses to Black-Scholes at sqrt(v0).
        let params = HestonParams {
            lambda: 2.0,
            vbar: 0.04,
            eta: 1e-3,
            rho: 0.0,
            v0: 0.04,
        };
        let engine = HestonEngine::default();
        for &(k, t) in &[(0.9, 0.5), (1.0, 1.0), (1.1, 2.0)] {
            let heston = engine.call_price(&params, 1.0, k, t, 0.01, 0.0).unwrap();
            let bs = bs_call_price(1.0, k, 0.01, 0.0, t, 0.2);
            assert!(
                (heston - bs).abs() < 1e-5,
                "K={} T={}: heston {} vs bs {}",
                k,
                t,
                heston,
                bs
            );
        }
    }

    #[test]
    fn test_price_is_decreasing_and_convex_in_strike() {
        let engine = HestonEngine::default();
        let params = reference_params();
        let strikes = [0.8, 0.9, 1.0, 1.1, 1.2];
        let prices: Vec<f64> = strikes
            .iter()
            .map(|&k| engine.call_price(&params, 1.0, k, 0.5, 0.0, 0.0).unwrap())
            .collect();

        for w in prices.windows(2) {
            assert!(w[1] < w[0], "prices not decreasing: {:?}", prices);
        }
        for w in prices.windows(3) {
            assert!(w[0] - 2.0 * w[1] + w[2] > 0.0, "prices not convex: {:?}", prices);
        }
        // Calls stay within the static no-arbitrage band.
        for (&k, &p) in strikes.iter().zip(prices.iter()) {
            assert!(p >= (1.0 - k).max(0.0) && p <= 1.0);
        }
    }

    #[test]
    fn test_expired_option_pays_intrinsic() {
        let engine = HestonEngine::default();
        let p = engine
            .call_price(&reference_params(), 1.0, 0.9, 0.0, 0.0, 0.0)
            .unwrap();
        assert!((p - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_parameters_fail() {
        let engine = HestonEngine::default();
        let mut params = reference_params();
        params.eta = 0.0;
        assert!(engine.call_price(&params, 1.0, 1.0, 0.5, 0.0, 0.0).is_err());

        let mut params = reference_params();
        params.rho = -1.5;
        assert!(engine.call_price(&params, 1.0, 1.0, 0.5, 0.0, 0.0).is_err());

        assert!(engine
            .call_price(&reference_params(), 1.0, -1.0, 0.5, 0.0, 0.0)
            .is_err());
    }

    #[test]
    fn test_tiny_budget_is_an_engine_failure() {
        let engine = HestonEngine::new(1e-15, 15);
        assert!(engine
            .call_price(&reference_params(), 1.0, 1.0, 0.5, 0.0, 0.0)
            .is_err());
    }
}

// Black-Scholes call pricing plus the implied-volatility inversion used to label
// every generated sample.  Puts are never generated, so only the call side lives
// here.

use anyhow::{anyhow, Result};
use roots::{find_root_brent, SimpleConvergency};

/// Lower edge of the volatility bracket handed to Brent's method.
const MIN_VOL: f64 = 1e-8;
/// Initial upper edge of the bracket; doubled until the objective changes sign.
const INITIAL_MAX_VOL: f64 = 5.0;
/// Hard ceiling for the bracket expansion.
const MAX_VOL: f64 = 1_000.0;

#[allow(non_snake_case)]
fn norm_cdf(x: f64) -> f64 {
    // 0.5 * [1 + erf(x / sqrt(2))]
    0.5 * (1.0 + libm::erf(x / (2.0_f64).sqrt()))
}

/// Price of a European call option under Black-Scholes assumptions.
#[allow(non_snake_case)]
pub fn bs_call_price(S: f64, K: f64, r: f64, q: f64, T: f64, sigma: f64) -> f64 {
    if T <= 0.0 || sigma <= 0.0 {
        return (S * (-q * T).exp() - K * (-r * T).exp()).max(0.0);
    }
    let d1 = ((S / K).ln() + (r - q + 0.5 * sigma.powi(2)) * T) / (sigma * T.sqrt());
    let d2 = d1 - sigma * T.sqrt();
    S * (-q * T).exp() * norm_cdf(d1) - K * (-r * T).exp() * norm_cdf(d2)
}

/// Black-Scholes implied volatility of a European call.
///
/// The price must lie strictly inside the no-arbitrage band
/// `(max(S e^{-qT} - K e^{-rT}, 0), S e^{-qT})`; prices on or outside the band have
/// no implied volatility and are reported as errors rather than clamped.
#[allow(non_snake_case)]
pub fn implied_volatility(price: f64, S: f64, K: f64, T: f64, r: f64, q: f64) -> Result<f64> {
    if !price.is_finite() || !S.is_finite() || !K.is_finite() {
        return Err(anyhow!(
            "Non-finite inputs: price={}, spot={}, strike={}",
            price,
            S,
            K
        ));
    }
    if T <= 0.0 || S <= 0.0 || K <= 0.0 {
        return Err(anyhow!(
            "Invalid contract: spot={}, strike={}, T={}",
            S,
            K,
            T
        ));
    }

    let upper = S * (-q * T).exp();
    let lower = (upper - K * (-r * T).exp()).max(0.0);
    if price <= lower {
        return Err(anyhow!(
            "Price {} is at or below the discounted intrinsic value {}",
            price,
            lower
        ));
    }
    if price >= upper {
        return Err(anyhow!(
            "Price {} is at or above the upper bound {}",
            price,
            upper
        ));
    }

    let objective = |sigma: f64| bs_call_price(S, K, r, q, T, sigma) - price;

    let mut max_vol = INITIAL_MAX_VOL;
    while objective(max_vol) < 0.0 {
        max_vol *= 2.0;
        if max_vol > MAX_VOL {
            return Err(anyhow!(
                "Implied volatility for price {} exceeds {}",
                price,
                MAX_VOL
            ));
        }
    }

    let mut convergency = SimpleConvergency {
        eps: 1e-14,
        max_iter: 200,
    };
    find_root_brent(MIN_VOL, max_vol, &objective, &mut convergency)
        .map_err(|e| anyhow!("Implied volatility root finding failed: {:?}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_price_limits() {
        let (s, k, r, q, t): (f64, f64, f64, f64, f64) = (1.0, 0.9, 0.03, 0.01, 0.75);
        let forward_intrinsic = s * (-q * t).exp() - k * (-r * t).exp();
        assert!((bs_call_price(s, k, r, q, t, 0.0) - forward_intrinsic).abs() < 1e-15);
        assert!((bs_call_price(s, k, r, q, t, 1e-6) - forward_intrinsic).abs() < 1e-12);

        let deep_vol = bs_call_price(s, k, r, q, t, 50.0);
        assert!(deep_vol <= s * (-q * t).exp() && deep_vol > 0.99 * s * (-q * t).exp());
        assert_eq!(bs_call_price(s, 1.2, r, q, 0.0, 0.3), 0.0);
    }

    #[test]
    fn test_implied_volatility_recovers_input() {
        for &(k, t, sigma) in &[(1.0, 0.5, 0.2), (0.8, 1.5, 0.45), (1.2, 0.1, 0.9)] {
            let price = bs_call_price(1.0, k, 0.01, 0.0, t, sigma);
            let iv = implied_volatility(price, 1.0, k, t, 0.01, 0.0).unwrap();
            assert!(
                (iv - sigma).abs() < 1e-8,
                "K={} T={} expected {} got {}",
                k,
                t,
                sigma,
                iv
            );
        }
    }

    #[test]
    fn test_implied_volatility_rejects_out_of_band_prices() {
        // Deep ITM call priced below intrinsic.
        assert!(implied_volatility(0.1, 1.0, 0.8, 0.5, 0.0, 0.0).is_err());
        // Call priced above spot.
        assert!(implied_volatility(1.01, 1.0, 1.0, 0.5, 0.0, 0.0).is_err());
        assert!(implied_volatility(f64::NAN, 1.0, 1.0, 0.5, 0.0, 0.0).is_err());
        assert!(implied_volatility(0.05, 1.0, 1.0, 0.0, 0.0, 0.0).is_err());
    }
}

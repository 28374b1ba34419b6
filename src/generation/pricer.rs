//! Pricer adapters: wrap a pricing engine, map engine failures to NaN, apply the
//! intrinsic-value floor and invert valid prices to implied volatilities.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use crate::generation::types::{Contract, PricingResult};
use crate::model_params::{HestonParams, RBergomiParams};
use crate::models::bs::implied_volatility;
use crate::models::heston::HestonEngine;
use crate::models::rbergomi::RBergomiEngine;
use crate::models::utils::{intrinsic_value, passes_intrinsic_floor};

/// Prices one contract for one parameter draw.
///
/// Implementations never fail: an engine error is reported as
/// [`PricingResult::nan`].
pub trait PricerAdapter {
    type Params;

    fn price(&mut self, params: &Self::Params, contract: &Contract) -> PricingResult;
}

/// Turn an engine outcome into a [`PricingResult`].
///
/// `invert` is only called for prices that pass the intrinsic-value floor.
pub fn resolve_price<F>(engine_price: Result<f64>, contract: &Contract, invert: F) -> PricingResult
where
    F: FnOnce(f64) -> Result<f64>,
{
    let intrinsic = intrinsic_value(contract.spot, contract.strike);

    let price = match engine_price {
        Ok(price) => price,
        Err(e) => {
            info!(
                "EngineFailure: Intrinsic {}. Time {}. Strike {}. ({})",
                intrinsic, contract.maturity, contract.strike, e
            );
            return PricingResult::nan();
        }
    };

    if !passes_intrinsic_floor(price, contract.strike, contract.spot) {
        debug!(
            "NumStabProblem: Price {}. Intrinsic {}. Time {}. Strike {}.",
            price, intrinsic, contract.maturity, contract.strike
        );
        return PricingResult {
            price,
            implied_vol: f64::NAN,
        };
    }

    debug!("Success: Price {} > intrinsic {}", price, intrinsic);
    match invert(price) {
        Ok(iv) => PricingResult {
            price,
            implied_vol: iv,
        },
        Err(e) => {
            debug!(
                "InversionFailure: Price {}. Time {}. Strike {}. ({})",
                price, contract.maturity, contract.strike, e
            );
            PricingResult {
                price,
                implied_vol: f64::NAN,
            }
        }
    }
}

/// Heston adapter over the semi-analytic engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct HestonPricer {
    engine: HestonEngine,
}

impl HestonPricer {
    pub fn new(engine: HestonEngine) -> Self {
        Self { engine }
    }
}

impl PricerAdapter for HestonPricer {
    type Params = HestonParams;

    fn price(&mut self, params: &HestonParams, contract: &Contract) -> PricingResult {
        let engine_price = self.engine.call_price(
            params,
            contract.spot,
            contract.strike,
            contract.maturity,
            contract.rate,
            contract.dividend_yield,
        );
        resolve_price(engine_price, contract, |price| {
            implied_volatility(
                price,
                contract.spot,
                contract.strike,
                contract.maturity,
                contract.rate,
                contract.dividend_yield,
            )
        })
    }
}

/// Rough Bergomi adapter over the Monte Carlo engine.
///
/// The model is simulated under a zero rate, so `contract.rate` and
/// `contract.dividend_yield` are ignored and the inversion uses zero as well.
#[derive(Debug, Clone)]
pub struct RBergomiPricer<R = StdRng> {
    engine: RBergomiEngine,
    rng: R,
}

impl<R: Rng> RBergomiPricer<R> {
    pub fn new(engine: RBergomiEngine, rng: R) -> Self {
        Self { engine, rng }
    }
}

impl<R: Rng> PricerAdapter for RBergomiPricer<R> {
    type Params = RBergomiParams;

    fn price(&mut self, params: &RBergomiParams, contract: &Contract) -> PricingResult {
        let engine_price = self.engine.call_price(
            params,
            contract.spot,
            contract.strike,
            contract.maturity,
            &mut self.rng,
        );
        resolve_price(engine_price, contract, |price| {
            implied_volatility(
                price,
                contract.spot,
                contract.strike,
                contract.maturity,
                0.0,
                0.0,
            )
        })
    }
}

use tracing::warn;

use crate::generation::pricer::PricerAdapter;
use crate::generation::sampler::ParameterSampler;
use crate::generation::types::{Contract, LabeledSample, SampleOutcome};

/// Default bound on resampling attempts per strike/maturity pair.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Draw parameters and price `contract` until a finite implied volatility is
/// obtained or `max_attempts` draws have been spent.
///
/// The first valid draw ends the loop; the sampler is not called again. When every
/// attempt fails a single warning is emitted and the last draw is returned as
/// [`SampleOutcome::Exhausted`]. A zero `max_attempts` is treated as one.
pub fn generate_sample<S, A>(
    contract: &Contract,
    sampler: &mut S,
    pricer: &mut A,
    max_attempts: usize,
) -> SampleOutcome<S::Params>
where
    S: ParameterSampler,
    A: PricerAdapter<Params = S::Params>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let params = sampler.sample();
        let result = pricer.price(&params, contract);

        if result.is_valid() {
            return SampleOutcome::Resolved(LabeledSample {
                params,
                implied_vol: result.implied_vol,
                attempts: attempt,
            });
        }

        if attempt == max_attempts {
            warn!(
                "Tried {} times, none valid sample obtained. Time {}. Strike {}.",
                max_attempts, contract.maturity, contract.strike
            );
            return SampleOutcome::Exhausted {
                last_params: params,
                attempts: attempt,
            };
        }
        attempt += 1;
    }
}

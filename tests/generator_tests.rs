use std::cell::Cell;
use std::rc::Rc;

use surface_datagen::{generate_sample, Contract, SampleOutcome, DEFAULT_MAX_ATTEMPTS};

use test_utils::{count_warnings, counting_sampler, ScriptedPricer};

fn contract() -> Contract {
    Contract {
        strike: 1.05,
        maturity: 0.5,
        spot: 1.0,
        rate: 0.0,
        dividend_yield: 0.0,
    }
}

#[test]
fn test_exhaustion_spends_full_budget_and_warns_once() {
    let calls = Rc::new(Cell::new(0));
    let mut sampler = counting_sampler(Rc::clone(&calls));
    let mut pricer = ScriptedPricer::always_nan();

    let (outcome, warnings) = count_warnings(|| {
        generate_sample(
            &contract(),
            &mut sampler,
            &mut pricer,
            DEFAULT_MAX_ATTEMPTS,
        )
    });

    assert_eq!(calls.get(), 10);
    assert_eq!(pricer.calls, 10);
    assert_eq!(warnings, 1);
    assert!(!outcome.is_resolved());
    assert!(outcome.implied_vol().is_nan());
    assert_eq!(outcome.attempts(), 10);
    match outcome {
        SampleOutcome::Exhausted { last_params, .. } => assert_eq!(last_params.lambda, 10.0),
        SampleOutcome::Resolved(_) => panic!("expected exhaustion"),
    }
}

#[test]
fn test_stops_at_first_valid_attempt() {
    let calls = Rc::new(Cell::new(0));
    let mut sampler = counting_sampler(Rc::clone(&calls));
    let mut pricer = ScriptedPricer::valid_on(3, 0.23);

    let (outcome, warnings) = count_warnings(|| {
        generate_sample(
            &contract(),
            &mut sampler,
            &mut pricer,
            DEFAULT_MAX_ATTEMPTS,
        )
    });

    assert_eq!(calls.get(), 3);
    assert_eq!(warnings, 0);
    let sample = outcome.into_sample().expect("resolved sample");
    assert_eq!(sample.attempts, 3);
    assert_eq!(sample.params.lambda, 3.0);
    assert_eq!(sample.implied_vol, 0.23);
}

#[test]
fn test_custom_budget_is_honoured() {
    let calls = Rc::new(Cell::new(0));
    let mut sampler = counting_sampler(Rc::clone(&calls));
    let mut pricer = ScriptedPricer::always_nan();

    let outcome = generate_sample(&contract(), &mut sampler, &mut pricer, 4);
    assert_eq!(calls.get(), 4);
    assert_eq!(outcome.attempts(), 4);

    let outcome = generate_sample(&contract(), &mut sampler, &mut pricer, 0);
    assert_eq!(calls.get(), 5);
    assert_eq!(outcome.attempts(), 1);
}

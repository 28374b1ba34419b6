pub mod bs;
pub mod heston;
pub mod quadrature;
pub mod rbergomi;

/// Static no-arbitrage checks shared by the pricer adapters
pub mod utils {
    /// Undiscounted intrinsic value of a call: `spot - strike`.
    ///
    /// May be negative; the diagnostic log lines report it unfloored.
    pub fn intrinsic_value(spot: f64, strike: f64) -> f64 {
        spot - strike
    }

    /// A model call price is usable for labeling iff it is strictly positive and
    /// not below the undiscounted intrinsic value (`price + strike >= spot`).
    ///
    /// NaN prices fail both comparisons and are therefore rejected.
    pub fn passes_intrinsic_floor(price: f64, strike: f64, spot: f64) -> bool {
        price > 0.0 && price + strike >= spot
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_intrinsic_floor() {
            assert!(passes_intrinsic_floor(0.05, 1.0, 1.0));
            assert!(passes_intrinsic_floor(0.2, 0.8, 1.0));
            assert!(!passes_intrinsic_floor(0.1, 0.8, 1.0));
            assert!(!passes_intrinsic_floor(0.0, 1.2, 1.0));
            assert!(!passes_intrinsic_floor(-0.01, 1.2, 1.0));
            assert!(!passes_intrinsic_floor(f64::NAN, 1.0, 1.0));
        }
    }
}

pub mod alignment;

pub use alignment::{align_series, aligned_returns, calculate_returns};

use analysis_core::{AlignedReturnPair, BetaResult, PriceSeries};
use statrs::statistics::Statistics;
use thiserror::Error;

/// Trading days per year used to annualize daily volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Minimum number of daily returns for a regression
pub const MIN_RETURN_OBSERVATIONS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BetaError {
    #[error("insufficient data points: {found} return observations, need {required}")]
    InsufficientDataPoints { found: usize, required: usize },

    #[error("benchmark returns have zero variance")]
    ZeroBenchmarkVariance,
}

/// Beta / alpha / correlation engine over aligned daily returns.
///
/// Covariance and variance use the population convention (divide by n).
pub struct BetaCalculator {
    min_observations: usize,
}

impl BetaCalculator {
    pub fn new() -> Self {
        Self {
            min_observations: MIN_RETURN_OBSERVATIONS,
        }
    }

    pub fn with_min_observations(min_observations: usize) -> Self {
        Self {
            min_observations: min_observations.max(MIN_RETURN_OBSERVATIONS),
        }
    }

    /// Align, difference and regress `subject` on `benchmark`
    pub fn calculate(
        &self,
        subject: &PriceSeries,
        benchmark: &PriceSeries,
    ) -> Result<BetaResult, BetaError> {
        let aligned = align_series(subject, benchmark);
        let returns = aligned_returns(&aligned);
        tracing::debug!(
            "{} vs {}: {} aligned closes, {} return observations",
            subject.symbol,
            benchmark.symbol,
            aligned.len(),
            returns.len()
        );
        self.calculate_from_returns(&returns)
    }

    /// Regression statistics for already-aligned returns
    pub fn calculate_from_returns(&self, returns: &AlignedReturnPair) -> Result<BetaResult, BetaError> {
        let n = returns.len().min(returns.benchmark.len());
        if n < self.min_observations {
            return Err(BetaError::InsufficientDataPoints {
                found: n,
                required: self.min_observations,
            });
        }

        let stock = &returns.subject[..n];
        let bench = &returns.benchmark[..n];

        let bench_variance = bench.population_variance();
        if is_degenerate_variance(bench_variance, bench.mean()) {
            return Err(BetaError::ZeroBenchmarkVariance);
        }

        let covariance = stock.population_covariance(bench);
        let beta = covariance / bench_variance;

        // OLS intercept on daily returns
        let alpha = stock.mean() - beta * bench.mean();

        let stock_std = stock.population_std_dev();
        let bench_std = bench_variance.sqrt();
        let correlation = if stock_std > 0.0 {
            Some((covariance / (stock_std * bench_std)).clamp(-1.0, 1.0))
        } else {
            None
        };

        Ok(BetaResult {
            beta,
            alpha: Some(alpha).filter(|a| a.is_finite()),
            correlation,
            r_squared: correlation.map(|c| c * c),
            volatility: Some(stock_std * TRADING_DAYS_PER_YEAR.sqrt()),
            observations: n,
        })
    }
}

/// Variance indistinguishable from rounding noise around `mean` counts as zero
fn is_degenerate_variance(variance: f64, mean: f64) -> bool {
    !variance.is_finite() || variance <= f64::EPSILON * mean.powi(2).max(f64::MIN_POSITIVE)
}

impl Default for BetaCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Detailed beta computation with the reason for any failure
pub fn calculate_beta(subject: &PriceSeries, benchmark: &PriceSeries) -> Result<BetaResult, BetaError> {
    BetaCalculator::new().calculate(subject, benchmark)
}

/// `None` when the aligned input is degenerate (too few points or a flat benchmark)
pub fn compute_beta(subject: &PriceSeries, benchmark: &PriceSeries) -> Option<BetaResult> {
    calculate_beta(subject, benchmark).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PricePoint;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        PriceSeries::new(
            symbol,
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: start() + Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
    }

    fn prices_from_returns(first: f64, returns: &[f64]) -> Vec<f64> {
        let mut prices = vec![first];
        for r in returns {
            let last = *prices.last().unwrap();
            prices.push(last * (1.0 + r));
        }
        prices
    }

    #[test]
    fn test_hand_computed_five_point_beta() {
        // benchmark returns [0.02, -0.01, 0.03, -0.02], subject [0.03, -0.02, 0.05, -0.01]
        // cov = 0.0005625, var = 0.000425 -> beta = 0.00225 / 0.0017
        let benchmark = series("^NSEI", &prices_from_returns(100.0, &[0.02, -0.01, 0.03, -0.02]));
        let subject = series("TCS.NS", &prices_from_returns(100.0, &[0.03, -0.02, 0.05, -0.01]));

        let result = compute_beta(&subject, &benchmark).unwrap();

        assert_eq!(result.observations, 4);
        assert_relative_eq!(result.beta, 0.00225 / 0.0017, epsilon = 1e-9);
        assert_relative_eq!(result.alpha.unwrap(), 0.0125 - (0.00225 / 0.0017) * 0.005, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_benchmark_returns_none() {
        let benchmark = series("^NSEI", &[100.0, 100.0, 100.0, 100.0, 100.0]);
        let subject = series("TCS.NS", &[10.0, 11.0, 10.5, 12.0, 11.0]);

        assert!(compute_beta(&subject, &benchmark).is_none());
        assert_eq!(
            calculate_beta(&subject, &benchmark),
            Err(BetaError::ZeroBenchmarkVariance)
        );
    }

    #[test]
    fn test_constant_growth_benchmark_has_zero_variance() {
        // 1% every day: identical returns up to rounding
        let bench_closes: Vec<f64> = (0..30).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let subject_closes: Vec<f64> = (0..30)
            .map(|i| 50.0 + 2.0 * ((i as f64) * 0.9).sin() + 0.1 * i as f64)
            .collect();
        let benchmark = series("^NSEI", &bench_closes);
        let subject = series("TCS.NS", &subject_closes);

        assert_eq!(
            calculate_beta(&subject, &benchmark),
            Err(BetaError::ZeroBenchmarkVariance)
        );
        assert!(compute_beta(&subject, &benchmark).is_none());
    }

    #[test]
    fn test_single_common_day_is_insufficient() {
        let subject = series("TCS.NS", &[10.0, 11.0, 12.0]);
        let benchmark = PriceSeries::new(
            "^NSEI",
            vec![PricePoint {
                date: start() + Duration::days(1),
                close: 100.0,
            }],
        );

        assert!(compute_beta(&subject, &benchmark).is_none());
        assert_eq!(
            calculate_beta(&subject, &benchmark),
            Err(BetaError::InsufficientDataPoints { found: 0, required: 2 })
        );
    }

    #[test]
    fn test_two_aligned_closes_is_insufficient() {
        let subject = series("TCS.NS", &[10.0, 11.0]);
        let benchmark = series("^NSEI", &[100.0, 102.0]);

        assert!(matches!(
            calculate_beta(&subject, &benchmark),
            Err(BetaError::InsufficientDataPoints { found: 1, .. })
        ));
    }

    #[test]
    fn test_zero_close_outlier_does_not_poison_beta() {
        let benchmark = series("^NSEI", &[100.0, 101.0, 99.0, 102.0, 103.0, 101.0]);
        let subject = series("TCS.NS", &[50.0, 51.0, 0.0, 52.0, 53.5, 51.0]);

        let result = compute_beta(&subject, &benchmark).unwrap();

        assert_eq!(result.observations, 4);
        assert!(result.beta.is_finite());
        assert!(result.volatility.unwrap().is_finite());
    }

    #[test]
    fn test_one_and_a_half_times_market_over_a_year() {
        let bench_returns: Vec<f64> = (0..251)
            .map(|i| 0.01 * ((i as f64) * 0.7).sin() + 0.002 * ((i % 5) as f64 - 2.0))
            .collect();
        let stock_returns: Vec<f64> = bench_returns.iter().map(|r| 1.5 * r).collect();

        let benchmark = series("^NSEI", &prices_from_returns(20000.0, &bench_returns));
        let subject = series("TCS.NS", &prices_from_returns(3500.0, &stock_returns));
        assert_eq!(align_series(&subject, &benchmark).len(), 252);

        let result = compute_beta(&subject, &benchmark).unwrap();

        assert_relative_eq!(result.beta, 1.5, epsilon = 1e-9);
        assert_relative_eq!(result.correlation.unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(result.r_squared.unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(result.alpha.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_volatility_is_annualized_population_std_dev() {
        let returns = AlignedReturnPair {
            subject: vec![0.01, -0.01, 0.01, -0.01],
            benchmark: vec![0.02, -0.01, 0.01, 0.0],
        };

        let result = BetaCalculator::new().calculate_from_returns(&returns).unwrap();

        assert_relative_eq!(result.volatility.unwrap(), 0.01 * 252.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_flat_subject_has_no_correlation() {
        let returns = AlignedReturnPair {
            subject: vec![0.0, 0.0, 0.0],
            benchmark: vec![0.02, -0.01, 0.01],
        };

        let result = BetaCalculator::new().calculate_from_returns(&returns).unwrap();

        assert_eq!(result.beta, 0.0);
        assert_eq!(result.correlation, None);
        assert_eq!(result.r_squared, None);
    }

    #[test]
    fn test_custom_minimum_observations() {
        let calculator = BetaCalculator::with_min_observations(30);
        let returns = AlignedReturnPair {
            subject: vec![0.01; 10],
            benchmark: vec![0.02; 10],
        };

        assert_eq!(
            calculator.calculate_from_returns(&returns),
            Err(BetaError::InsufficientDataPoints { found: 10, required: 30 })
        );
    }
}

//! Date alignment of two close-price series.
//!
//! Exchanges observe different holidays, so a subject and its benchmark rarely
//! share every trading day. Only dates present on both sides with a usable
//! close on both sides take part in the regression.

use analysis_core::{AlignedPrices, AlignedReturnPair, PriceSeries};
use chrono::NaiveDate;
use std::collections::BTreeMap;

fn usable(close: f64) -> bool {
    close.is_finite() && close > 0.0
}

/// Date-ascending lookup of usable closes; a repeated date keeps its last value
fn close_lookup(series: &PriceSeries) -> BTreeMap<NaiveDate, f64> {
    let mut lookup = BTreeMap::new();
    for point in &series.points {
        lookup.insert(point.date, point.close);
    }
    lookup.retain(|_, close| usable(*close));
    lookup
}

/// Intersect two series by date, dropping any date where either close is
/// non-positive or missing.
pub fn align_series(subject: &PriceSeries, benchmark: &PriceSeries) -> AlignedPrices {
    let benchmark_closes = close_lookup(benchmark);
    let mut aligned = AlignedPrices::default();

    for (date, subject_close) in close_lookup(subject) {
        if let Some(&benchmark_close) = benchmark_closes.get(&date) {
            aligned.dates.push(date);
            aligned.subject.push(subject_close);
            aligned.benchmark.push(benchmark_close);
        }
    }

    aligned
}

/// Simple daily returns `(p_t - p_{t-1}) / p_{t-1}`
pub fn calculate_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Returns over the aligned price sequence, not the raw series
pub fn aligned_returns(aligned: &AlignedPrices) -> AlignedReturnPair {
    AlignedReturnPair {
        subject: calculate_returns(&aligned.subject),
        benchmark: calculate_returns(&aligned.benchmark),
    }
}

//! Multiplicative adjustment model applied on top of an index base price.

use super::{PropertyType, ValuationError};

/// Spread used when the source publishes no standard error.
pub const DEFAULT_VARIANCE: f64 = 0.10;
const MIN_VARIANCE: f64 = 0.02;
const MAX_VARIANCE: f64 = 0.25;

pub fn bedroom_multiplier(bedrooms: u8) -> f64 {
    match bedrooms {
        0 | 1 => 0.7,
        2 => 0.9,
        3 => 1.0,
        4 => 1.3,
        _ => 1.5,
    }
}

/// Apply both the property-type and bedroom multipliers.
pub fn adjust(base_price: f64, property_type: PropertyType, bedrooms: u8) -> Result<u64, ValuationError> {
    apply(base_price, property_type.multiplier() * bedroom_multiplier(bedrooms))
}

/// Apply only the bedroom multiplier, for base prices already segmented by type.
pub fn adjust_segmented(base_price: f64, bedrooms: u8) -> Result<u64, ValuationError> {
    apply(base_price, bedroom_multiplier(bedrooms))
}

fn apply(base_price: f64, factor: f64) -> Result<u64, ValuationError> {
    if !base_price.is_finite() {
        return Err(ValuationError::invalid("base price must be a finite number"));
    }
    if base_price < 0.0 {
        return Err(ValuationError::invalid("base price must not be negative"));
    }
    Ok((base_price * factor).round() as u64)
}

/// Variance derived from a published standard error, clamped to a sane band.
pub fn variance_from(average_price: f64, standard_error: Option<f64>) -> f64 {
    match standard_error {
        Some(error) if error.is_finite() && error > 0.0 && average_price > 0.0 => {
            (error / average_price).clamp(MIN_VARIANCE, MAX_VARIANCE)
        }
        _ => DEFAULT_VARIANCE,
    }
}

/// `(min, max)` band around an estimate; always brackets the estimate.
pub fn price_range(estimate: u64, variance: f64) -> (u64, u64) {
    let variance = if variance.is_finite() {
        variance.clamp(0.0, 1.0)
    } else {
        DEFAULT_VARIANCE
    };
    let value = estimate as f64;
    let min = ((value * (1.0 - variance)).round() as u64).min(estimate);
    let max = ((value * (1.0 + variance)).round() as u64).max(estimate);
    (min, max)
}

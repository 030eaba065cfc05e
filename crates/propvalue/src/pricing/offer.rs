use serde::{Deserialize, Serialize};

use super::ValuationError;

/// Cash-offer discount applied to every market valuation.
pub const DISCOUNT_PERCENTAGE: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferCalculationResult {
    pub offer_price: i64,
    pub discount_amount: i64,
    pub discount_percentage: u8,
}

/// Discount a market value into a cash offer; the parts always sum back to it.
pub fn calculate_offer(market_value: i64) -> Result<OfferCalculationResult, ValuationError> {
    if market_value < 0 {
        return Err(ValuationError::invalid("market value must not be negative"));
    }

    // Integer round-half-up of market_value * 15 / 100, no float drift.
    let scaled = i128::from(market_value) * i128::from(DISCOUNT_PERCENTAGE);
    let discount_amount = ((scaled + 50) / 100) as i64;

    Ok(OfferCalculationResult {
        offer_price: market_value - discount_amount,
        discount_amount,
        discount_percentage: DISCOUNT_PERCENTAGE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_hundred_thousand_scenario() {
        let offer = calculate_offer(300_000).expect("valid value");
        assert_eq!(
            offer,
            OfferCalculationResult {
                offer_price: 255_000,
                discount_amount: 45_000,
                discount_percentage: 15,
            }
        );
    }

    #[test]
    fn parts_sum_to_market_value() {
        for value in [0, 1, 3, 10, 333, 99_999, 254_321, 1_000_001, i64::MAX / 200] {
            let offer = calculate_offer(value).expect("valid value");
            assert_eq!(offer.offer_price + offer.discount_amount, value);
            assert_eq!(offer.discount_percentage, 15);
            let expected = (value as f64 * 0.15).round() as i64;
            if value < 1_000_000_000 {
                assert_eq!(offer.discount_amount, expected, "{value}");
            }
        }
    }

    #[test]
    fn rounds_half_up() {
        // 10 * 0.15 = 1.5
        assert_eq!(calculate_offer(10).unwrap().discount_amount, 2);
        // 3 * 0.15 = 0.45
        assert_eq!(calculate_offer(3).unwrap().discount_amount, 0);
    }

    #[test]
    fn rejects_negative_values() {
        assert!(matches!(
            calculate_offer(-1),
            Err(ValuationError::InvalidValuationInput { .. })
        ));
    }
}

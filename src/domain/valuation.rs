use super::config::LiquidityThresholds;
use super::entities::{NormalizedPrice, Valuation};

/// Collapses the surviving normalized prices into one market estimate.
///
/// An empty input is "no market evidence", not an error: all price fields
/// come back zero with low liquidity.
pub fn summarize(offers: Vec<NormalizedPrice>, thresholds: &LiquidityThresholds) -> Valuation {
    if offers.is_empty() {
        return Valuation::empty();
    }

    let mut amounts: Vec<f64> = offers.iter().map(|offer| offer.amount).collect();
    amounts.sort_by(f64::total_cmp);

    let sample_count = offers.len();
    Valuation {
        median: median_of_sorted(&amounts),
        min: amounts[0],
        max: amounts[amounts.len() - 1],
        sample_count,
        liquidity: thresholds.classify(sample_count),
        offers,
    }
}

/// Even-count lists average the two middle values.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Currency, Liquidity};

    fn offers(amounts: &[f64]) -> Vec<NormalizedPrice> {
        amounts
            .iter()
            .map(|&amount| NormalizedPrice {
                source_id: "test".to_string(),
                amount,
                currency: Currency::Eur,
            })
            .collect()
    }

    #[test]
    fn even_count_averages_the_middle_pair() {
        let valuation = summarize(offers(&[60.0, 65.0, 70.0, 58.0]), &LiquidityThresholds::default());
        assert_eq!(valuation.min, 58.0);
        assert_eq!(valuation.median, 62.5);
        assert_eq!(valuation.max, 70.0);
        assert_eq!(valuation.sample_count, 4);
        assert_eq!(valuation.liquidity, Liquidity::Medium);
    }

    #[test]
    fn odd_count_takes_the_middle_value() {
        let valuation = summarize(offers(&[100.0, 20.0, 50.0]), &LiquidityThresholds::default());
        assert_eq!(valuation.median, 50.0);
        assert_eq!(valuation.min, 20.0);
        assert_eq!(valuation.max, 100.0);
    }

    #[test]
    fn ordering_invariant_holds() {
        for amounts in [
            vec![10.0],
            vec![5.0, 500.0],
            vec![80.0, 12.0, 33.0, 90.0, 47.0],
        ] {
            let valuation = summarize(offers(&amounts), &LiquidityThresholds::default());
            assert!(valuation.min <= valuation.median);
            assert!(valuation.median <= valuation.max);
            assert_eq!(valuation.sample_count, valuation.offers.len());
        }
    }

    #[test]
    fn zero_offers_is_a_valid_low_liquidity_result() {
        let valuation = summarize(Vec::new(), &LiquidityThresholds::default());
        assert_eq!(valuation.sample_count, 0);
        assert_eq!(valuation.median, 0.0);
        assert_eq!(valuation.min, 0.0);
        assert_eq!(valuation.max, 0.0);
        assert_eq!(valuation.liquidity, Liquidity::Low);
    }

    #[test]
    fn thirteen_offers_read_as_a_liquid_market() {
        let amounts: Vec<f64> = (1..=13).map(|n| n as f64 * 10.0).collect();
        let valuation = summarize(offers(&amounts), &LiquidityThresholds::default());
        assert_eq!(valuation.liquidity, Liquidity::High);
        assert_eq!(valuation.median, 70.0);
    }

    #[test]
    fn two_offers_read_as_thin() {
        let valuation = summarize(offers(&[40.0, 60.0]), &LiquidityThresholds::default());
        assert_eq!(valuation.liquidity, Liquidity::Low);
        assert_eq!(valuation.median, 50.0);
    }
}

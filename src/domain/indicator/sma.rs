//! Simple moving averages over closes and volume.
//!
//! O(n) sliding window. Warmup: first (n-1) points are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::Sma(period), |b| b.close)
}

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::VolumeSma(period), |b| {
        b.volume as f64
    })
}

fn rolling_mean(
    bars: &[OhlcvBar],
    period: usize,
    indicator_type: IndicatorType,
    field: impl Fn(&OhlcvBar) -> f64,
) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += field(bar);
        if i >= period {
            window_sum -= field(&bars[i - period]);
        }

        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: if valid {
                window_sum / period as f64
            } else {
                0.0
            },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: (i as i64 + 1) * 100,
            })
            .collect()
    }

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);
        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn sma_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);
        assert_relative_eq!(series.values[2].value, 20.0);
        assert_relative_eq!(series.values[3].value, 30.0);
        assert_relative_eq!(series.values[4].value, 40.0);
        assert_eq!(series.indicator_type, IndicatorType::Sma(3));
    }

    #[test]
    fn sma_period_one_is_close() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, 1);
        assert_relative_eq!(series.values[0].value, 10.0);
        assert_relative_eq!(series.values[1].value, 20.0);
    }

    #[test]
    fn sma_period_longer_than_data() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, 5);
        assert!(series.values.iter().all(|p| !p.valid));
        assert_eq!(series.last(), None);
    }

    #[test]
    fn sma_zero_period_or_empty() {
        assert!(calculate_sma(&make_bars(&[1.0]), 0).values.is_empty());
        assert!(calculate_sma(&[], 3).values.is_empty());
    }

    #[test]
    fn volume_sma_values() {
        // volumes 100, 200, 300, 400
        let bars = make_bars(&[1.0, 1.0, 1.0, 1.0]);
        let series = calculate_volume_sma(&bars, 2);
        assert_relative_eq!(series.values[1].value, 150.0);
        assert_relative_eq!(series.values[3].value, 350.0);
        assert_eq!(series.indicator_type, IndicatorType::VolumeSma(2));
    }
}

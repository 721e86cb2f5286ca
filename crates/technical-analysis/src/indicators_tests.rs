#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use analysis_core::{Bar, TrendDirection};
    use approx::assert_relative_eq;
    use chrono::Utc;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc::now() - chrono::Duration::days(100 - i as i64),
            open,
            high,
            low,
            close,
            volume: 1_000_000.0,
        }
    }

    // Helper function to create sample bars
    fn sample_bars() -> Vec<Bar> {
        (0..15)
            .map(|i| {
                let open = 100.0 + i as f64;
                bar(i, open, open + 2.0, open - 1.0, open + 1.0)
            })
            .collect()
    }

    /// Flat-range bars: high/low one point either side of the close, no gaps,
    /// so every true range is exactly 2.
    fn flat_range_bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i, c, c + 1.0, c - 1.0, c))
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        let result = sma(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_rsi_length_and_range() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        // first value sits at index 14
        assert_eq!(result.len(), prices.len() - 14);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_first_value_is_plain_average() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        let (mut gain, mut loss) = (0.0, 0.0);
        for w in prices[..15].windows(2) {
            let change = w[1] - w[0];
            if change > 0.0 {
                gain += change;
            } else {
                loss -= change;
            }
        }
        let expected = 100.0 - 100.0 / (1.0 + gain / loss);
        assert_relative_eq!(result[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..30).map(|i| i as f64).collect();
        assert!(rsi(&rising, 14).iter().all(|&v| v == 100.0));

        let falling: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert!(rsi(&falling, 14).iter().all(|&v| v == 0.0));

        let flat = vec![10.0; 30];
        assert!(rsi(&flat, 14).iter().all(|&v| v == 50.0));
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![1.0, 2.0, 3.0];
        assert!(rsi(&prices, 14).is_empty());
    }

    #[test]
    fn test_true_range_uses_previous_close() {
        let bars = vec![bar(0, 10.0, 11.0, 9.0, 10.0), bar(1, 14.0, 15.0, 13.0, 14.0)];
        // gap up: |15 - 10| beats 15 - 13
        assert_eq!(true_ranges(&bars), vec![5.0]);
    }

    #[test]
    fn test_atr_basic() {
        let bars = sample_bars();
        let result = atr(&bars, 14);

        assert_eq!(result.len(), 1);
        // every bar: high - low = 3, |high - prev close| = 2, |low - prev close| = 1
        assert_relative_eq!(result[0], 3.0);
    }

    #[test]
    fn test_atr_wilder_smoothing() {
        let mut bars = flat_range_bars(&[100.0; 12]);
        // one wide bar at the end: true range 10
        bars.push(bar(12, 100.0, 105.0, 95.0, 100.0));
        let result = atr(&bars, 10);

        assert_eq!(result.len(), 3);
        assert_relative_eq!(result[0], 2.0);
        assert_relative_eq!(result[1], 2.0);
        assert_relative_eq!(result[2], (2.0 * 9.0 + 10.0) / 10.0);
    }

    #[test]
    fn test_atr_insufficient_data() {
        let bars = sample_bars();
        assert!(atr(&bars[..5], 14).is_empty());
    }

    #[test]
    fn test_supertrend_state_holds_trend_on_pullback() {
        // Fifteen bars with high = low = close and a constant ATR of 1, multiplier 3,
        // so the basic bands are simply close +/- 3.
        // Bars 2..11 fall one point per bar (downtrend), bar 12 jumps above the
        // prior final upper band, bars 13..15 pull back without breaking the
        // final lower band.
        let closes = [
            100.0, 96.0, 95.0, 94.0, 93.0, 92.0, 91.0, 90.0, 89.0, 88.0, 87.0, // bars 1-11
            91.0, // bar 12
            89.5, 89.0, 88.5, // bars 13-15
        ];
        let mut state = SupertrendState::new(3.0);
        let points: Vec<SupertrendPoint> = closes.iter().map(|&c| state.update(c, c, c, 1.0)).collect();

        assert_eq!(points[0].direction, TrendDirection::Up);
        for p in &points[1..11] {
            assert_eq!(p.direction, TrendDirection::Down);
        }
        // bar 11 final upper band is 87 + 3
        assert_relative_eq!(points[10].final_upper, 90.0);

        // bar 12 clears 90 and flips up with a fresh lower band
        assert_eq!(points[11].direction, TrendDirection::Up);
        assert_relative_eq!(points[11].value, 88.0);

        // the basic lower band drops to 86.5, 86.0, 85.5 but the final band
        // stays at 88 and no close breaks it
        for p in &points[12..15] {
            assert_eq!(p.direction, TrendDirection::Up);
            assert_relative_eq!(p.value, 88.0);
            assert_relative_eq!(p.final_lower, 88.0);
        }
        assert_eq!(state.direction(), Some(TrendDirection::Up));
    }

    #[test]
    fn test_supertrend_state_upper_band_only_tightens() {
        let mut state = SupertrendState::new(3.0);
        state.update(100.0, 100.0, 100.0, 1.0);
        let down = state.update(96.0, 96.0, 96.0, 1.0);
        assert_eq!(down.direction, TrendDirection::Down);
        assert_relative_eq!(down.final_upper, 99.0);

        // a bounce that stays below 99 raises the basic upper band to 101,
        // the final band holds at 99
        let bounce = state.update(98.0, 98.0, 98.0, 1.0);
        assert_eq!(bounce.direction, TrendDirection::Down);
        assert_relative_eq!(bounce.final_upper, 99.0);
        assert_relative_eq!(bounce.value, 99.0);
    }

    #[test]
    fn test_supertrend_breakdown_flips_down() {
        let mut state = SupertrendState::new(3.0);
        state.update(100.0, 100.0, 100.0, 1.0);
        let p = state.update(96.5, 96.5, 96.5, 1.0);
        // 96.5 is below the seeded lower band of 97
        assert_eq!(p.direction, TrendDirection::Down);
        assert_relative_eq!(p.value, 99.5);
    }

    #[test]
    fn test_supertrend_aligned_to_bars() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = flat_range_bars(&closes);
        let result = supertrend(&bars, 10, 3.0);

        assert_eq!(result.len(), bars.len());
        assert!(result[..10].iter().all(|p| p.is_none()));
        let last = result[29].unwrap();
        assert_eq!(last.direction, TrendDirection::Up);
        assert!(last.value < bars[29].close);
    }

    #[test]
    fn test_supertrend_downtrend() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - 2.0 * i as f64).collect();
        let bars = flat_range_bars(&closes);
        let last = supertrend(&bars, 10, 3.0)[39].unwrap();

        assert_eq!(last.direction, TrendDirection::Down);
        assert!(last.value > bars[39].close);
    }

    #[test]
    fn test_volume_surge() {
        let mut volumes = vec![100.0; 20];
        volumes.push(250.0);
        let (ma, surge) = volume_surge(&volumes, 20);

        assert_eq!(ma.len(), 21);
        assert!(surge[..19].iter().all(|s| s.is_none()));
        assert_relative_eq!(surge[19].unwrap(), 1.0);
        // trailing window includes the current bar: (19 * 100 + 250) / 20
        assert_relative_eq!(ma[20].unwrap(), 107.5);
        assert_relative_eq!(surge[20].unwrap(), 250.0 / 107.5);
    }

    #[test]
    fn test_volume_surge_zero_average() {
        let volumes = vec![0.0; 25];
        let (_, surge) = volume_surge(&volumes, 20);
        assert!(surge.iter().all(|s| s.is_none()));
    }

    #[test]
    fn test_align_pads_front() {
        assert_eq!(align(vec![1.0, 2.0], 4), vec![None, None, Some(1.0), Some(2.0)]);
        assert_eq!(align(vec![], 2), vec![None, None]);
    }
}

//! Unit tests for indicators

use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_ewm_mean_empty() {
    assert_eq!(ewm_mean(&[], 20), None);
    assert_eq!(ewm_mean(&[1.0], 0), None);
}

#[test]
fn test_ewm_mean_single_value() {
    assert_eq!(ewm_mean(&[42.0], 20), Some(42.0));
}

#[test]
fn test_ewm_mean_adjusted_weights() {
    // span 3 -> alpha 0.5; weights for [1, 2, 3] are [0.25, 0.5, 1]
    let mean = ewm_mean(&[1.0, 2.0, 3.0], 3).unwrap();
    let expected = (0.25 * 1.0 + 0.5 * 2.0 + 1.0 * 3.0) / 1.75;
    assert!(approx(mean, expected));
}

#[test]
fn test_ewm_constant_series() {
    let values = vec![100.0; 50];
    assert!(approx(ewm_mean(&values, 20).unwrap(), 100.0));
}

#[test]
fn test_fast_ewm_leads_in_uptrend() {
    let values: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
    let fast = ewm_mean(&values, 20).unwrap();
    let slow = ewm_mean(&values, 50).unwrap();
    assert!(fast > slow);
}

#[test]
fn test_rsi_insufficient_data() {
    let closes = vec![1.0; 14];
    assert_eq!(rsi(&closes, 14), None);
}

#[test]
fn test_rsi_flat_is_undefined() {
    let closes = vec![10.0; 30];
    assert_eq!(rsi(&closes, 14), None);
}

#[test]
fn test_rsi_only_gains_saturates() {
    let closes: Vec<f64> = (0..20).map(|i| i as f64).collect();
    assert_eq!(rsi(&closes, 14), Some(100.0));
}

#[test]
fn test_rsi_only_losses_is_zero() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
    assert!(approx(rsi(&closes, 14).unwrap(), 0.0));
}

#[test]
fn test_rsi_balanced_moves() {
    // alternating +1 / -1 over an even window -> equal averages -> 50
    let mut closes = vec![10.0];
    for i in 0..14 {
        let last = *closes.last().unwrap();
        closes.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
    }
    assert!(approx(rsi(&closes, 14).unwrap(), 50.0));
}

#[test]
fn test_rsi_uses_last_window_only() {
    // a large early drop must not leak into the 2-period window
    let closes = [100.0, 50.0, 51.0, 52.0];
    assert_eq!(rsi(&closes, 2), Some(100.0));
}

#[test]
fn test_rsi_known_value() {
    // deltas in window: +2, -1 -> avg gain 1, avg loss 0.5, rs 2 -> 66.67
    let closes = [10.0, 12.0, 11.0];
    let value = rsi(&closes, 2).unwrap();
    assert!(approx(value, 100.0 - 100.0 / 3.0));
}

#[test]
fn test_sma() {
    assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
    assert_eq!(sma(&[1.0], 2), None);
}

#[test]
fn test_bollinger_constant_series_collapses() {
    let bands = bollinger(&[5.0; 20], 20, 2.0).unwrap();
    assert!(approx(bands.lower, 5.0));
    assert!(approx(bands.upper, 5.0));
    assert_eq!(bands.percent_b(5.0), None);
}

#[test]
fn test_bollinger_sample_deviation() {
    // mean 2.5, sample variance 5/3
    let bands = bollinger(&[1.0, 2.0, 3.0, 4.0], 4, 2.0).unwrap();
    let sd = (5.0f64 / 3.0).sqrt();
    assert!(approx(bands.middle, 2.5));
    assert!(approx(bands.upper, 2.5 + 2.0 * sd));
    assert!(approx(bands.lower, 2.5 - 2.0 * sd));
    assert!(approx(bands.percent_b(2.5).unwrap(), 0.5));
}

#[test]
fn test_bollinger_insufficient() {
    assert_eq!(bollinger(&[1.0, 2.0], 20, 2.0), None);
}

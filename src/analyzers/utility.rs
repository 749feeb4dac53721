/// Mean and population standard deviation of a series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spread {
    pub mean: f64,
    pub stddev: f64,
}

/// Computes the [`Spread`] of `values`. An empty series yields zeros.
pub fn spread(values: &[f64]) -> Spread {
    if values.is_empty() {
        return Spread::default();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Spread {
        mean,
        stddev: variance.sqrt(),
    }
}

/// Arithmetic mean of `values`. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    spread(values).mean
}

/// Milliseconds per hour, for converting time windows.
pub const MS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_empty_is_zero() {
        assert_eq!(spread(&[]), Spread::default());
    }

    #[test]
    fn test_mean_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0]), 1.5);
    }

    #[test]
    fn test_spread_known_series() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(
            spread(&values),
            Spread {
                mean: 5.0,
                stddev: 2.0
            }
        );
    }
}

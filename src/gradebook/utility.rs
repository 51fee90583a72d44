/// `100 * got / possible`, or `None` when nothing was possible.
pub fn percent(got: f64, possible: f64) -> Option<f64> {
    if possible == 0.0 {
        return None;
    }
    Some(got / possible * 100.0)
}

/// Weighted mean over `(value, weight)` pairs, skipping absent values.
///
/// Returns the mean together with the sum of the weights that contributed.
/// The mean is `None` only when no value contributed. If the contributing
/// weights sum to zero, the values are averaged unweighted.
pub fn weighted_mean<I>(pairs: I) -> (Option<f64>, f64)
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let mut weighted_total = 0.0;
    let mut weight_sum = 0.0;
    let mut plain_total = 0.0;
    let mut contributed = 0usize;

    for (value, weight) in pairs {
        if let Some(v) = value {
            weighted_total += v * weight;
            weight_sum += weight;
            plain_total += v;
            contributed += 1;
        }
    }

    let mean = match contributed {
        0 => None,
        n if weight_sum == 0.0 => Some(plain_total / n as f64),
        _ => Some(weighted_total / weight_sum),
    };
    (mean, weight_sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_with_zero_possible() {
        assert_eq!(percent(5.0, 0.0), None);
    }

    #[test]
    fn test_percent_normal_values() {
        assert_eq!(percent(40.0, 50.0), Some(80.0));
        assert_eq!(percent(1.0, 4.0), Some(25.0));
    }

    #[test]
    fn test_weighted_mean_skips_absent_values() {
        let (mean, weights) = weighted_mean([(Some(80.0), 1.0), (None, 5.0), (Some(100.0), 1.0)]);
        assert_eq!(mean, Some(90.0));
        assert_eq!(weights, 2.0);
    }

    #[test]
    fn test_weighted_mean_zero_weight_still_counts_as_graded() {
        let (mean, weights) = weighted_mean([(Some(80.0), 0.0), (None, 5.0)]);
        assert_eq!(mean, Some(80.0));
        assert_eq!(weights, 0.0);

        let (mean, _) = weighted_mean([(Some(80.0), 0.0), (Some(100.0), 0.0)]);
        assert_eq!(mean, Some(90.0));
    }

    #[test]
    fn test_weighted_mean_all_absent() {
        let (mean, weights) = weighted_mean([(None, 1.0), (None, 2.0)]);
        assert_eq!(mean, None);
        assert_eq!(weights, 0.0);
    }
}

//! Mean and standard deviation over a subset of pixels

use ndarray::ArrayView2;

/// First two moments of the selected pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (no Bessel correction)
    pub std_dev: f64,
}

/// Moments of the values for which `include` holds.
///
/// Returns `None` when no value is selected.
pub fn masked_moments<F>(values: ArrayView2<'_, f64>, include: F) -> Option<Moments>
where
    F: Fn(f64) -> bool,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    for &v in values.iter().filter(|&&v| include(v)) {
        count += 1;
        sum += v;
    }
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;

    let mut sq = 0.0;
    for &v in values.iter().filter(|&&v| include(v)) {
        let d = v - mean;
        sq += d * d;
    }
    Some(Moments {
        count,
        mean,
        std_dev: (sq / count as f64).sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_positive_subset() {
        let a = array![[0.0, 2.0, 4.0, -1.0], [4.0, 4.0, 5.0, 0.0], [5.0, 7.0, 9.0, -3.0]];
        let m = masked_moments(a.view(), |v| v > 0.0).unwrap();
        assert_eq!(m.count, 8);
        assert_relative_eq!(m.mean, 5.0);
        assert_relative_eq!(m.std_dev, 2.0);
    }

    #[test]
    fn test_nothing_selected() {
        let a = array![[0.0, -3.0]];
        assert!(masked_moments(a.view(), |v| v > 0.0).is_none());
    }

    #[test]
    fn test_custom_predicate() {
        let a = array![[f64::NAN, 3.0, 3.0]];
        let m = masked_moments(a.view(), |v| v != 0.0 && !v.is_nan()).unwrap();
        assert_eq!(m.count, 2);
        assert_relative_eq!(m.std_dev, 0.0);
    }
}

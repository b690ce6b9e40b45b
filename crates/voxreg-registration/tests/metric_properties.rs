use proptest::prelude::*;
use voxreg_core::transform::RigidParameters;
use voxreg_registration::metric::{estimate, Correspondence, IntensityBinning};
use voxreg_registration::optimizer::ConvergenceWindow;

fn correspondences(pairs: &[(f64, f64, f64)]) -> Vec<Correspondence> {
    pairs
        .iter()
        .map(|&(f, m, g)| Correspondence {
            fixed_value: f,
            moving_value: m,
            moving_jacobian: RigidParameters::from([0.0, 0.0, g, 1.0, -g, 0.5]),
        })
        .collect()
}

fn binnings() -> (IntensityBinning, IntensityBinning) {
    (IntensityBinning::new(0.0, 10.0, 20), IntensityBinning::new(0.0, 5.0, 20))
}

proptest! {
    #[test]
    fn test_estimate_ignores_sample_order(
        pairs in prop::collection::vec((0.0f64..10.0, 0.0f64..5.0, -1.0f64..1.0), 1..700),
        rotation in 0usize..700,
    ) {
        let (fixed, moving) = binnings();
        let mut samples = correspondences(&pairs);
        let a = estimate(&samples, &fixed, &moving);

        let len = samples.len();
        samples.rotate_left(rotation % len);
        samples.reverse();
        let b = estimate(&samples, &fixed, &moving);

        prop_assert_eq!(a.valid_samples, b.valid_samples);
        prop_assert!((a.value - b.value).abs() < 1e-9, "{} vs {}", a.value, b.value);
        prop_assert!((a.gradient - b.gradient).norm() < 1e-9 * (1.0 + a.gradient.norm()));
    }

    #[test]
    fn test_mutual_information_is_non_negative(
        pairs in prop::collection::vec((0.0f64..10.0, 0.0f64..5.0, -1.0f64..1.0), 1..300),
    ) {
        let (fixed, moving) = binnings();
        let evaluation = estimate(&correspondences(&pairs), &fixed, &moving);
        // The value is the negated mutual information.
        prop_assert!(evaluation.value <= 1e-12, "value {}", evaluation.value);
    }

    #[test]
    fn test_window_spread_matches_trailing_values(
        values in prop::collection::vec(-1e3f64..1e3, 0..40),
        size in 2usize..12,
    ) {
        let mut window = ConvergenceWindow::new(size);
        for v in &values {
            window.push(*v);
        }
        match window.spread() {
            Some(spread) => {
                prop_assert!(values.len() >= size);
                prop_assert!(spread >= 0.0);
                let tail = &values[values.len() - size..];
                let hi = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let lo = tail.iter().copied().fold(f64::INFINITY, f64::min);
                prop_assert_eq!(spread, hi - lo);
            }
            None => prop_assert!(values.len() < size),
        }
    }
}

use std::sync::Arc;
use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use voxreg_core::image::{ImageGeometry, PixelType, Volume};
use voxreg_core::interpolation::InterpolationMode;
use voxreg_core::spatial::{Direction, Point3, Spacing3};
use voxreg_core::transform::RigidTransform;
use voxreg_registration::metric::{MattesMutualInformation, Metric, RandomSampler};
use voxreg_registration::optimizer::{GradientDescentConfig, LearningRateEstimation, StopCondition};
use voxreg_registration::{
    CancellationToken, HistoryCallback, RegistrationConfig, RegistrationEngine, RegistrationError,
};

type B = NdArray<f32>;

/// Anisotropic Gaussian ellipsoid on a `d³` unit grid, centered at `c`.
fn make_ellipsoid(d: usize, c: [f64; 3], sigma: [f64; 3]) -> Volume {
    let geometry = ImageGeometry::with_size([d, d, d]).unwrap();
    Volume::from_fn(geometry, |[x, y, z]| {
        let p = [x as f64, y as f64, z as f64];
        let e: f64 = (0..3).map(|k| (p[k] - c[k]).powi(2) / (2.0 * sigma[k] * sigma[k])).sum();
        (1000.0 * (-e).exp()) as f32
    })
}

#[test]
fn test_self_registration_stays_at_identity() {
    let volume = make_ellipsoid(32, [15.5, 15.5, 15.5], [7.0, 5.0, 4.0]);
    let config = RegistrationConfig::default()
        .with_seed(42)
        .with_number_of_histogram_bins(50)
        .with_sampling_percentage(0.05)
        .with_optimizer(GradientDescentConfig::default().with_number_of_iterations(100));

    let outcome = RegistrationEngine::new(config).register(&volume, &volume).unwrap();

    let parameters = outcome.transform.parameters();
    println!(
        "Self registration parameters: {:?} after {} iterations ({:?})",
        parameters.as_slice(),
        outcome.iterations,
        outcome.stop_condition
    );
    assert_eq!(outcome.stop_condition, StopCondition::Converged);
    for k in 0..3 {
        assert!(parameters[k].abs() < 0.02, "rotation {} = {}", k, parameters[k]);
        assert!(parameters[k + 3].abs() < 0.5, "translation {} = {}", k, parameters[k + 3]);
    }

    // Mutual information at identity is the best this histogram can do, up
    // to the estimator's small bias.
    let metric = MattesMutualInformation::new(&volume, &volume, 50, InterpolationMode::NearestNeighbor).unwrap();
    let samples = RandomSampler::new(0.05, 42).unwrap().draw(&volume);
    let identity = RigidTransform::identity(volume.geometry().geometric_center());
    let at_identity = metric.evaluate(&identity, &samples).unwrap().value;
    assert!(outcome.metric_value <= at_identity, "{} vs {}", outcome.metric_value, at_identity);
    assert!(
        (outcome.metric_value - at_identity).abs() < 0.02 * at_identity.abs(),
        "{} vs {}",
        outcome.metric_value,
        at_identity
    );
    assert_eq!(outcome.seed, 42);
    assert_eq!(outcome.aligned.geometry(), volume.geometry());
}

/// Constant-intensity ball of `radius` on a `d³` unit grid.
fn make_sphere(d: usize, c: [f64; 3], radius: f64) -> Volume {
    let geometry = ImageGeometry::with_size([d, d, d]).unwrap();
    Volume::from_fn(geometry, |[x, y, z]| {
        let p = [x as f64, y as f64, z as f64];
        let d2: f64 = (0..3).map(|k| (p[k] - c[k]).powi(2)).sum();
        if d2 <= radius * radius { 100.0f32 } else { 0.0 }
    })
}

#[test]
fn test_recovers_offset_sphere_with_defaults() {
    let fixed = make_sphere(64, [31.5, 31.5, 31.5], 15.0);
    let moving = make_sphere(64, [36.5, 31.5, 31.5], 15.0);
    let config = RegistrationConfig::default().with_seed(42);

    let outcome = RegistrationEngine::new(config).register(&moving, &fixed).unwrap();

    let t = outcome.transform.translation();
    println!(
        "Sphere translation {:?}, angles {:?} after {} iterations ({:?})",
        t.to_array(),
        outcome.transform.angles().to_array(),
        outcome.iterations,
        outcome.stop_condition
    );
    assert_eq!(outcome.stop_condition, StopCondition::Converged);
    assert!((t[0] - 5.0).abs() < 0.5, "Translation X error: {}", t[0]);
    assert!(t[1].abs() < 0.5, "Translation Y error: {}", t[1]);
    assert!(t[2].abs() < 0.5, "Translation Z error: {}", t[2]);
    assert!(outcome.metric_value < outcome.initial_metric_value);
}

#[test]
fn test_nan_voxel_is_rejected() {
    let fixed = make_ellipsoid(16, [7.5, 7.5, 7.5], [4.0, 3.0, 2.0]);
    let geometry = *fixed.geometry();
    let mut values = fixed.as_slice::<f32>().unwrap().to_vec();
    values[geometry.linear_index([8, 8, 8])] = f32::NAN;
    let moving = Volume::from_vec(geometry, values).unwrap();

    let result = RegistrationEngine::new(RegistrationConfig::default().with_seed(5)).register(&moving, &fixed);
    assert_eq!(
        result.map(|o| o.stop_condition),
        Err(RegistrationError::NonFiniteIntensity { image: "Moving".into(), count: 1 })
    );
}

#[test]
fn test_best_value_never_increases() {
    let fixed = make_ellipsoid(24, [11.5, 11.5, 11.5], [5.0, 4.0, 3.0]);
    let moving = make_ellipsoid(24, [13.0, 11.5, 11.5], [5.0, 4.0, 3.0]);
    let config = RegistrationConfig::default()
        .with_seed(7)
        .with_number_of_histogram_bins(32)
        .with_sampling_percentage(0.1)
        .with_interpolator(InterpolationMode::Linear)
        .with_optimizer(GradientDescentConfig::default().with_number_of_iterations(40));

    let history = Arc::new(HistoryCallback::new());
    let outcome = RegistrationEngine::new(config)
        .with_callback(history.clone())
        .register(&moving, &fixed)
        .unwrap();

    assert!(outcome.metric_history.windows(2).all(|w| w[1] <= w[0]));
    assert_eq!(outcome.metric_history.len(), outcome.iterations);
    assert_eq!(history.get_history().len(), outcome.iterations);
}

#[test]
fn test_small_fixed_learning_rate_converges() {
    let volume = make_ellipsoid(20, [9.5, 9.5, 9.5], [5.0, 4.0, 3.0]);
    let optimizer = GradientDescentConfig::default()
        .with_learning_rate(1e-4)
        .with_learning_rate_estimation(LearningRateEstimation::Never)
        .with_number_of_iterations(500);
    let config = RegistrationConfig::default()
        .with_seed(11)
        .with_number_of_histogram_bins(32)
        .with_sampling_percentage(0.1)
        .with_optimizer(optimizer);

    let outcome = RegistrationEngine::new(config).register(&volume, &volume).unwrap();

    assert_eq!(outcome.stop_condition, StopCondition::Converged);
    assert!(outcome.iterations < 500);
}

#[test]
fn test_recovers_five_millimetre_translation() {
    let fixed = make_ellipsoid(64, [31.5, 31.5, 31.5], [10.0, 8.0, 6.0]);
    let moving = make_ellipsoid(64, [36.5, 31.5, 31.5], [10.0, 8.0, 6.0]);
    let config = RegistrationConfig::default()
        .with_seed(42)
        .with_number_of_histogram_bins(64)
        .with_sampling_percentage(0.02)
        .with_interpolator(InterpolationMode::Linear)
        .with_optimizer(GradientDescentConfig::default().with_number_of_iterations(200));

    let outcome = RegistrationEngine::new(config).register(&moving, &fixed).unwrap();

    let t = outcome.transform.translation();
    let angles = outcome.transform.angles();
    println!(
        "Recovered translation {:?}, angles {:?} after {} iterations ({:?})",
        t.to_array(),
        angles.to_array(),
        outcome.iterations,
        outcome.stop_condition
    );
    assert!((t[0] - 5.0).abs() < 0.5, "Translation X error: {}", t[0]);
    assert!(t[1].abs() < 0.5, "Translation Y error: {}", t[1]);
    assert!(t[2].abs() < 0.5, "Translation Z error: {}", t[2]);
    for k in 0..3 {
        assert!(angles[k].abs() < 0.02, "Rotation {} error: {}", k, angles[k]);
    }

    // The aligned volume should now match the fixed one near the center.
    let center = [31, 31, 31];
    let aligned = outcome.aligned.value_at(center).unwrap();
    let expected = fixed.value_at(center).unwrap();
    assert!((aligned - expected).abs() < 0.05 * expected, "{} vs {}", aligned, expected);
}

#[test]
fn test_integer_input_is_cast_and_output_keeps_type() {
    let geometry = ImageGeometry::with_size([16, 16, 16]).unwrap();
    let volume = Volume::from_fn(geometry, |[x, y, z]| {
        let d2 = (x as f64 - 7.5).powi(2) + (y as f64 - 7.5).powi(2) + (z as f64 - 7.5).powi(2);
        (500.0 * (-d2 / 20.0).exp()) as u16
    });

    assert!(matches!(
        MattesMutualInformation::new(&volume, &volume, 32, InterpolationMode::Linear),
        Err(RegistrationError::PixelTypeMismatch { expected: PixelType::Float32, actual: PixelType::UInt16 })
    ));

    let config = RegistrationConfig::default()
        .with_seed(3)
        .with_number_of_histogram_bins(32)
        .with_sampling_percentage(0.1)
        .with_optimizer(GradientDescentConfig::default().with_number_of_iterations(5));
    let outcome = RegistrationEngine::new(config).register(&volume, &volume).unwrap();
    assert_eq!(outcome.moving_pixel_type, PixelType::UInt16);
    assert_eq!(outcome.aligned.pixel_type(), PixelType::UInt16);
}

#[test]
fn test_too_few_valid_samples_is_an_error() {
    let fixed = make_ellipsoid(16, [7.5, 7.5, 7.5], [4.0, 3.0, 2.0]);
    let small = ImageGeometry::new(
        [4, 4, 4],
        Point3::new([6.0, 6.0, 6.0]),
        Spacing3::uniform(1.0),
        Direction::identity(),
    )
    .unwrap();
    let moving = Volume::from_fn(small, |[x, y, z]| (x + y + z) as f32);
    let config = RegistrationConfig::default()
        .with_seed(1)
        .with_number_of_histogram_bins(16)
        .with_sampling_percentage(0.1)
        .with_minimum_valid_fraction(1.0);

    let result = RegistrationEngine::new(config).register(&moving, &fixed);
    match result {
        Err(RegistrationError::DegenerateSamples { valid, required }) => {
            assert!(valid < required);
            assert_eq!(required, 409);
        }
        other => panic!("expected degenerate samples, got {:?}", other.map(|o| o.stop_condition)),
    }
}

#[test]
fn test_cancelled_before_start() {
    let volume = make_ellipsoid(12, [5.5, 5.5, 5.5], [3.0, 2.5, 2.0]);
    let token = CancellationToken::new();
    token.cancel();
    let outcome = RegistrationEngine::new(RegistrationConfig::default().with_seed(9).with_number_of_histogram_bins(16))
        .with_cancellation(token)
        .register(&volume, &volume)
        .unwrap();

    assert_eq!(outcome.stop_condition, StopCondition::Cancelled);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.transform, outcome.initial_transform);
    assert!(outcome.metric_value.is_nan());
    assert!(outcome.metric_history.is_empty());
}

#[test]
fn test_config_round_trip() {
    let config = RegistrationConfig::default()
        .with_seed(1234)
        .with_interpolator(InterpolationMode::Linear)
        .with_optimizer(GradientDescentConfig::default().with_maximum_step_size_in_physical_units(0.5));
    let json = serde_json::to_string(&config).unwrap();
    let back: RegistrationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    let partial: RegistrationConfig =
        serde_json::from_str(r#"{"seed": 7, "optimizer": {"learning_rate": 1.5}}"#).unwrap();
    assert_eq!(partial.seed, Some(7));
    assert_eq!(partial.optimizer.learning_rate, 1.5);
    assert_eq!(partial.optimizer.number_of_iterations, 10_000);
    assert_eq!(partial.number_of_histogram_bins, 250);
}

#[test]
fn test_aligned_volume_as_tensor() {
    let device = Default::default();
    let geometry = ImageGeometry::with_size([10, 8, 6]).unwrap();
    let values: Vec<f32> = (0..geometry.num_voxels())
        .map(|i| {
            let [x, y, z] = geometry.voxel_index(i);
            (50.0 * (-((x as f32 - 4.5).powi(2) + (y as f32 - 3.5).powi(2) + (z as f32 - 2.5).powi(2)) / 8.0).exp())
        })
        .collect();
    let tensor = Tensor::<B, 3>::from_data(TensorData::new(values, geometry.shape()), &device);
    let volume = Volume::from_tensor(tensor, geometry).unwrap();

    let config = RegistrationConfig::default()
        .with_seed(2)
        .with_number_of_histogram_bins(16)
        .with_sampling_percentage(0.2)
        .with_optimizer(GradientDescentConfig::default().with_number_of_iterations(3));
    let outcome = RegistrationEngine::new(config).register(&volume, &volume).unwrap();

    let aligned = outcome.aligned.to_tensor::<B>(&device);
    assert_eq!(aligned.dims(), [6, 8, 10]);
    assert_eq!(outcome.aligned.slice_values(2).map(|s| s.len()), Some(80));
}

use voxreg_core::image::ImageGeometry;
use voxreg_core::spatial::{Direction3, Point3, Spacing3, Vector3};
use voxreg_core::transform::{initialize_centered, RigidParameters, RigidTransform, Transform};
use std::f64::consts::PI;

#[test]
fn test_rigid_transform_3d() {
    // Rotate 90 degrees around Z axis (Gamma = PI/2)
    // Point (1, 0, 0) -> (0, 1, 0)
    // Translate by (1, 2, 3) -> (1, 3, 3)
    let transform = RigidTransform::new(
        Point3::origin(),
        Vector3::new([0.0, 0.0, PI / 2.0]),
        Vector3::new([1.0, 2.0, 3.0]),
    );

    let actual = transform.transform_point(&Point3::new([1.0, 0.0, 0.0]));
    let expected = [1.0, 3.0, 3.0];

    assert!((actual[0] - expected[0]).abs() < 1e-12, "X mismatch: got {}, expected {}", actual[0], expected[0]);
    assert!((actual[1] - expected[1]).abs() < 1e-12, "Y mismatch: got {}, expected {}", actual[1], expected[1]);
    assert!((actual[2] - expected[2]).abs() < 1e-12, "Z mismatch: got {}, expected {}", actual[2], expected[2]);
}

#[test]
fn test_rotation_order_is_zyx() {
    // 90 deg about x then 90 deg about z: (0, 1, 0) -> (0, 0, 1) -> (0, 0, 1)
    // 90 deg about z alone would map (0, 1, 0) -> (-1, 0, 0)
    let transform = RigidTransform::new(
        Point3::origin(),
        Vector3::new([PI / 2.0, 0.0, PI / 2.0]),
        Vector3::zeros(),
    );
    let p = transform.transform_point(&Point3::new([0.0, 1.0, 0.0]));
    assert!(p[0].abs() < 1e-12);
    assert!(p[1].abs() < 1e-12);
    assert!((p[2] - 1.0).abs() < 1e-12);
}

#[test]
fn test_rigid_transform_preserves_distances() {
    let transform = RigidTransform::identity(Point3::new([4.0, -2.0, 9.0]))
        .with_parameters(&RigidParameters::from([0.3, -1.1, 2.4, 5.0, 6.0, -7.0]));
    let a = Point3::new([1.0, 2.0, 3.0]);
    let b = Point3::new([-8.0, 0.5, 11.0]);
    let d0 = a.distance(&b);
    let d1 = transform.transform_point(&a).distance(&transform.transform_point(&b));
    assert!((d0 - d1).abs() < 1e-9);
}

#[test]
fn test_centered_initializer_with_oblique_grids() {
    let fixed = ImageGeometry::new(
        [64, 64, 32],
        Point3::new([-20.0, 10.0, 0.0]),
        Spacing3::new([0.5, 0.5, 2.0]),
        Direction3::rotation_z(0.4),
    )
    .unwrap();
    let moving = ImageGeometry::new(
        [40, 50, 60],
        Point3::new([3.0, 3.0, 3.0]),
        Spacing3::new([1.0, 0.8, 0.6]),
        Direction3::identity(),
    )
    .unwrap();

    let transform = initialize_centered(&fixed, &moving);
    let expected = moving.geometric_center() - fixed.geometric_center();

    assert_eq!(*transform.center(), fixed.geometric_center());
    assert!((*transform.translation() - expected).norm() < 1e-12);
    assert_eq!(*transform.angles(), Vector3::zeros());

    // The fixed center lands on the moving center.
    let mapped = transform.transform_point(&fixed.geometric_center());
    assert!(mapped.distance(&moving.geometric_center()) < 1e-12);
}

#[test]
fn test_rigid_transform_serde_roundtrip() {
    let transform = RigidTransform::identity(Point3::new([1.0, 2.0, 3.0]))
        .with_parameters(&RigidParameters::from([0.1, 0.2, 0.3, -1.0, -2.0, -3.0]));
    let json = serde_json::to_string(&transform).unwrap();
    let back: RigidTransform = serde_json::from_str(&json).unwrap();
    assert_eq!(back, transform);
}

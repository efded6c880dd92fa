use super::*;
use glam::Vec4;

#[test]
fn test_default_is_identity() {
    let transform = Transform::default();
    assert_eq!(transform.matrix(), Mat4::IDENTITY);
    assert_eq!(transform.view_matrix(), Mat4::IDENTITY);
}

#[test]
fn test_matrix_applies_scale_then_rotation_then_translation() {
    let transform = Transform::new(
        Vec3::new(10.0, 0.0, 0.0),
        Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        Vec3::splat(2.0),
    );

    let p = transform.matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
    assert!((p.x - 10.0).abs() < 1e-5);
    assert!((p.y - 2.0).abs() < 1e-5);
}

#[test]
fn test_view_matrix_translates_before_rotating() {
    let transform = Transform::new(
        Vec3::new(0.0, 0.0, -5.0),
        Quat::from_rotation_y(std::f32::consts::PI),
        Vec3::ONE,
    );

    // Origin is moved to z = -5, then rotated half a turn around Y
    let p = transform.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!((p.z - 5.0).abs() < 1e-5);
    assert!(p.x.abs() < 1e-5);
}

#[test]
fn test_from_position_keeps_unit_scale() {
    let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(transform.scale, Vec3::ONE);
    assert_eq!(transform.rotation, Quat::IDENTITY);
}

use glam::{Mat4, Vec3, Vec4};
use crate::render::{Camera, CameraType, Projection};
use crate::utils::Transform;

fn perspective() -> Projection {
    Projection::Perspective { fov: std::f32::consts::FRAC_PI_2, aspect: 800.0 / 600.0, near: 0.1, far: 100.0 }
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_projection_camera_type() {
    assert_eq!(perspective().camera_type(), CameraType::PERSPECTIVE);
    let ortho = Projection::Orthographic { width: 10.0, height: 5.0, near: 0.0, far: 1.0 };
    assert_eq!(ortho.camera_type(), CameraType::ORTHOGRAPHIC);
}

#[test]
fn test_perspective_matrix_matches_glam() {
    let expected = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 800.0 / 600.0, 0.1, 100.0);
    assert_eq!(perspective().matrix(), expected);
}

#[test]
fn test_orthographic_matrix_is_centered() {
    let ortho = Projection::Orthographic { width: 10.0, height: 4.0, near: 0.0, far: 1.0 };
    let m = ortho.matrix();

    let right_top = m * Vec4::new(5.0, 2.0, 0.0, 1.0);
    assert!((right_top.x - 1.0).abs() < 1e-5);
    assert!((right_top.y - 1.0).abs() < 1e-5);

    let center = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(center.x.abs() < 1e-5);
    assert!(center.y.abs() < 1e-5);
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn test_camera_new_is_enabled() {
    let camera = Camera::new(2, perspective(), Transform::default());
    assert!(camera.enabled);
    assert_eq!(camera.window, 2);
    assert_eq!(camera.camera_type(), CameraType::PERSPECTIVE);
}

#[test]
fn test_update_aspect_changes_perspective_only() {
    let mut camera = Camera::new(0, perspective(), Transform::default());
    camera.update_aspect(0.5);
    match camera.projection {
        Projection::Perspective { aspect, .. } => assert_eq!(aspect, 0.5),
        _ => panic!("expected perspective"),
    }

    let ortho = Projection::Orthographic { width: 10.0, height: 4.0, near: 0.0, far: 1.0 };
    let mut camera = Camera::new(0, ortho, Transform::default());
    camera.update_aspect(0.5);
    assert_eq!(camera.projection, ortho);
}

#[test]
fn test_camera_view_matrix_uses_transform() {
    let camera = Camera::new(0, perspective(), Transform::from_position(Vec3::new(0.0, 0.0, -5.0)));
    let p = camera.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert_eq!(p.z, -5.0);
}

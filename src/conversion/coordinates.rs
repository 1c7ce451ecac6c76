//! Conversions between the left-handed Y-up convention of imported scenes and the
//! convention requested by [`ConversionOptions`].
//!
//! The handedness change reflects the Z axis: points and directions negate Z, and
//! rotations negate the X and Y components of their quaternion.

use std::f32::consts::FRAC_1_SQRT_2;

use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

use super::{
    options::{ConversionOptions, UpAxis},
    scene::{AnimationKey, Transform},
};

/// Scale factors at or below this value are treated as zero by [`decompose_transform`].
pub const SCALE_EPSILON: f32 = 1e-8;

/// Reflects the Z axis: `diag(1, 1, -1, 1)`.
const MIRROR_Z: Mat4 = Mat4::from_cols(
    Vec4::new(1., 0., 0., 0.),
    Vec4::new(0., 1., 0., 0.),
    Vec4::new(0., 0., -1., 0.),
    Vec4::new(0., 0., 0., 1.),
);

/// A rotation of -90 degrees about X, which takes a Y-up scene to Z-up.
const Z_UP: Quat = Quat::from_xyzw(-FRAC_1_SQRT_2, 0., 0., FRAC_1_SQRT_2);
/// A rotation of -90 degrees about Z, which takes a Y-up scene to X-up.
const X_UP: Quat = Quat::from_xyzw(0., 0., -FRAC_1_SQRT_2, FRAC_1_SQRT_2);

pub fn convert_point(point: Vec3) -> Vec3 {
    Vec3::new(point.x, point.y, -point.z)
}

pub fn convert_direction(direction: Vec3) -> Vec3 {
    Vec3::new(direction.x, direction.y, -direction.z)
}

/// Scale factors are invariant under the reflection.
pub fn convert_scale(scale: Vec3) -> Vec3 {
    scale
}

/// Converts a rotation, returning a normalized quaternion. A zero quaternion produces NaN
/// components.
pub fn convert_orientation(rotation: Quat) -> Quat {
    Quat::from_xyzw(-rotation.x, -rotation.y, rotation.z, rotation.w).normalize()
}

/// Converts a whole matrix by conjugating it with the Z reflection.
pub fn mirror_matrix(matrix: Mat4) -> Mat4 {
    MIRROR_Z * matrix * MIRROR_Z
}

/// Splits an affine matrix into translation, rotation, and scale.
///
/// The scale factors are the lengths of the basis columns. A column whose length is
/// numerically zero is left as is, so the resulting rotation may be degenerate.
pub fn decompose_transform(matrix: Mat4) -> (Vec3, Quat, Vec3) {
    let translation = matrix.w_axis.truncate();
    let mut axes = [
        matrix.x_axis.truncate(),
        matrix.y_axis.truncate(),
        matrix.z_axis.truncate(),
    ];
    let mut scale = [0.; 3];
    for (axis, factor) in axes.iter_mut().zip(scale.iter_mut()) {
        *factor = axis.length();
        if *factor > SCALE_EPSILON {
            *axis /= *factor;
        }
    }
    let rotation = Quat::from_mat3(&Mat3::from_cols(axes[0], axes[1], axes[2])).normalize();

    (translation, rotation, Vec3::from(scale))
}

/// Decomposes a matrix and converts each component into the convention of the output.
pub fn convert_transform_with_options(matrix: Mat4, options: &ConversionOptions) -> Transform {
    let (translation, rotation, scale) = decompose_transform(matrix);
    let (translation, rotation, scale) = convert_trs(translation, rotation, scale, options);

    Transform::Trs {
        translation,
        rotation,
        scale,
    }
}

/// Converts a keyframe into the convention of the output.
pub fn convert_key(key: &AnimationKey, options: &ConversionOptions) -> AnimationKey {
    let (translation, rotation, scale) =
        convert_trs(key.translation, key.rotation, key.scale, options);

    AnimationKey {
        time: key.time,
        translation,
        rotation,
        scale,
    }
}

/// Returns the rotation that reorients a Y-up scene to the given up axis.
pub fn up_axis_rotation(up_axis: UpAxis) -> Option<Quat> {
    match up_axis {
        UpAxis::X => Some(X_UP),
        UpAxis::Y => None,
        UpAxis::Z => Some(Z_UP),
    }
}

fn convert_trs(
    mut translation: Vec3,
    mut rotation: Quat,
    scale: Vec3,
    options: &ConversionOptions,
) -> (Vec3, Quat, Vec3) {
    if options.flips_handedness() {
        translation = convert_point(translation);
        rotation = convert_orientation(rotation);
    }
    translation *= options.scale;
    if let Some(up) = up_axis_rotation(options.up_axis) {
        translation = up * translation;
        rotation = (up * rotation).normalize();
    }

    (translation, rotation, convert_scale(scale))
}

/// Swaps the last two indices of every triangle.
pub fn flip_winding(indices: &mut [usize]) {
    for triangle in indices.chunks_exact_mut(3) {
        triangle.swap(1, 2);
    }
}

pub fn flip_v(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1. - uv.y)
}

/// Returns the XYZ euler angles of a rotation, in degrees. The angles are applied in X,
/// Y, Z order.
pub fn euler_degrees(rotation: Quat) -> Vec3 {
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Inverse of [`euler_degrees`].
pub fn from_euler_degrees(angles: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        angles.z.to_radians(),
        angles.y.to_radians(),
        angles.x.to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conversion::options::Handedness;

    fn sample_rotations() -> Vec<Quat> {
        vec![
            Quat::IDENTITY,
            Quat::from_rotation_x(0.3),
            Quat::from_rotation_y(-1.2),
            Quat::from_axis_angle(Vec3::new(1., 2., 3.).normalize(), 2.5),
            Quat::from_euler(EulerRot::XYZ, 0.1, 0.2, 0.3),
        ]
    }

    fn same_rotation(a: Quat, b: Quat) -> bool {
        a.dot(b).abs() > 1. - 1e-5
    }

    #[test]
    fn point_negates_z() {
        assert_eq!(Vec3::new(1., 2., -3.), convert_point(Vec3::new(1., 2., 3.)));
        assert_eq!(Vec3::new(0., 0., 1.), convert_direction(Vec3::new(0., 0., -1.)));
        assert_eq!(Vec3::new(1., 2., 3.), convert_scale(Vec3::new(1., 2., 3.)));
    }

    #[test]
    fn point_conversion_is_an_involution() {
        let point = Vec3::new(0.5, -7., 12.25);
        assert_eq!(point, convert_point(convert_point(point)));
    }

    #[test]
    fn orientation_conversion_is_an_involution() {
        for rotation in sample_rotations() {
            let twice = convert_orientation(convert_orientation(rotation));
            assert!(same_rotation(rotation, twice), "{:?} != {:?}", rotation, twice);
        }
    }

    #[test]
    fn orientation_matches_mirrored_matrix() {
        for rotation in sample_rotations() {
            let expected = mirror_matrix(Mat4::from_quat(rotation));
            let actual = Mat4::from_quat(convert_orientation(rotation));
            assert!(expected.abs_diff_eq(actual, 1e-5), "{:?} != {:?}", expected, actual);
        }
    }

    #[test]
    fn rotation_about_y_reverses() {
        let converted = convert_orientation(Quat::from_rotation_y(0.7));
        assert!(same_rotation(Quat::from_rotation_y(-0.7), converted));
    }

    #[test]
    fn zero_quaternion_propagates_nan() {
        assert!(convert_orientation(Quat::from_xyzw(0., 0., 0., 0.)).is_nan());
    }

    #[test]
    fn decompose_trs_matrix() {
        let rotation = Quat::from_rotation_z(0.4);
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(2., 3., 4.),
            rotation,
            Vec3::new(1., -2., 5.),
        );

        let (translation, actual_rotation, scale) = decompose_transform(matrix);

        assert_eq!(Vec3::new(1., -2., 5.), translation);
        assert!(scale.abs_diff_eq(Vec3::new(2., 3., 4.), 1e-5));
        assert!(same_rotation(rotation, actual_rotation));
    }

    #[test]
    fn decompose_zero_scale_axis() {
        let matrix = Mat4::from_scale(Vec3::new(0., 1., 1.));

        let (translation, _, scale) = decompose_transform(matrix);

        assert_eq!(Vec3::new(0., 1., 1.), scale);
        assert_eq!(Vec3::ZERO, translation);
    }

    #[test]
    fn convert_transform_flips_handedness_and_scales() {
        let options = ConversionOptions {
            scale: 2.,
            ..Default::default()
        };
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.),
            Quat::IDENTITY,
            Vec3::new(1., 2., 3.),
        );

        let transform = convert_transform_with_options(matrix, &options);

        match transform {
            Transform::Trs {
                translation,
                rotation,
                scale,
            } => {
                assert!(translation.abs_diff_eq(Vec3::new(2., 4., -6.), 1e-5));
                assert!(same_rotation(Quat::IDENTITY, rotation));
                assert!(scale.abs_diff_eq(Vec3::splat(3.), 1e-5));
            }
            Transform::Matrix(_) => panic!("expected a decomposed transform"),
        }
    }

    #[test]
    fn convert_transform_matches_mirrored_matrix() {
        let options = ConversionOptions::default();
        let matrix = Mat4::from_rotation_translation(
            Quat::from_axis_angle(Vec3::new(1., 1., 0.).normalize(), 0.9),
            Vec3::new(4., 5., 6.),
        );

        let converted = convert_transform_with_options(matrix, &options).to_matrix();

        assert!(converted.abs_diff_eq(mirror_matrix(matrix), 1e-5));
    }

    #[test]
    fn left_handed_output_keeps_components() {
        let options = ConversionOptions {
            handedness: Handedness::Left,
            ..Default::default()
        };
        let key = AnimationKey {
            time: 1.,
            translation: Vec3::new(1., 2., 3.),
            rotation: Quat::from_rotation_x(0.5),
            scale: Vec3::splat(2.),
        };

        let converted = convert_key(&key, &options);

        assert_eq!(key.translation, converted.translation);
        assert!(same_rotation(key.rotation, converted.rotation));
        assert_eq!(key.scale, converted.scale);
    }

    #[test]
    fn z_up_rotates_about_x() {
        let options = ConversionOptions {
            handedness: Handedness::Left,
            up_axis: UpAxis::Z,
            ..Default::default()
        };
        let key = AnimationKey {
            translation: Vec3::new(0., 1., 0.),
            ..AnimationKey::at(0.)
        };

        let converted = convert_key(&key, &options);

        assert!(converted.translation.abs_diff_eq(Vec3::new(0., 0., -1.), 1e-5));
        assert!(same_rotation(Quat::from_rotation_x(-FRAC_PI_2), converted.rotation));
        assert!(up_axis_rotation(UpAxis::Y).is_none());
    }

    #[test]
    fn x_up_rotates_about_z() {
        let options = ConversionOptions {
            handedness: Handedness::Left,
            up_axis: UpAxis::X,
            ..Default::default()
        };
        let key = AnimationKey {
            translation: Vec3::new(0., 1., 0.),
            ..AnimationKey::at(0.)
        };

        let converted = convert_key(&key, &options);

        assert!(converted.translation.abs_diff_eq(Vec3::new(1., 0., 0.), 1e-5));
        assert!(same_rotation(Quat::from_rotation_z(-FRAC_PI_2), converted.rotation));
    }

    #[test]
    fn flip_winding_is_self_inverse() {
        let mut indices = vec![0, 1, 2, 3, 4, 5];
        flip_winding(&mut indices);
        assert_eq!(vec![0, 2, 1, 3, 5, 4], indices);
        flip_winding(&mut indices);
        assert_eq!(vec![0, 1, 2, 3, 4, 5], indices);
    }

    #[test]
    fn flip_v_inverts_vertical_coordinate() {
        assert_eq!(Vec2::new(0.25, 0.75), flip_v(Vec2::new(0.25, 0.25)));
    }

    #[test]
    fn euler_degrees_round_trip() {
        let angles = Vec3::new(30., -45., 60.);
        let rotation = from_euler_degrees(angles);

        assert!(euler_degrees(rotation).abs_diff_eq(angles, 1e-3));
        assert!(same_rotation(
            rotation,
            Quat::from_rotation_z(60f32.to_radians())
                * Quat::from_rotation_y(-45f32.to_radians())
                * Quat::from_rotation_x(30f32.to_radians())
        ));
    }
}

use sdxf_core::geometry::{Point3, Vector3};
use sdxf_core::scene::Transform;

/// 十的整数次幂在 f64 中可精确表示的上限。
const EXACT_POW10_MAX: u32 = 22;

/// 不小于此值的 f64 没有小数部分。
const INTEGRAL_THRESHOLD: f64 = 4_503_599_627_370_496.0; // 2^52

/// 按十进制位数四舍五入（半数远离零）。已经满足精度的值原样返回。
pub fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits.min(308) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= INTEGRAL_THRESHOLD {
        return value;
    }
    let rounded = scaled.round();
    if rounded == scaled {
        return value;
    }
    if digits > EXACT_POW10_MAX {
        // 10^digits 不精确，改走十进制文本
        return format!("{value:.prec$}", prec = digits as usize)
            .parse()
            .unwrap_or(value);
    }
    rounded / factor
}

/// 将局部顶点变换到绝对坐标。
///
/// 顺序固定：逐分量缩放，依次绕 X、Y、Z 旋转，平移，按精度取整；
/// `force_2d` 时取整后 z 置 0。
pub fn apply(vertex: Point3, transform: &Transform, precision: u32, force_2d: bool) -> Point3 {
    let scaled = vertex.as_vec3() * transform.scale.as_vec3();
    let rotated = rotate_xyz(scaled, transform.rotation);
    let moved = rotated + transform.position.as_vec3();

    let z = if force_2d {
        0.0
    } else {
        round_to(moved.z, precision)
    };
    Point3::new(
        round_to(moved.x, precision),
        round_to(moved.y, precision),
        z,
    )
}

fn rotate_xyz(v: glam::DVec3, rotation: Vector3) -> glam::DVec3 {
    let glam::DVec3 { mut x, mut y, mut z } = v;

    if rotation.x() != 0.0 {
        let (s, c) = rotation.x().sin_cos();
        (y, z) = (y * c - z * s, y * s + z * c);
    }
    if rotation.y() != 0.0 {
        let (s, c) = rotation.y().sin_cos();
        (x, z) = (x * c + z * s, -x * s + z * c);
    }
    if rotation.z() != 0.0 {
        let (s, c) = rotation.z().sin_cos();
        (x, y) = (x * c - y * s, x * s + y * c);
    }

    glam::DVec3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_returns_rounded_vertex() {
        let p = apply(
            Point3::new(1.23456, -7.89012, 0.00004),
            &Transform::IDENTITY,
            4,
            false,
        );
        assert_eq!(p, Point3::new(1.2346, -7.8901, 0.0));
    }

    #[test]
    fn quarter_turn_about_z_maps_x_axis_to_y_axis() {
        let transform = Transform::from_rotation(Vector3::new(0.0, 0.0, FRAC_PI_2));
        let p = apply(Point3::new(1.0, 0.0, 0.0), &transform, 4, false);
        assert_eq!(p.x(), 0.0);
        assert_eq!(p.y(), 1.0);
        assert_eq!(p.z(), 0.0);
    }

    #[test]
    fn rotations_apply_x_then_y_then_z() {
        // 绕 X 90°：(0,1,0) → (0,0,1)；再绕 Y 90°：(0,0,1) → (1,0,0)
        let transform = Transform::from_rotation(Vector3::new(FRAC_PI_2, FRAC_PI_2, 0.0));
        let p = apply(Point3::new(0.0, 1.0, 0.0), &transform, 6, false);
        assert_eq!(p, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn scale_precedes_translation() {
        let transform = Transform::new(
            Vector3::new(10.0, 0.0, -1.0),
            Vector3::ZERO,
            Vector3::new(2.0, 3.0, 4.0),
        );
        let p = apply(Point3::new(1.0, 1.0, 1.0), &transform, 4, false);
        assert_eq!(p, Point3::new(12.0, 3.0, 3.0));
    }

    #[test]
    fn force_2d_zeroes_z_after_rounding() {
        let transform = Transform::from_rotation(Vector3::new(0.3, 1.1, -0.7));
        for vertex in [
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(-5.5, 0.25, 99.0),
            Point3::new(0.0, 0.0, -0.0001),
        ] {
            let p = apply(vertex, &transform, 3, true);
            assert_eq!(p.z(), 0.0);
        }
    }

    #[test]
    fn precision_zero_rounds_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(f64::MAX, 4), f64::MAX);
    }

    #[test]
    fn high_precision_leaves_exact_values_alone() {
        for digits in [22, 25, 30, 100] {
            for value in [7.77, 123.456, -0.1, 1e-20, 98765.4321] {
                assert_eq!(round_to(value, digits), value, "digits = {digits}");
            }
        }
        assert_eq!(round_to(1.23456789e-24, 26), 1.23e-24);
    }

    #[test]
    fn identity_at_high_precision_is_exact() {
        let vertex = Point3::new(7.77, 123.456, -0.1);
        assert_eq!(apply(vertex, &Transform::IDENTITY, 30, false), vertex);
    }
}

//! Figure-eight path followed by the lemniscate loops.

use glam::Vec2;

/// Point on a lemniscate at angle `a` (radians).
///
/// Periodic in `TAU`, passes through the origin at `a = PI/2` and `3PI/2`,
/// and reaches `x = ±1` at `a = 0` and `a = PI`.
pub fn lemniscate_point(a: f32) -> Vec2 {
    let scale = 2.0 / (3.0 - (2.0 * a).cos());
    Vec2::new(scale * a.cos(), scale * (2.0 * a).sin() / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maf::{PI, TAU};

    #[test]
    fn test_extremes_and_crossing() {
        let p = lemniscate_point(0.0);
        assert!((p.x - 1.0).abs() < 1e-6 && p.y.abs() < 1e-6);
        let p = lemniscate_point(PI);
        assert!((p.x + 1.0).abs() < 1e-6 && p.y.abs() < 1e-5);
        let p = lemniscate_point(PI / 2.0);
        assert!(p.length() < 1e-6);
    }

    #[test]
    fn test_periodic() {
        for i in 0..16 {
            let a = i as f32 * 0.37;
            assert!((lemniscate_point(a) - lemniscate_point(a + TAU)).length() < 1e-4);
        }
    }

    #[test]
    fn test_symmetric_lobes() {
        let a = 0.4;
        let p = lemniscate_point(a);
        let q = lemniscate_point(PI - a);
        assert!((p.x + q.x).abs() < 1e-5);
        assert!((p.y + q.y).abs() < 1e-5);
    }
}

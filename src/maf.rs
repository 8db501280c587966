//! Scalar math helpers shared by the loops.
//!
//! Small, allocation-free functions used by the per-frame instance math:
//! bump shaping, positive modulo, interpolation and start-up randomness.

use rand::Rng;

pub const PI: f32 = std::f32::consts::PI;
pub const TAU: f32 = std::f32::consts::TAU;

/// Bump function: 0 at `x = 0` and `x = 1`, peaking at 1 for `x = 0.5`.
///
/// `k` sharpens (k > 1) or flattens (k < 1) the peak.
pub fn parabola(x: f32, k: f32) -> f32 {
    (4.0 * x * (1.0 - x)).powf(k)
}

/// Modulo that always lands in `[0, n)` for positive `n`, even for negative `m`.
pub fn modulo(m: f32, n: f32) -> f32 {
    ((m % n) + n) % n
}

pub fn clamp(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

/// Linear interpolation between `a` and `b`.
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Uniform value in `[min, max)`. An empty range yields `min`.
pub fn random_in_range<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max <= min {
        return min;
    }
    rng.random_range(min..max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parabola_shape() {
        assert_eq!(parabola(0.0, 1.0), 0.0);
        assert_eq!(parabola(1.0, 1.0), 0.0);
        assert!((parabola(0.5, 1.0) - 1.0).abs() < 1e-6);
        assert!((parabola(0.25, 1.0) - 0.75).abs() < 1e-6);
        // Higher exponent narrows the bump.
        assert!(parabola(0.25, 2.0) < parabola(0.25, 1.0));
    }

    #[test]
    fn test_modulo_negative() {
        assert!((modulo(-0.25, 1.0) - 0.75).abs() < 1e-6);
        assert!((modulo(1.25, 1.0) - 0.25).abs() < 1e-6);
        assert_eq!(modulo(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_mix_and_clamp() {
        assert_eq!(mix(2.0, 4.0, 0.0), 2.0);
        assert_eq!(mix(2.0, 4.0, 1.0), 4.0);
        assert_eq!(mix(2.0, 4.0, 0.5), 3.0);
        assert_eq!(clamp(-1.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(2.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_random_in_range_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = random_in_range(&mut rng, 0.0, 0.25 * TAU);
            assert!((0.0..0.25 * TAU).contains(&v));
        }
        assert_eq!(random_in_range(&mut rng, 1.0, 1.0), 1.0);
    }
}

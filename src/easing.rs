//! Easing table used to shape animation timing.
//!
//! Every curve maps 0 to 0 and 1 to 1. Inputs outside `[0, 1]` are not clamped,
//! matching how the loops feed them already-normalized progress values.

use serde::{Deserialize, Serialize};

use crate::maf::PI;

/// Easing curve. Names follow the usual `In`/`Out`/`InOut` + family scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
}

impl Easing {
    pub const ALL: [Easing; 22] = [
        Easing::Linear,
        Easing::InQuad,
        Easing::OutQuad,
        Easing::InOutQuad,
        Easing::InCubic,
        Easing::OutCubic,
        Easing::InOutCubic,
        Easing::InQuart,
        Easing::OutQuart,
        Easing::InOutQuart,
        Easing::InQuint,
        Easing::OutQuint,
        Easing::InOutQuint,
        Easing::InSine,
        Easing::OutSine,
        Easing::InOutSine,
        Easing::InExpo,
        Easing::OutExpo,
        Easing::InOutExpo,
        Easing::InCirc,
        Easing::OutCirc,
        Easing::InOutCirc,
    ];

    /// Evaluate the curve at `t`.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::InQuad => t * t,
            Easing::OutQuad => t * (2.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::InCubic => t * t * t,
            Easing::OutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
            Easing::InQuart => t * t * t * t,
            Easing::OutQuart => {
                let u = t - 1.0;
                1.0 - u * u * u * u
            }
            Easing::InOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 - 8.0 * u * u * u * u
                }
            }
            Easing::InQuint => t * t * t * t * t,
            Easing::OutQuint => {
                let u = 1.0 - t;
                1.0 - u * u * u * u * u
            }
            Easing::InOutQuint => {
                if t < 0.5 {
                    16.0 * t * t * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u * u * u + 1.0
                }
            }
            Easing::InSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::OutSine => (t * PI / 2.0).sin(),
            Easing::InOutSine => -0.5 * ((PI * t).cos() - 1.0),
            Easing::InExpo => {
                if t == 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * (t - 1.0))
                }
            }
            Easing::OutExpo => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            Easing::InOutExpo => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    0.5 * 2f32.powf(20.0 * t - 10.0)
                } else {
                    1.0 - 0.5 * 2f32.powf(-20.0 * t + 10.0)
                }
            }
            Easing::InCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Easing::OutCirc => {
                let u = t - 1.0;
                (1.0 - u * u).max(0.0).sqrt()
            }
            Easing::InOutCirc => {
                if t < 0.5 {
                    0.5 * (1.0 - (1.0 - 4.0 * t * t).max(0.0).sqrt())
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * ((1.0 - u * u).max(0.0).sqrt() + 1.0)
                }
            }
        }
    }

    /// Look up a curve by name, e.g. `"OutQuint"`. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Easing> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "Linear",
            Easing::InQuad => "InQuad",
            Easing::OutQuad => "OutQuad",
            Easing::InOutQuad => "InOutQuad",
            Easing::InCubic => "InCubic",
            Easing::OutCubic => "OutCubic",
            Easing::InOutCubic => "InOutCubic",
            Easing::InQuart => "InQuart",
            Easing::OutQuart => "OutQuart",
            Easing::InOutQuart => "InOutQuart",
            Easing::InQuint => "InQuint",
            Easing::OutQuint => "OutQuint",
            Easing::InOutQuint => "InOutQuint",
            Easing::InSine => "InSine",
            Easing::OutSine => "OutSine",
            Easing::InOutSine => "InOutSine",
            Easing::InExpo => "InExpo",
            Easing::OutExpo => "OutExpo",
            Easing::InOutExpo => "InOutExpo",
            Easing::InCirc => "InCirc",
            Easing::OutCirc => "OutCirc",
            Easing::InOutCirc => "InOutCirc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for easing in Easing::ALL {
            assert!(easing.apply(0.0).abs() < 1e-5, "{} at 0", easing.name());
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-5, "{} at 1", easing.name());
        }
    }

    #[test]
    fn test_out_quint() {
        let v = Easing::OutQuint.apply(0.5);
        assert!((v - (1.0 - 0.5f32.powi(5))).abs() < 1e-6);
        // Ease-out runs ahead of linear.
        assert!(Easing::OutQuint.apply(0.2) > 0.2);
    }

    #[test]
    fn test_monotonic() {
        for easing in Easing::ALL {
            let mut prev = easing.apply(0.0);
            for i in 1..=100 {
                let v = easing.apply(i as f32 / 100.0);
                assert!(v >= prev - 1e-5, "{} not monotonic at {}", easing.name(), i);
                prev = v;
            }
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Easing::from_name("OutQuint"), Some(Easing::OutQuint));
        assert_eq!(Easing::from_name("outquint"), Some(Easing::OutQuint));
        assert_eq!(Easing::from_name("bounce"), None);
    }
}

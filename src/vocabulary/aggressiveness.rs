//! Cubic-Bezier aggressiveness curve mapping vocabulary size to a pruning
//! aggressiveness in `[0,1]` (§4.4).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggressivenessProfileName {
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    Aggressive,
    Gentle,
    Exponential,
}

impl AggressivenessProfileName {
    /// Control points `(x1, y1, x2, y2)` for the named profile, matching the
    /// reference implementation's closed set exactly.
    pub fn control_points(self) -> (f64, f64, f64, f64) {
        use AggressivenessProfileName::*;
        match self {
            Linear => (0.0, 0.0, 1.0, 1.0),
            Ease => (0.25, 0.1, 0.25, 1.0),
            EaseIn => (0.42, 0.0, 1.0, 1.0),
            EaseOut => (0.0, 0.0, 0.58, 1.0),
            EaseInOut => (0.42, 0.0, 0.58, 1.0),
            Aggressive => (0.1, 0.0, 0.9, 1.0),
            Gentle => (0.5, 0.5, 0.5, 0.5),
            Exponential => (0.7, 0.0, 0.84, 0.0),
        }
    }

    pub fn curve(self) -> CubicBezier {
        let (x1, y1, x2, y2) = self.control_points();
        CubicBezier::new(x1, y1, x2, y2)
    }
}

impl Default for AggressivenessProfileName {
    fn default() -> Self {
        AggressivenessProfileName::Aggressive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyZone {
    Comfort,
    Watch,
    Merge,
    Mixed,
    Emergency,
    Block,
}

/// A cubic Bezier curve fixed at `(0,0)` and `(1,1)`, parameterized by two
/// interior control points, evaluated via Newton-Raphson inversion on `x`
/// (8 iterations, ε=1e-6) — a direct port of the reference `CubicBezier`.
#[derive(Debug, Clone, Copy)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

const NEWTON_ITERATIONS: u32 = 8;
const EPSILON: f64 = 1e-6;

impl CubicBezier {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn sample_curve(t: f64, p1: f64, p2: f64) -> f64 {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        ((a * t + b) * t + c) * t
    }

    fn sample_curve_derivative(t: f64, p1: f64, p2: f64) -> f64 {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        (3.0 * a * t + 2.0 * b) * t + c
    }

    /// Invert the parametric `x(t)` curve to find `t` for a given `x`.
    pub fn solve_x(&self, x: f64) -> f64 {
        let mut t = x;
        for _ in 0..NEWTON_ITERATIONS {
            let x_at_t = Self::sample_curve(t, self.x1, self.x2) - x;
            if x_at_t.abs() < EPSILON {
                return t;
            }
            let derivative = Self::sample_curve_derivative(t, self.x1, self.x2);
            if derivative.abs() < EPSILON {
                break;
            }
            t -= x_at_t / derivative;
        }
        t.clamp(0.0, 1.0)
    }

    /// Evaluate `B(x)`, the curve's y-value at the given x-position.
    pub fn bezier(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        let t = self.solve_x(x);
        Self::sample_curve(t, self.y1, self.y2)
    }
}

pub struct AggressivenessThresholds {
    pub vocab_min: usize,
    pub vocab_max: usize,
    pub vocab_emergency: usize,
}

/// Map vocabulary size `size` to an aggressiveness value in `[0,1]` and a
/// zone label (§4.4).
pub fn calculate_aggressiveness(
    size: usize,
    thresholds: &AggressivenessThresholds,
    profile: AggressivenessProfileName,
) -> (f64, VocabularyZone) {
    let AggressivenessThresholds { vocab_min, vocab_max, vocab_emergency } = *thresholds;

    if size <= vocab_min {
        return (0.0, VocabularyZone::Comfort);
    }
    if size >= vocab_emergency {
        return (1.0, VocabularyZone::Block);
    }

    let curve = profile.curve();
    let aggressiveness = if size <= vocab_max {
        let span = (vocab_max - vocab_min).max(1) as f64;
        let x = ((size - vocab_min) as f64 / span).clamp(0.0, 1.0);
        curve.bezier(x)
    } else {
        let base = curve.bezier(1.0);
        let overage_span = (vocab_emergency - vocab_max).max(1) as f64;
        let overage = ((size - vocab_max) as f64 / overage_span).clamp(0.0, 1.0);
        base + (1.0 - base) * overage
    };

    let zone = if size >= vocab_emergency {
        VocabularyZone::Block
    } else if aggressiveness < 0.2 {
        VocabularyZone::Comfort
    } else if aggressiveness < 0.5 {
        VocabularyZone::Watch
    } else if aggressiveness < 0.7 {
        VocabularyZone::Merge
    } else if aggressiveness < 0.9 {
        VocabularyZone::Mixed
    } else {
        VocabularyZone::Emergency
    };

    (aggressiveness, zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_is_identity() {
        let curve = AggressivenessProfileName::Linear.curve();
        for x in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert!((curve.bezier(x) - x).abs() < 1e-3, "x={x}");
        }
    }

    #[test]
    fn below_min_is_comfort_zone() {
        let thresholds = AggressivenessThresholds { vocab_min: 30, vocab_max: 90, vocab_emergency: 200 };
        let (a, zone) = calculate_aggressiveness(10, &thresholds, AggressivenessProfileName::Aggressive);
        assert_eq!(a, 0.0);
        assert!(matches!(zone, VocabularyZone::Comfort));
    }

    #[test]
    fn at_emergency_is_block() {
        let thresholds = AggressivenessThresholds { vocab_min: 30, vocab_max: 90, vocab_emergency: 200 };
        let (a, zone) = calculate_aggressiveness(200, &thresholds, AggressivenessProfileName::Aggressive);
        assert_eq!(a, 1.0);
        assert!(matches!(zone, VocabularyZone::Block));
    }

    #[test]
    fn overage_blends_toward_one() {
        let thresholds = AggressivenessThresholds { vocab_min: 30, vocab_max: 90, vocab_emergency: 200 };
        let (at_max, _) = calculate_aggressiveness(90, &thresholds, AggressivenessProfileName::Aggressive);
        let (past_max, _) = calculate_aggressiveness(150, &thresholds, AggressivenessProfileName::Aggressive);
        assert!(past_max > at_max);
        assert!(past_max < 1.0);
    }

    #[test]
    fn aggressive_profile_control_points_match_reference() {
        assert_eq!(AggressivenessProfileName::Aggressive.control_points(), (0.1, 0.0, 0.9, 1.0));
        assert_eq!(AggressivenessProfileName::Exponential.control_points(), (0.7, 0.0, 0.84, 0.0));
    }
}

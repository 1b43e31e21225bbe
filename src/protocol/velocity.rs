//! Pad pressure → MIDI velocity curve
//!
//! Raw pad pressure is normalized against the device's fixed pressure range
//! and bent through a quadratic Bezier whose control point is set by a single
//! curve factor: negative rises early (convex), positive rises late
//! (concave), zero is exactly linear.

/// Lowest raw pressure the sensors report for a real touch.
pub const MIN_PRESSURE: u32 = 0;
/// Saturation point of the pressure sensors (12-bit).
pub const MAX_PRESSURE: u32 = 4095;

/// Default curve factor: slightly early-rising, matches the factory feel.
pub const DEFAULT_CURVE_FACTOR: f32 = -0.35;

/// Velocity reported for every strike in fixed-accent mode.
pub const FIXED_ACCENT_VELOCITY: u8 = 127;

/// Pressure-to-velocity mapping for one device.
#[derive(Debug, Clone, Copy)]
pub struct VelocityCurve {
    min_pressure: u32,
    max_pressure: u32,
    curve_factor: f32,
}

impl VelocityCurve {
    pub fn new(min_pressure: u32, max_pressure: u32, curve_factor: f32) -> Self {
        debug_assert!(max_pressure > min_pressure);
        Self {
            min_pressure,
            max_pressure,
            curve_factor,
        }
    }

    /// Factory curve for the stock pressure range.
    pub fn factory() -> Self {
        Self::new(MIN_PRESSURE, MAX_PRESSURE, DEFAULT_CURVE_FACTOR)
    }

    pub fn with_factor(curve_factor: f32) -> Self {
        Self::new(MIN_PRESSURE, MAX_PRESSURE, curve_factor)
    }

    /// Map raw pressure to a 0-127 velocity.
    ///
    /// Pressure at or below the minimum is silence (0). Anything above it
    /// reports at least 1 — a touch must never vanish into velocity 0, the
    /// host would interpret that as a note-off.
    pub fn velocity(&self, raw_pressure: u32) -> u8 {
        if raw_pressure <= self.min_pressure {
            return 0;
        }
        let clamped = raw_pressure.min(self.max_pressure);
        let t = (clamped - self.min_pressure) as f32
            / (self.max_pressure - self.min_pressure) as f32;

        // Quadratic Bezier through P0=0, P2=1 with P1 pulled by the factor.
        // P1 = 0.5 is the identity, so factor 0 degenerates to linear.
        let p1 = (0.5 - self.curve_factor * 0.5).clamp(0.0, 1.0);
        let curved = 2.0 * (1.0 - t) * t * p1 + t * t;

        let v = (curved * 127.0).round() as u8;
        v.max(1).min(127)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pressure_is_silence() {
        let curve = VelocityCurve::factory();
        assert_eq!(curve.velocity(MIN_PRESSURE), 0);
    }

    #[test]
    fn test_any_touch_is_audible() {
        let curve = VelocityCurve::factory();
        assert_eq!(curve.velocity(MIN_PRESSURE + 1), 1);
    }

    #[test]
    fn test_max_pressure_is_full_velocity() {
        let curve = VelocityCurve::factory();
        assert_eq!(curve.velocity(MAX_PRESSURE), 127);
        // Saturated sensors clamp, they do not wrap.
        assert_eq!(curve.velocity(MAX_PRESSURE + 1000), 127);
    }

    #[test]
    fn test_linear_at_factor_zero() {
        let curve = VelocityCurve::with_factor(0.0);
        // 2048/4095 * 127 = 63.5, rounds up
        assert_eq!(curve.velocity((MAX_PRESSURE + 1) / 2), 64);
    }

    #[test]
    fn test_negative_factor_rises_early() {
        let linear = VelocityCurve::with_factor(0.0);
        let convex = VelocityCurve::with_factor(-0.5);
        let mid = MAX_PRESSURE / 2;
        assert!(convex.velocity(mid) > linear.velocity(mid));
    }

    #[test]
    fn test_positive_factor_rises_late() {
        let linear = VelocityCurve::with_factor(0.0);
        let concave = VelocityCurve::with_factor(0.5);
        let mid = MAX_PRESSURE / 2;
        assert!(concave.velocity(mid) < linear.velocity(mid));
    }

    #[test]
    fn test_monotonic_over_range() {
        let curve = VelocityCurve::factory();
        let mut last = 0;
        for raw in (0..=MAX_PRESSURE).step_by(64) {
            let v = curve.velocity(raw);
            assert!(v >= last, "curve must not dip: {} -> {}", last, v);
            last = v;
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn velocity_always_in_midi_range(raw in 0u32..=u32::MAX, factor in -1.0f32..=1.0) {
                let curve = VelocityCurve::with_factor(factor);
                let v = curve.velocity(raw);
                prop_assert!(v <= 127);
                if raw > MIN_PRESSURE {
                    prop_assert!(v >= 1);
                } else {
                    prop_assert_eq!(v, 0);
                }
            }
        }
    }
}

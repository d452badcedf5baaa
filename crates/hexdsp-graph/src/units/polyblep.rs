//! Polynomial bandlimited-step corrections for the cheap oscillators.
//!
//! The full table-driven correction lives in `hexdsp_core::HexBlep`; for the
//! square and triangle a two-sample polynomial approximation is plenty.

/// Correction for a step of amplitude 2 (a `-1` to `+1` edge), nonzero
/// within one phase increment on either side of the edge.
///
/// `t` is the normalized phase relative to the edge at 0; `dt` is the phase
/// increment per sample.
#[inline]
pub(crate) fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let t = t / dt;
        t + t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

/// Residual of a unit slope change (the integral of the step residual),
/// peaking at the corner and vanishing one sample away on either side.
///
/// The caller scales the result by the per-sample slope change.
#[inline]
pub(crate) fn poly_blamp(t: f32, dt: f32) -> f32 {
    if t < dt {
        let u = 1.0 - t / dt;
        u * u * u / 6.0
    } else if t > 1.0 - dt {
        let u = 1.0 + (t - 1.0) / dt;
        u * u * u / 6.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blep_is_zero_away_from_the_edge() {
        assert_eq!(poly_blep(0.5, 0.01), 0.0);
        assert_eq!(poly_blep(0.25, 0.1), 0.0);
    }

    #[test]
    fn blep_cancels_the_edge() {
        let dt = 0.01;

        // Just after a rising edge the naive square sits at +1; the
        // correction pulls the first sample back toward the midpoint.
        assert!((poly_blep(0.0, dt) + 1.0).abs() < 1e-6);

        // Just before the edge the naive square sits at -1; the correction
        // pushes the last sample up toward the midpoint.
        assert!((poly_blep(1.0 - dt * 1e-3, dt) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn blep_fades_to_zero_at_one_increment() {
        let dt = 0.01;
        assert!(poly_blep(dt * 0.999, dt).abs() < 1e-2);
        assert!(poly_blep(1.0 - dt * 0.999, dt).abs() < 1e-2);
    }

    #[test]
    fn blamp_peaks_at_the_corner() {
        let dt = 0.01;

        let at_corner = poly_blamp(0.0, dt);
        assert!((at_corner - 1.0 / 6.0).abs() < 1e-6);

        assert!(poly_blamp(dt * 0.999, dt).abs() < 1e-6);
        assert_eq!(poly_blamp(0.5, dt), 0.0);
    }

    #[test]
    fn blamp_is_symmetric_around_the_corner() {
        let dt = 0.05;
        for frac in [0.1f32, 0.4, 0.8] {
            let after = poly_blamp(dt * frac, dt);
            let before = poly_blamp(1.0 - dt * frac, dt);
            assert!((after - before).abs() < 1e-5, "frac {frac}");
        }
    }
}

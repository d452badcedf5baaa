//! Bandlimited step and ramp correction table.
//!
//! A naive waveform with a hard discontinuity (or a hard slope change)
//! aliases. Instead of bandlimiting the whole waveform, the table stores the
//! *residual* between a bandlimited step/ramp and the naive one, so an
//! oscillator can generate the cheap aliased waveform and accumulate a short
//! correction window over each discontinuity to cancel the aliasing.

use std::f64::consts::PI;

/// The widest correction window supported.
pub const MAX_BLEP_WIDTH: usize = 64;

/// Precomputed bandlimited step (`blep`) and bandlimited ramp (`blamp`)
/// residuals, deinterleaved into `oversample + 1` rows of `width` samples so
/// a query can linearly interpolate between two adjacent sub-sample offsets.
pub struct HexBlep {
    width: usize,
    oversample: usize,
    blep: Vec<f32>,
    blamp: Vec<f32>,
}

impl HexBlep {
    /// Build the table by integrating a Nuttall-windowed sinc at a 16x finer
    /// grid: the first accumulator turns the impulse into a step, the second
    /// turns the step into a ramp.
    ///
    /// `width` must be even and at most [`MAX_BLEP_WIDTH`].
    pub fn new(width: usize, oversample: usize) -> Self {
        assert!(width >= 2 && width <= MAX_BLEP_WIDTH && width % 2 == 0);
        assert!(oversample >= 1);

        let halfwidth = width / 2;
        let half = halfwidth * oversample;
        let n = 2 * half + 1;

        let mut step = vec![0.0f64; n];
        let mut ramp = vec![0.0f64; n];

        let mut integrate_impulse = 0.0f64;
        let mut integrate_step = 0.0f64;
        for i in 0..n {
            for j in 0..16 {
                let pos = (i * 16 + j) as f64;
                let center = (half * 16) as f64;

                let sinc_t = PI * (pos - center) / (oversample as f64 * 16.0);
                let sinc = if pos == center {
                    1.0
                } else {
                    sinc_t.sin() / sinc_t
                };

                let wt = 2.0 * PI * pos / ((n * 16 - 1) as f64);
                let window = 0.355768 - 0.487396 * wt.cos() + 0.144232 * (2.0 * wt).cos()
                    - 0.012604 * (3.0 * wt).cos();

                integrate_impulse += sinc * window / 16.0;
                integrate_step += integrate_impulse / 16.0;
            }
            step[i] = integrate_impulse;
            ramp[i] = integrate_step;
        }

        // Normalise: the step must settle at 1 and the ramp must leave the
        // window with a slope of 1 per output sample.
        let step_scale = 1.0 / step[n - 1];
        let ramp_scale = halfwidth as f64 / ramp[n - 1];
        for i in 0..n {
            step[i] *= step_scale;
            ramp[i] *= ramp_scale;
        }

        // Deinterleave into `oversample + 1` rows of `width` samples; row j
        // holds the window sampled at sub-sample offset j/oversample. The
        // extra row keeps the query's lerp branch-free at the top end.
        let rows = oversample + 1;
        let mut blep = vec![0.0f32; rows * width];
        let mut blamp = vec![0.0f32; rows * width];
        for j in 0..rows {
            for i in 0..width {
                blep[j * width + i] = step[i * oversample + j] as f32;
                blamp[j * width + i] = ramp[i * oversample + j] as f32;
            }
        }

        // Subtract the naive step and ramp past the center so the stored
        // residual can be accumulated directly onto an aliased waveform.
        for j in 0..rows {
            for i in halfwidth..width {
                blep[j * width + i] -= 1.0;
                blamp[j * width + i] -= (j + i * oversample - half) as f32 / oversample as f32;
            }
        }

        Self {
            width,
            oversample,
            blep,
            blamp,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn oversample(&self) -> usize {
        self.oversample
    }

    /// Accumulate a step residual into `output`, scaled by `scale`.
    ///
    /// `t` in `[0, 1)` is the sub-sample position of the discontinuity
    /// within the sample where it occurred. `output` should be at least
    /// `width` samples long; shorter slices receive a truncated window.
    pub fn blep(&self, output: &mut [f32], t: f32, scale: f32) {
        self.add_residual(output, t, scale, &self.blep);
    }

    /// Accumulate a ramp residual into `output`, scaled by `scale`.
    pub fn blamp(&self, output: &mut [f32], t: f32, scale: f32) {
        self.add_residual(output, t, scale, &self.blamp);
    }

    fn add_residual(&self, output: &mut [f32], t: f32, scale: f32, table: &[f32]) {
        let pos = t.clamp(0.0, 1.0) * self.oversample as f32;
        let row = (pos as usize).min(self.oversample - 1);
        let lerp = pos - row as f32;

        let d1 = &table[row * self.width..(row + 1) * self.width];
        let d2 = &table[(row + 1) * self.width..(row + 2) * self.width];

        let len = self.width.min(output.len());
        for i in 0..len {
            output[i] += scale * (d1[i] + (d2[i] - d1[i]) * lerp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_vanishes_at_the_window_edges() {
        let table = HexBlep::new(32, 8);

        let mut out = vec![0.0f32; 32];
        table.blep(&mut out, 0.0, 1.0);

        assert!(out[0].abs() < 0.01, "leading edge {}", out[0]);
        assert!(out[31].abs() < 0.01, "trailing edge {}", out[31]);
    }

    #[test]
    fn step_residual_peaks_near_half_amplitude_at_the_center() {
        let table = HexBlep::new(32, 8);

        let mut out = vec![0.0f32; 32];
        table.blep(&mut out, 0.0, 1.0);

        // Just past the center the naive step has been subtracted, so the
        // residual sits near -0.5 and decays back to zero.
        assert!((out[16] + 0.5).abs() < 0.1, "center {}", out[16]);
    }

    #[test]
    fn residual_plus_naive_step_is_monotonic_through_the_transition() {
        let table = HexBlep::new(32, 8);

        let mut out = vec![0.0f32; 32];
        table.blep(&mut out, 0.0, 1.0);

        // Reconstruct the bandlimited step and check it lands on 0 and 1.
        let mut reconstructed = vec![0.0f32; 32];
        for i in 0..32 {
            let naive = if i >= 16 { 1.0 } else { 0.0 };
            reconstructed[i] = naive + out[i];
        }
        assert!(reconstructed[0].abs() < 0.01);
        assert!((reconstructed[31] - 1.0).abs() < 0.01);
    }

    #[test]
    fn query_scales_and_accumulates() {
        let table = HexBlep::new(16, 4);

        let mut once = vec![0.0f32; 16];
        table.blep(&mut once, 0.25, 1.0);

        let mut twice = vec![0.0f32; 16];
        table.blep(&mut twice, 0.25, 2.0);

        let mut accumulated = vec![0.0f32; 16];
        table.blep(&mut accumulated, 0.25, 1.0);
        table.blep(&mut accumulated, 0.25, 1.0);

        for i in 0..16 {
            assert!((twice[i] - 2.0 * once[i]).abs() < 1e-6);
            assert!((accumulated[i] - twice[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn ramp_residual_is_finite_and_small() {
        let table = HexBlep::new(32, 8);

        let mut out = vec![0.0f32; 32];
        table.blamp(&mut out, 0.5, 1.0);

        for (i, s) in out.iter().enumerate() {
            assert!(s.is_finite() && s.abs() < 1.0, "sample {i} = {s}");
        }
        assert!(out[31].abs() < 0.01, "trailing edge {}", out[31]);
    }

    #[test]
    fn truncated_output_takes_a_partial_window() {
        let table = HexBlep::new(16, 4);

        let mut full = vec![0.0f32; 16];
        table.blep(&mut full, 0.0, 1.0);

        let mut short = vec![0.0f32; 4];
        table.blep(&mut short, 0.0, 1.0);

        assert_eq!(&short[..], &full[..4]);
    }
}

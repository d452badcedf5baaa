use hexdsp_core::{Unit, UnitInfo};

use super::polyblep::poly_blamp;

/// A triangle oscillator, `2·|2·phase − 1| − 1`, with polyBLAMP smoothing at
/// the two slope corners.
pub struct TriangleUnit {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
}

impl TriangleUnit {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            sample_rate: 0.0,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }
}

impl Unit for TriangleUnit {
    fn debug_name(&self) -> &'static str {
        "triangle"
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            num_max_inputs: 0,
            num_max_outputs: 16,
            is_sink: false,
        }
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_frames: usize) {
        self.sample_rate = sample_rate as f32;
    }

    fn run(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let Some(frames) = outputs.first().map(|o| o.len()) else {
            return;
        };
        if self.sample_rate == 0.0 || self.frequency == 0.0 {
            return;
        }

        let dt = self.frequency / self.sample_rate;

        for i in 0..frames {
            self.phase += dt;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }

            let naive = 2.0 * (2.0 * self.phase - 1.0).abs() - 1.0;

            // Slope goes +4 -> -4 at the peak (phase 0) and -4 -> +4 at the
            // trough (phase 0.5); the blamp rounds both corners.
            let mut t_trough = self.phase - 0.5;
            if t_trough < 0.0 {
                t_trough += 1.0;
            }
            let s = naive - 8.0 * dt * poly_blamp(self.phase, dt)
                + 8.0 * dt * poly_blamp(t_trough, dt);

            for out in outputs.iter_mut() {
                out[i] += s;
            }
        }
    }
}

impl From<TriangleUnit> for Box<dyn Unit> {
    fn from(unit: TriangleUnit) -> Self {
        Box::new(unit)
    }
}

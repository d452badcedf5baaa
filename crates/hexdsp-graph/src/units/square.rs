use hexdsp_core::{Unit, UnitInfo};

use super::polyblep::poly_blep;

/// A polyBLEP-smoothed pulse oscillator with a configurable duty cycle.
///
/// The naive pulse is `+1` below the duty boundary and `-1` above it; the
/// polynomial correction smooths both the duty edge and the period wrap
/// within one phase increment on either side.
pub struct SquareUnit {
    frequency: f32,
    duty: f32,
    phase: f32,
    sample_rate: f32,
}

impl SquareUnit {
    pub fn new(frequency: f32, duty: f32) -> Self {
        Self {
            frequency,
            duty: clamp_duty(duty),
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

    pub fn duty(&self) -> f32 {
        self.duty
    }

    pub fn set_duty(&mut self, duty: f32) {
        self.duty = clamp_duty(duty);
    }
}

/// The duty cycle lives strictly inside `(0, 1)`; a pulse with no high or no
/// low portion degenerates into DC.
fn clamp_duty(duty: f32) -> f32 {
    duty.clamp(1e-4, 1.0 - 1e-4)
}

impl Unit for SquareUnit {
    fn debug_name(&self) -> &'static str {
        "square"
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
        let duty = self.duty;

        for i in 0..frames {
            self.phase += dt;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }

            let naive = if self.phase < duty { 1.0 } else { -1.0 };

            // Rising edge at the period wrap, falling edge at the duty
            // boundary.
            let mut s = naive + poly_blep(self.phase, dt);
            let mut t_fall = self.phase - duty;
            if t_fall < 0.0 {
                t_fall += 1.0;
            }
            s -= poly_blep(t_fall, dt);

            for out in outputs.iter_mut() {
                out[i] += s;
            }
        }
    }
}

impl From<SquareUnit> for Box<dyn Unit> {
    fn from(unit: SquareUnit) -> Self {
        Box::new(unit)
    }
}

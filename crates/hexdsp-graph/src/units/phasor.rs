use hexdsp_core::{Unit, UnitInfo};

/// A bare phase accumulator emitting its own phase in `[0, 1)`.
///
/// Useful directly as a naive ramp, and as the timebase other oscillators
/// are built from.
pub struct PhasorUnit {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
}

impl PhasorUnit {
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

impl Unit for PhasorUnit {
    fn debug_name(&self) -> &'static str {
        "phasor"
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
        if self.sample_rate == 0.0 {
            return;
        }

        let inc = self.frequency / self.sample_rate;

        for i in 0..frames {
            self.phase += inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
            let s = self.phase;
            for out in outputs.iter_mut() {
                out[i] += s;
            }
        }
    }
}

impl From<PhasorUnit> for Box<dyn Unit> {
    fn from(unit: PhasorUnit) -> Self {
        Box::new(unit)
    }
}

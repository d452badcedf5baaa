use hexdsp_core::{Unit, UnitInfo};

/// A linear control-signal generator: glides from `from` to `to` over
/// `duration` samples once started, holding the endpoints on either side.
pub struct RampUnit {
    from: f32,
    to: f32,
    duration: u32,
    start_time: Option<u64>,
}

impl RampUnit {
    pub fn new(from: f32, to: f32, duration: u32) -> Self {
        Self {
            from,
            to,
            duration,
            start_time: None,
        }
    }

    pub fn set_range(&mut self, from: f32, to: f32) {
        self.from = from;
        self.to = to;
    }

    pub fn set_duration(&mut self, duration: u32) {
        self.duration = duration;
    }

    /// Begin the glide at absolute sample time `t0`.
    pub fn start(&mut self, t0: u64) {
        self.start_time = Some(t0);
    }

    /// The ramp value at absolute sample time `t`.
    pub fn value(&self, t: u64) -> f32 {
        let Some(t0) = self.start_time else {
            return self.from;
        };

        if t < t0 {
            self.from
        } else if t >= t0 + self.duration as u64 {
            self.to
        } else {
            self.from + (self.to - self.from) * (t - t0) as f32 / self.duration as f32
        }
    }
}

impl Unit for RampUnit {
    fn debug_name(&self) -> &'static str {
        "ramp"
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            num_max_inputs: 0,
            num_max_outputs: 16,
            is_sink: false,
        }
    }

    fn run(&mut self, time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let Some(frames) = outputs.first().map(|o| o.len()) else {
            return;
        };

        for i in 0..frames {
            let s = self.value(time + i as u64);
            for out in outputs.iter_mut() {
                out[i] += s;
            }
        }
    }
}

impl From<RampUnit> for Box<dyn Unit> {
    fn from(unit: RampUnit) -> Self {
        Box::new(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_the_start_value_until_started() {
        let ramp = RampUnit::new(0.25, 1.0, 8);
        assert_eq!(ramp.value(0), 0.25);
        assert_eq!(ramp.value(1000), 0.25);
    }

    #[test]
    fn glides_linearly_and_clamps() {
        let mut ramp = RampUnit::new(0.0, 1.0, 4);
        ramp.start(10);

        assert_eq!(ramp.value(9), 0.0);
        assert!((ramp.value(11) - 0.25).abs() < 1e-6);
        assert!((ramp.value(12) - 0.5).abs() < 1e-6);
        assert_eq!(ramp.value(14), 1.0);
        assert_eq!(ramp.value(100), 1.0);
    }

    #[test]
    fn descending_ramps_work() {
        let mut ramp = RampUnit::new(1.0, 0.0, 2);
        ramp.start(0);

        assert!((ramp.value(1) - 0.5).abs() < 1e-6);
        assert_eq!(ramp.value(2), 0.0);
    }

    #[test]
    fn zero_duration_jumps_to_the_target() {
        let mut ramp = RampUnit::new(0.0, 0.75, 0);
        ramp.start(5);

        assert_eq!(ramp.value(4), 0.0);
        assert_eq!(ramp.value(5), 0.75);
    }

    #[test]
    fn emits_the_curve_additively() {
        let mut ramp = RampUnit::new(1.0, 1.0, 0);
        ramp.start(0);

        let mut out = vec![0.5f32; 4];
        ramp.run(0, &[], &mut [&mut out[..]]);

        assert!(out.iter().all(|&s| (s - 1.5).abs() < 1e-6));
    }
}

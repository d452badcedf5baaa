use hexdsp_core::{Unit, UnitInfo};

/// Attack-peak-decay-hold-sustain-release envelope parameters. Stage
/// lengths are in whole samples; `peak` and `sustain` are levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApdhsrParams {
    pub attack: u32,
    pub peak: f32,
    pub decay: u32,
    pub hold: u32,
    pub sustain: f32,
    pub release: u32,
}

/// An envelope that multiplies its input by a piecewise-linear level curve.
///
/// `start(t0)` precomputes the absolute end time of every stage; the level
/// at any sample time is then a pure function of `t`, so the envelope stays
/// deterministic across blocks and block sizes. Ramps interpolate linearly
/// on integer sample times.
pub struct ApdhsrUnit {
    params: ApdhsrParams,
    start_time: Option<u64>,
    attack_end: u64,
    decay_end: u64,
    hold_end: u64,
    release_end: u64,
}

impl ApdhsrUnit {
    pub fn new(params: ApdhsrParams) -> Self {
        Self {
            params,
            start_time: None,
            attack_end: 0,
            decay_end: 0,
            hold_end: 0,
            release_end: 0,
        }
    }

    pub fn params(&self) -> ApdhsrParams {
        self.params
    }

    /// Replace the stage parameters. If the envelope is running, the stage
    /// boundaries are recomputed from its original start time.
    pub fn set_params(&mut self, params: ApdhsrParams) {
        self.params = params;
        if let Some(t0) = self.start_time {
            self.start(t0);
        }
    }

    /// Begin (or retrigger) the envelope at absolute sample time `t0`.
    pub fn start(&mut self, t0: u64) {
        self.start_time = Some(t0);
        self.attack_end = t0 + self.params.attack as u64;
        self.decay_end = self.attack_end + self.params.decay as u64;
        self.hold_end = self.decay_end + self.params.hold as u64;
        self.release_end = self.hold_end + self.params.release as u64;
    }

    /// The envelope level at absolute sample time `t`: zero before the
    /// start and after the release, linear ramps through attack, decay and
    /// release, constant sustain in between.
    pub fn level(&self, t: u64) -> f32 {
        let Some(t0) = self.start_time else {
            return 0.0;
        };
        let p = &self.params;

        if t < t0 || t >= self.release_end {
            0.0
        } else if t < self.attack_end {
            p.peak * (t - t0) as f32 / p.attack as f32
        } else if t < self.decay_end {
            p.peak + (p.sustain - p.peak) * (t - self.attack_end) as f32 / p.decay as f32
        } else if t < self.hold_end {
            p.sustain
        } else {
            p.sustain * (1.0 - (t - self.hold_end) as f32 / p.release as f32)
        }
    }
}

impl Unit for ApdhsrUnit {
    fn debug_name(&self) -> &'static str {
        "apdhsr"
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            num_max_inputs: 1,
            num_max_outputs: 16,
            is_sink: false,
        }
    }

    fn run(&mut self, time: u64, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let Some(input) = inputs.first() else {
            return;
        };

        for i in 0..input.len() {
            let s = input[i] * self.level(time + i as u64);
            for out in outputs.iter_mut() {
                out[i] += s;
            }
        }
    }
}

impl From<ApdhsrUnit> for Box<dyn Unit> {
    fn from(unit: ApdhsrUnit) -> Self {
        Box::new(unit)
    }
}

use hexdsp_core::{util, Unit, UnitInfo};

/// Scales each input channel by a fixed level.
///
/// When the unit feeds more destinations than it has input channels, the
/// last input channel is replicated across the extra outputs.
pub struct GainUnit {
    level: f32,
}

impl GainUnit {
    pub fn new(level: f32) -> Self {
        Self { level }
    }

    pub fn new_db(db: f32) -> Self {
        Self {
            level: util::db_to_amp_clamped_neg_100_db(db),
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = level;
    }

    pub fn set_level_db(&mut self, db: f32) {
        self.level = util::db_to_amp_clamped_neg_100_db(db);
    }
}

impl Unit for GainUnit {
    fn debug_name(&self) -> &'static str {
        "gain"
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            num_max_inputs: 16,
            num_max_outputs: 16,
            is_sink: false,
        }
    }

    fn run(&mut self, _time: u64, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        if inputs.is_empty() {
            return;
        }

        let level = self.level;
        for (j, out) in outputs.iter_mut().enumerate() {
            let input = inputs[j.min(inputs.len() - 1)];
            for i in 0..out.len() {
                out[i] += input[i] * level;
            }
        }
    }
}

impl From<GainUnit> for Box<dyn Unit> {
    fn from(unit: GainUnit) -> Self {
        Box::new(unit)
    }
}

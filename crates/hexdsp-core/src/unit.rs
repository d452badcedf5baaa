use downcast_rs::Downcast;

/// A DSP operator in the audio graph.
pub trait Unit: 'static + Downcast {
    /// A stable name for diagnostics and logging. Not required to be
    /// unique.
    fn debug_name(&self) -> &'static str;

    fn info(&self) -> UnitInfo;

    /// Called once when the unit is inserted into a graph, before the first
    /// `run`.
    #[allow(unused)]
    fn prepare(&mut self, sample_rate: u32, max_block_frames: usize) {}

    /// Process exactly one block of audio starting at sample time `time`.
    ///
    /// Every slice in `inputs` and `outputs` has the current block length.
    /// `inputs[ch]` is the already-mixed bus feeding input channel `ch`.
    /// `outputs[j]` is the j-th destination bus (or, for sink units, the
    /// j-th host output channel).
    ///
    /// Implementations *MUST* accumulate into the output slices, never
    /// overwrite them: buses start zeroed at the top of each block and
    /// fan-in mixing relies on every producer adding its contribution.
    fn run(&mut self, time: u64, inputs: &[&[f32]], outputs: &mut [&mut [f32]]);
}

downcast_rs::impl_downcast!(Unit);

/// Static description of a [`Unit`]'s ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitInfo {
    /// The maximum number of input channels this unit reads.
    ///
    /// This value must not exceed [`MAX_CHANNELS`](crate::MAX_CHANNELS).
    pub num_max_inputs: u32,

    /// The maximum number of destinations this unit feeds.
    ///
    /// This value must not exceed [`MAX_CHANNELS`](crate::MAX_CHANNELS).
    pub num_max_outputs: u32,

    /// Whether this unit is a sink: sinks write directly into the
    /// host-provided output channels and terminate the schedule.
    pub is_sink: bool,
}

impl Default for UnitInfo {
    fn default() -> Self {
        Self {
            num_max_inputs: 0,
            num_max_outputs: 0,
            is_sink: false,
        }
    }
}

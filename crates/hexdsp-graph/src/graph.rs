mod schedule;
mod scheduler;

use std::fmt::Debug;
use std::hash::Hash;

use arrayvec::ArrayVec;

use hexdsp_core::{util, Pool, PoolKey, Unit, UnitInfo, DEFAULT_MAX_BLOCK_FRAMES, MAX_CHANNELS};

use crate::error::GraphError;

pub use schedule::Schedule;
use schedule::BusPool;

/// A stable identifier for a unit in a [`Graph`].
#[derive(Clone, Copy)]
pub struct UnitId {
    pub key: PoolKey,
    pub debug_name: &'static str,
}

impl UnitId {
    pub const DANGLING: Self = Self {
        key: PoolKey::DANGLING,
        debug_name: "dangling",
    };
}

impl Default for UnitId {
    fn default() -> Self {
        Self::DANGLING
    }
}

impl PartialEq for UnitId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for UnitId {}

impl Ord for UnitId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for UnitId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for UnitId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Debug for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.debug_name,
            self.key.slot(),
            self.key.generation()
        )
    }
}

/// The index of an input channel on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelIdx(pub u16);

impl ChannelIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for ChannelIdx {
    fn from(value: usize) -> Self {
        Self(value as u16)
    }
}

/// A connection from a producing unit into one input channel of a consuming
/// unit.
///
/// The same `(source, dest)` pair may be connected at several channels. A
/// duplicate on the same channel stays in the list but is idempotent in
/// effect: the scheduler keys bus assignment on the `(dest, channel)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub source: UnitId,
    pub dest: UnitId,
    pub channel: ChannelIdx,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphConfig {
    pub sample_rate: u32,
    pub max_block_frames: usize,
    pub unit_capacity: usize,
    pub connection_capacity: usize,
    pub sink_capacity: usize,
    pub bus_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            max_block_frames: DEFAULT_MAX_BLOCK_FRAMES,
            unit_capacity: 128,
            connection_capacity: 256,
            sink_capacity: 16,
            bus_capacity: 64,
        }
    }
}

pub(crate) struct UnitEntry {
    pub id: UnitId,
    pub info: UnitInfo,
    pub inputs_connected: u32,
    pub outputs_connected: u32,
    /// Input bus per channel, written by the scheduler.
    pub bus_ids: [u32; MAX_CHANNELS],
    pub unit: Box<dyn Unit>,
}

/// A directed graph of [`Unit`]s executed once per audio block.
///
/// The graph owns the unit pool, the connection list, the compiled schedule,
/// and the bus pool that ferries samples between units. Mutation
/// (`add_unit`, `connect`, `remove_unit`, ...) and execution (`run`) must be
/// serialised by the host; the engine provides no locks.
pub struct Graph {
    units: Pool<UnitEntry>,
    connections: Vec<Connection>,
    sinks: Vec<UnitId>,

    schedule: Schedule,
    buses: BusPool,
    scratch: scheduler::Scratch,

    /// Planar staging for the interleaved entry point, one
    /// `max_block_frames` buffer per channel.
    staging_in: Vec<Vec<f32>>,
    staging_out: Vec<Vec<f32>>,

    /// Bumped by every mutation; the schedule is valid only while it still
    /// matches the value captured by the last successful `reschedule`.
    modification_count: u64,
    scheduled_at: Option<u64>,
    invalid: bool,
    warned_stale: bool,

    sample_rate: u32,
    max_block_frames: usize,
    sink_capacity: usize,
    bus_capacity: usize,
}

impl Graph {
    pub fn new(config: GraphConfig) -> Self {
        assert!(config.max_block_frames > 0);

        Self {
            units: Pool::with_capacity(config.unit_capacity),
            connections: Vec::with_capacity(config.connection_capacity),
            sinks: Vec::with_capacity(config.sink_capacity),
            schedule: Schedule::empty(),
            buses: BusPool::new(config.max_block_frames, config.bus_capacity),
            scratch: scheduler::Scratch::with_capacity(
                config.unit_capacity,
                config.connection_capacity,
            ),
            staging_in: (0..MAX_CHANNELS)
                .map(|_| vec![0.0; config.max_block_frames])
                .collect(),
            staging_out: (0..MAX_CHANNELS)
                .map(|_| vec![0.0; config.max_block_frames])
                .collect(),
            modification_count: 0,
            scheduled_at: None,
            invalid: false,
            warned_stale: false,
            sample_rate: config.sample_rate,
            max_block_frames: config.max_block_frames,
            sink_capacity: config.sink_capacity,
            bus_capacity: config.bus_capacity,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_block_frames(&self) -> usize {
        self.max_block_frames
    }

    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.units.iter().map(|(_, e)| e.id)
    }

    /// The schedule produced by the last successful [`Graph::reschedule`].
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// `true` while the compiled schedule still matches the graph.
    pub fn needs_reschedule(&self) -> bool {
        self.scheduled_at != Some(self.modification_count)
    }

    /// `false` once the engine has latched an unrecoverable scheduling
    /// inconsistency; cleared by the next successful [`Graph::reschedule`].
    pub fn is_valid(&self) -> bool {
        !self.invalid
    }

    /// Add a unit to the graph, growing the pool if it is full.
    ///
    /// The unit's `prepare` is called with the graph's sample rate and
    /// maximum block length before it becomes reachable.
    pub fn add_unit(&mut self, unit: impl Into<Box<dyn Unit>>) -> Result<UnitId, GraphError> {
        self.add_boxed(unit.into(), false)
    }

    /// Add a unit without allocating beyond the pool's pre-sized capacity.
    pub fn add_unit_real_time(
        &mut self,
        unit: impl Into<Box<dyn Unit>>,
    ) -> Result<UnitId, GraphError> {
        self.add_boxed(unit.into(), true)
    }

    fn add_boxed(&mut self, mut unit: Box<dyn Unit>, real_time: bool) -> Result<UnitId, GraphError> {
        let info = unit.info();
        assert!(info.num_max_inputs as usize <= MAX_CHANNELS);
        assert!(info.num_max_outputs as usize <= MAX_CHANNELS);

        if info.is_sink && self.sinks.len() == self.sink_capacity {
            return Err(GraphError::OutOfCapacity);
        }

        unit.prepare(self.sample_rate, self.max_block_frames);

        let debug_name = unit.debug_name();
        let entry = UnitEntry {
            id: UnitId::DANGLING,
            info,
            inputs_connected: 0,
            outputs_connected: 0,
            bus_ids: [0; MAX_CHANNELS],
            unit,
        };

        let key = if real_time {
            self.units
                .insert_within_capacity(entry)
                .map_err(|_| GraphError::OutOfCapacity)?
        } else {
            self.units.insert(entry)
        };

        let id = UnitId { key, debug_name };
        if let Some(entry) = self.units.get_mut(key) {
            entry.id = id;
        }

        if info.is_sink {
            self.sinks.push(id);
        }

        self.modification_count += 1;
        Ok(id)
    }

    /// Borrow a unit for inspection. Callers reach concrete unit types with
    /// `downcast_ref`.
    pub fn unit(&self, id: UnitId) -> Option<&dyn Unit> {
        self.units.get(id.key).map(|e| e.unit.as_ref())
    }

    /// Borrow a unit for parameter changes. Callers reach concrete unit
    /// types with `downcast_mut`. Safe only while the host guarantees no
    /// concurrent `run`.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut dyn Unit> {
        self.units.get_mut(id.key).map(|e| e.unit.as_mut())
    }

    /// The number of connections in which `id` is the consumer.
    pub fn inputs_connected(&self, id: UnitId) -> Option<u32> {
        self.units.get(id.key).map(|e| e.inputs_connected)
    }

    /// The number of connections in which `id` is the producer.
    pub fn outputs_connected(&self, id: UnitId) -> Option<u32> {
        self.units.get(id.key).map(|e| e.outputs_connected)
    }

    /// Record a connection from `source` into input channel `channel` of
    /// `dest`.
    pub fn connect(
        &mut self,
        source: UnitId,
        dest: UnitId,
        channel: impl Into<ChannelIdx>,
    ) -> Result<(), GraphError> {
        let channel: ChannelIdx = channel.into();

        if !self.units.contains(source.key) {
            return Err(GraphError::UnitNotFound(source));
        }
        let Some(dest_entry) = self.units.get(dest.key) else {
            return Err(GraphError::UnitNotFound(dest));
        };
        if channel.index() >= MAX_CHANNELS
            || channel.0 as u32 >= dest_entry.info.num_max_inputs
        {
            return Err(GraphError::ChannelOutOfRange(channel));
        }
        if source == dest {
            return Err(GraphError::FeedbackLoop(source));
        }

        self.connections.push(Connection {
            source,
            dest,
            channel,
        });
        if let Some(entry) = self.units.get_mut(source.key) {
            entry.outputs_connected += 1;
        }
        if let Some(entry) = self.units.get_mut(dest.key) {
            entry.inputs_connected += 1;
        }

        self.modification_count += 1;
        Ok(())
    }

    /// Remove the first matching connection. Removing a connection that does
    /// not exist is a silent no-op.
    pub fn disconnect(&mut self, source: UnitId, dest: UnitId, channel: impl Into<ChannelIdx>) {
        let channel: ChannelIdx = channel.into();

        let Some(pos) = self
            .connections
            .iter()
            .position(|c| c.source == source && c.dest == dest && c.channel == channel)
        else {
            return;
        };
        self.connections.remove(pos);

        if let Some(entry) = self.units.get_mut(source.key) {
            entry.outputs_connected -= 1;
        }
        if let Some(entry) = self.units.get_mut(dest.key) {
            entry.inputs_connected -= 1;
        }

        self.modification_count += 1;
    }

    /// Remove a unit along with every connection touching it.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<(), GraphError> {
        if self.units.remove(id.key).is_none() {
            return Err(GraphError::UnitNotFound(id));
        }

        let mut i = 0;
        while i < self.connections.len() {
            let c = self.connections[i];
            if c.source == id || c.dest == id {
                self.connections.remove(i);
                if c.source == id {
                    if let Some(entry) = self.units.get_mut(c.dest.key) {
                        entry.inputs_connected -= 1;
                    }
                } else if let Some(entry) = self.units.get_mut(c.source.key) {
                    entry.outputs_connected -= 1;
                }
            } else {
                i += 1;
            }
        }

        self.sinks.retain(|&s| s != id);

        self.modification_count += 1;
        Ok(())
    }

    /// Remove every unit from the graph.
    pub fn reset(&mut self) {
        let ids: Vec<UnitId> = self.units.iter().map(|(_, e)| e.id).collect();
        for id in ids {
            let _ = self.remove_unit(id);
        }
    }

    /// Recompile the schedule and bus assignments.
    ///
    /// A no-op when nothing has changed since the last successful call. On
    /// error the previous schedule object is left in place (and `run` keeps
    /// emitting silence, since the graph is still newer than the schedule).
    pub fn reschedule(&mut self) -> Result<(), GraphError> {
        if !self.invalid && self.scheduled_at == Some(self.modification_count) {
            return Ok(());
        }

        match scheduler::compile(
            &mut self.units,
            &self.connections,
            &self.sinks,
            &mut self.scratch,
            self.bus_capacity,
        ) {
            Ok(schedule) => {
                self.schedule = schedule;
                self.scheduled_at = Some(self.modification_count);
                self.invalid = false;
                self.warned_stale = false;
                Ok(())
            }
            Err(GraphError::InvalidGraph) => {
                self.invalid = true;
                Err(GraphError::InvalidGraph)
            }
            Err(e) => Err(e),
        }
    }

    /// Fill the host's planar output channels with one callback's worth of
    /// audio starting at sample time `time`.
    ///
    /// The host buffer may be longer than `max_block_frames`; the runner
    /// loops over sub-blocks internally, advancing `time` as it goes. `run`
    /// never fails: a stale or invalid graph produces silence.
    ///
    /// `host_inputs` is accepted for interface completeness; no unit in the
    /// library captures host input.
    pub fn run(&mut self, time: u64, host_inputs: &[&[f32]], host_outputs: &mut [&mut [f32]]) {
        let _ = host_inputs;

        for out in host_outputs.iter_mut() {
            out.fill(0.0);
        }

        let frames = host_outputs
            .iter()
            .map(|ch| ch.len())
            .min()
            .unwrap_or(0);
        if frames == 0 {
            return;
        }

        if self.invalid || self.needs_reschedule() {
            if !self.warned_stale {
                log::warn!("run on a graph with no up-to-date schedule; emitting silence");
                self.warned_stale = true;
            }
            return;
        }

        let mut frames_processed = 0;
        while frames_processed < frames {
            let block_frames = (frames - frames_processed).min(self.max_block_frames);

            self.buses.clear();
            self.schedule.process(
                &mut self.units,
                &self.buses,
                time + frames_processed as u64,
                frames_processed..frames_processed + block_frames,
                host_outputs,
            );

            frames_processed += block_frames;
        }
    }

    /// Like [`Graph::run`], for hosts whose buffers are interleaved.
    ///
    /// Each sub-block is de-interleaved into pre-allocated planar staging,
    /// executed, and interleaved back into `output`, so the call stays
    /// allocation-free. Channel counts above
    /// [`MAX_CHANNELS`](hexdsp_core::MAX_CHANNELS) are truncated.
    pub fn run_interleaved(
        &mut self,
        time: u64,
        input: &[f32],
        output: &mut [f32],
        num_in_channels: usize,
        num_out_channels: usize,
    ) {
        if num_out_channels == 0 {
            return;
        }
        let frames = output.len() / num_out_channels;
        assert_eq!(input.len(), frames * num_in_channels);
        assert_eq!(output.len(), frames * num_out_channels);

        // Swap the staging buffers out so the planar borrows do not pin
        // `self` across the inner `run` call. `take` swaps in an empty Vec
        // without touching the allocator.
        let mut staging_in = std::mem::take(&mut self.staging_in);
        let mut staging_out = std::mem::take(&mut self.staging_out);

        let mut frames_processed = 0;
        while frames_processed < frames {
            let block_frames = (frames - frames_processed).min(self.max_block_frames);

            util::deinterleave(
                staging_in.iter_mut().map(|ch| &mut ch[..block_frames]),
                &input[frames_processed * num_in_channels
                    ..(frames_processed + block_frames) * num_in_channels],
                num_in_channels,
            );

            let mut planar_in: ArrayVec<&[f32], MAX_CHANNELS> = ArrayVec::new();
            for ch in staging_in.iter().take(num_in_channels.min(MAX_CHANNELS)) {
                planar_in.push(&ch[..block_frames]);
            }
            let mut planar_out: ArrayVec<&mut [f32], MAX_CHANNELS> = ArrayVec::new();
            for ch in staging_out
                .iter_mut()
                .take(num_out_channels.min(MAX_CHANNELS))
            {
                planar_out.push(&mut ch[..block_frames]);
            }

            self.run(time + frames_processed as u64, &planar_in, &mut planar_out);
            drop(planar_in);
            drop(planar_out);

            let out_block = &mut output[frames_processed * num_out_channels
                ..(frames_processed + block_frames) * num_out_channels];
            if num_out_channels == 2 {
                // Stereo is the common case; skip the strided generic loop.
                util::interleave_stereo(
                    &staging_out[0][..block_frames],
                    &staging_out[1][..block_frames],
                    out_block,
                );
            } else {
                util::interleave(
                    staging_out.iter().map(|ch| &ch[..block_frames]),
                    out_block,
                    num_out_channels,
                );
            }

            frames_processed += block_frames;
        }

        self.staging_in = staging_in;
        self.staging_out = staging_out;
    }
}

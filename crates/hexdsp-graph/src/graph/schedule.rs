use std::cell::UnsafeCell;
use std::fmt::Debug;
use std::ops::Range;

use arrayvec::ArrayVec;
use smallvec::SmallVec;

use hexdsp_core::{Pool, MAX_CHANNELS};

use super::{UnitEntry, UnitId};

/// The most distinct destination buses one unit may feed in a single block.
pub(crate) const MAX_UNIT_OUTPUTS: usize = 64;

/// A unit that has been assigned buses and a place in the run order.
#[derive(Clone)]
pub(crate) struct ScheduledUnit {
    pub id: UnitId,
    pub is_sink: bool,
    /// The input bus per channel, already mixed from every producer feeding
    /// that channel.
    pub in_buses: ArrayVec<u32, MAX_CHANNELS>,
    /// Destination buses, one per outgoing connection, deduplicated.
    pub out_buses: SmallVec<[u32; 4]>,
}

/// The output of the scheduler: an ordered run list over shared buses.
///
/// Producers precede their consumers and sink units come last, so executing
/// the entries front to back leaves every bus fully mixed by the time its
/// consumer reads it.
pub struct Schedule {
    pub(crate) entries: Vec<ScheduledUnit>,
    pub(crate) num_buses: usize,
}

impl Schedule {
    pub(crate) fn empty() -> Self {
        Self {
            entries: Vec::new(),
            num_buses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of buses the schedule uses.
    pub fn num_buses(&self) -> usize {
        self.num_buses
    }

    /// Scheduled units in run order.
    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Every `(unit, bus)` input assignment in the schedule.
    pub fn input_bus_ids(&self) -> impl Iterator<Item = (UnitId, u32)> + '_ {
        self.entries
            .iter()
            .flat_map(|e| e.in_buses.iter().map(move |&b| (e.id, b)))
    }

    /// Execute one block of at most `max_block_frames` frames.
    ///
    /// `range` is the sub-block's position inside the host buffer; sink
    /// units write into `host_outputs[..][range]` while every other unit
    /// writes into its destination buses.
    pub(crate) fn process(
        &self,
        units: &mut Pool<UnitEntry>,
        buses: &BusPool,
        time: u64,
        range: Range<usize>,
        host_outputs: &mut [&mut [f32]],
    ) {
        let frames = range.len();

        let mut inputs: ArrayVec<&[f32], MAX_CHANNELS> = ArrayVec::new();
        let mut outputs: ArrayVec<&mut [f32], MAX_UNIT_OUTPUTS> = ArrayVec::new();

        for scheduled in self.entries.iter() {
            let Some(entry) = units.get_mut(scheduled.id.key) else {
                // A mutation would have bumped the modification counter and
                // routed `run` to the silence path, so a missing entry here
                // cannot happen; skip rather than touch a freed slot.
                continue;
            };

            inputs.clear();
            outputs.clear();
            for &bus in scheduled.in_buses.iter() {
                // SAFETY: see `BusPool::bus_mut`. Bus ids within a single
                // scheduled unit are pairwise distinct, and the gathered
                // slices are dropped (cleared) before the next entry borrows
                // the pool again.
                inputs.push(unsafe { buses.bus_mut(bus as usize, frames) });
            }

            if scheduled.is_sink {
                let mut host: ArrayVec<&mut [f32], MAX_CHANNELS> = ArrayVec::new();
                for ch in host_outputs.iter_mut().take(MAX_CHANNELS) {
                    host.push(&mut ch[range.clone()]);
                }
                entry.unit.run(time, &inputs, &mut host);
            } else {
                for &bus in scheduled.out_buses.iter() {
                    // SAFETY: as above; `out_buses` is deduplicated and
                    // disjoint from `in_buses` by construction.
                    outputs.push(unsafe { buses.bus_mut(bus as usize, frames) });
                }
                entry.unit.run(time, &inputs, &mut outputs);
            }
        }
    }
}

impl Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Schedule {{")?;

        for entry in self.entries.iter() {
            write!(f, "    {{ {:?}", entry.id)?;

            if !entry.in_buses.is_empty() {
                write!(f, " | in: [")?;
                write!(f, "{}", entry.in_buses[0])?;
                for b in entry.in_buses.iter().skip(1) {
                    write!(f, ", {}", b)?;
                }
                write!(f, "]")?;
            }

            if !entry.out_buses.is_empty() {
                write!(f, " | out: [")?;
                write!(f, "{}", entry.out_buses[0])?;
                for b in entry.out_buses.iter().skip(1) {
                    write!(f, ", {}", b)?;
                }
                write!(f, "]")?;
            }

            if entry.is_sink {
                write!(f, " | sink")?;
            }

            writeln!(f, " }}")?;
        }

        writeln!(f, "    num_buses: {}", self.num_buses)?;

        write!(f, "}}")
    }
}

/// The shared buffer pool samples travel through between units.
///
/// Buses are fixed `max_block_frames`-long segments of one contiguous
/// allocation, zeroed wholesale at the top of every block.
pub(crate) struct BusPool {
    data: Box<[UnsafeCell<f32>]>,
    max_block_frames: usize,
}

impl BusPool {
    pub fn new(max_block_frames: usize, bus_capacity: usize) -> Self {
        let data = (0..max_block_frames * bus_capacity)
            .map(|_| UnsafeCell::new(0.0f32))
            .collect();

        Self {
            data,
            max_block_frames,
        }
    }

    /// Zero the whole pool in one pass. Exclusive access makes the cells
    /// plain floats, so this compiles down to a memset.
    pub fn clear(&mut self) {
        for cell in self.data.iter_mut() {
            *cell.get_mut() = 0.0;
        }
    }

    /// Borrow bus `index` as a mutable slice of `frames` samples.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that no two live slices returned from this
    /// method refer to the same bus. The scheduler upholds this for the
    /// runner: every (unit, channel) input pair gets a freshly minted bus id
    /// and each unit's output list is deduplicated, so a single `run` call
    /// never sees one bus through two slices. `index` is always in range
    /// because the scheduler refuses to mint more buses than the pool holds.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn bus_mut(&self, index: usize, frames: usize) -> &mut [f32] {
        debug_assert!(frames <= self.max_block_frames);
        let start = index * self.max_block_frames;
        debug_assert!(start + frames <= self.data.len());

        std::slice::from_raw_parts_mut(self.data[start].get(), frames)
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{Graph, GraphConfig, UnitId};
    use crate::units::{GainUnit, OutputUnit, PhasorUnit};

    fn compile(graph: &mut Graph) -> Vec<(UnitId, Vec<u32>, Vec<u32>)> {
        graph.reschedule().unwrap();
        graph
            .schedule()
            .entries
            .iter()
            .map(|e| {
                (
                    e.id,
                    e.in_buses.iter().copied().collect(),
                    e.out_buses.iter().copied().collect(),
                )
            })
            .collect()
    }

    /// Every connection whose endpoints are both scheduled must resolve to
    /// one shared bus: the destination's input bus for that channel appears
    /// in the source's output list.
    fn verify_edges(graph: &Graph, entries: &[(UnitId, Vec<u32>, Vec<u32>)]) {
        for conn in graph.connections() {
            let Some(dest) = entries.iter().find(|(id, _, _)| *id == conn.dest) else {
                continue;
            };
            let Some(source) = entries.iter().find(|(id, _, _)| *id == conn.source) else {
                continue;
            };

            let bus = dest.1[conn.channel.index()];
            assert!(
                source.2.contains(&bus),
                "edge {:?} -> {:?} ch {} does not share bus {}",
                conn.source,
                conn.dest,
                conn.channel.index(),
                bus
            );
        }
    }

    /// Within one scheduled unit, no bus may appear both as an input and an
    /// output, and no bus may appear twice in either list.
    fn verify_no_aliasing(entries: &[(UnitId, Vec<u32>, Vec<u32>)]) {
        for (id, in_buses, out_buses) in entries {
            let mut seen = Vec::new();
            for bus in in_buses.iter().chain(out_buses.iter()) {
                assert!(!seen.contains(&bus), "{id:?} sees bus {bus} twice");
                seen.push(bus);
            }
        }
    }

    //  ┌────────┐   ┌──────┐   ┌────────┐
    //  │ phasor ┼───► gain ┼───► output │
    //  └────────┘   └──────┘   └────────┘
    #[test]
    fn chain_compiles_to_a_shared_bus_per_edge() {
        let mut graph = Graph::new(GraphConfig::default());

        let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
        let gain = graph.add_unit(GainUnit::new(0.5)).unwrap();
        let output = graph.add_unit(OutputUnit).unwrap();
        graph.connect(phasor, gain, 0).unwrap();
        graph.connect(gain, output, 0).unwrap();

        let entries = compile(&mut graph);
        verify_edges(&graph, &entries);
        verify_no_aliasing(&entries);

        assert_eq!(graph.schedule().num_buses(), 2);
    }

    //  ┌────────┐   ┌────────┐   ┌────────┐
    //  │ phasor ┼─┬─► gain_a ┼───►        │
    //  └────────┘ │ └────────┘   │ output │
    //             │ ┌────────┐   │        │
    //             └─► gain_b ┼───►        │
    //               └────────┘   └────────┘
    #[test]
    fn diamond_compiles_with_distinct_buses() {
        let mut graph = Graph::new(GraphConfig::default());

        let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
        let gain_a = graph.add_unit(GainUnit::new(0.5)).unwrap();
        let gain_b = graph.add_unit(GainUnit::new(0.25)).unwrap();
        let output = graph.add_unit(OutputUnit).unwrap();
        graph.connect(phasor, gain_a, 0).unwrap();
        graph.connect(phasor, gain_b, 0).unwrap();
        graph.connect(gain_a, output, 0).unwrap();
        graph.connect(gain_b, output, 1).unwrap();

        let entries = compile(&mut graph);
        verify_edges(&graph, &entries);
        verify_no_aliasing(&entries);

        // Two gain inputs plus two sink channels.
        assert_eq!(graph.schedule().num_buses(), 4);

        // The phasor fans out into both gain input buses.
        let phasor_entry = entries.iter().find(|(id, _, _)| *id == phasor).unwrap();
        assert_eq!(phasor_entry.2.len(), 2);
    }

    // Two producers on one sink channel collapse onto a single mix bus.
    #[test]
    fn fan_in_compiles_to_one_bus() {
        let mut graph = Graph::new(GraphConfig::default());

        let a = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
        let b = graph.add_unit(PhasorUnit::new(2.0)).unwrap();
        let output = graph.add_unit(OutputUnit).unwrap();
        graph.connect(a, output, 0).unwrap();
        graph.connect(b, output, 0).unwrap();

        let entries = compile(&mut graph);
        verify_edges(&graph, &entries);
        verify_no_aliasing(&entries);

        assert_eq!(graph.schedule().num_buses(), 1);
    }

    // An input channel gap still yields positional buses: connecting only
    // channel 1 mints a (zeroed) bus for channel 0 as well.
    #[test]
    fn channel_gaps_stay_positional() {
        let mut graph = Graph::new(GraphConfig::default());

        let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
        let output = graph.add_unit(OutputUnit).unwrap();
        graph.connect(phasor, output, 1).unwrap();

        let entries = compile(&mut graph);
        verify_edges(&graph, &entries);

        let sink_entry = entries.iter().find(|(id, _, _)| *id == output).unwrap();
        assert_eq!(sink_entry.1.len(), 2);
        assert_eq!(graph.schedule().num_buses(), 2);
    }

    // Edges into units that cannot reach a sink are dropped from the output
    // lists instead of feeding unminted buses.
    #[test]
    fn edges_to_unreachable_units_are_ignored() {
        let mut graph = Graph::new(GraphConfig::default());

        let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
        let dead_end = graph.add_unit(GainUnit::new(1.0)).unwrap();
        let output = graph.add_unit(OutputUnit).unwrap();
        graph.connect(phasor, output, 0).unwrap();
        graph.connect(phasor, dead_end, 0).unwrap();

        let entries = compile(&mut graph);
        verify_no_aliasing(&entries);

        let phasor_entry = entries.iter().find(|(id, _, _)| *id == phasor).unwrap();
        assert_eq!(phasor_entry.2.len(), 1);
    }
}

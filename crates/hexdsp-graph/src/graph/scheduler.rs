use std::collections::VecDeque;

use ahash::AHashSet;
use arrayvec::ArrayVec;
use smallvec::SmallVec;

use hexdsp_core::{Pool, MAX_CHANNELS};

use super::schedule::{Schedule, ScheduledUnit, MAX_UNIT_OUTPUTS};
use super::{Connection, UnitEntry, UnitId};
use crate::error::GraphError;

/// Reusable scheduling storage, pre-reserved at graph construction and
/// reused on every reschedule so recompiling does not thrash the allocator.
pub(crate) struct Scratch {
    queue: VecDeque<UnitId>,
    ordered: Vec<UnitId>,
    in_order: AHashSet<UnitId>,
    seen_pairs: AHashSet<(UnitId, u16)>,
}

impl Scratch {
    pub fn with_capacity(unit_capacity: usize, connection_capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(unit_capacity),
            ordered: Vec::with_capacity(unit_capacity),
            in_order: AHashSet::with_capacity(unit_capacity),
            seen_pairs: AHashSet::with_capacity(connection_capacity),
        }
    }
}

/// Compile the graph into a run order with bus assignments.
///
/// A reverse breadth-first traversal rooted at the sinks: every sink is
/// enqueued first, then each visited unit enqueues its producers. The first
/// visit of a unit appends it to the order and mints one bus id per input
/// channel (up to the highest connected channel, so `inputs` stays
/// positional around unconnected gaps). Reversing the order puts producers
/// before consumers, with the sinks last.
///
/// Work is bounded by the seen-sets: a cycle terminates the traversal
/// without a second visit, although executing a cyclic graph remains
/// undefined. Units that cannot reach a sink are never visited and do not
/// appear in the schedule.
pub(crate) fn compile(
    units: &mut Pool<UnitEntry>,
    connections: &[Connection],
    sinks: &[UnitId],
    scratch: &mut Scratch,
    bus_capacity: usize,
) -> Result<Schedule, GraphError> {
    scratch.queue.clear();
    scratch.ordered.clear();
    scratch.in_order.clear();
    scratch.seen_pairs.clear();

    for &sink in sinks {
        if !units.contains(sink.key) {
            // A sink survived its unit's removal; the bookkeeping is broken
            // beyond what a recompile can repair.
            return Err(GraphError::InvalidGraph);
        }
        if scratch.queue.contains(&sink) {
            log::warn!("duplicate sink {:?} in the output list", sink);
            continue;
        }
        scratch.queue.push_back(sink);
    }

    let mut next_bus: u32 = 0;

    while let Some(id) = scratch.queue.pop_front() {
        if !scratch.in_order.insert(id) {
            continue;
        }
        scratch.ordered.push(id);

        let Some(entry) = units.get_mut(id.key) else {
            return Err(GraphError::InvalidGraph);
        };

        let in_channels = highest_connected_channel(connections, id);
        for ch in 0..in_channels {
            if scratch.seen_pairs.insert((id, ch as u16)) {
                entry.bus_ids[ch] = next_bus;
                next_bus += 1;
            }
        }

        for conn in connections.iter().filter(|c| c.dest == id) {
            scratch.queue.push_back(conn.source);
        }
    }

    if next_bus as usize > bus_capacity {
        return Err(GraphError::OutOfCapacity);
    }

    // Producers before consumers, sinks last.
    scratch.ordered.reverse();

    let mut entries = Vec::with_capacity(scratch.ordered.len());
    for &id in scratch.ordered.iter() {
        let Some(entry) = units.get(id.key) else {
            return Err(GraphError::InvalidGraph);
        };

        let mut in_buses: ArrayVec<u32, MAX_CHANNELS> = ArrayVec::new();
        for ch in 0..highest_connected_channel(connections, id) {
            in_buses.push(entry.bus_ids[ch]);
        }

        let mut out_buses: SmallVec<[u32; 4]> = SmallVec::new();
        if !entry.info.is_sink {
            for conn in connections.iter().filter(|c| c.source == id) {
                // A destination outside the schedule never reaches a sink;
                // there is no bus to feed.
                if !scratch.seen_pairs.contains(&(conn.dest, conn.channel.0)) {
                    continue;
                }
                let Some(dest) = units.get(conn.dest.key) else {
                    continue;
                };

                let bus = dest.bus_ids[conn.channel.index()];
                if !out_buses.contains(&bus) {
                    out_buses.push(bus);
                }
            }
            if out_buses.len() > MAX_UNIT_OUTPUTS {
                return Err(GraphError::OutOfCapacity);
            }
        }

        entries.push(ScheduledUnit {
            id,
            is_sink: entry.info.is_sink,
            in_buses,
            out_buses,
        });
    }

    let schedule = Schedule {
        entries,
        num_buses: next_bus as usize,
    };

    log::debug!("compiled new schedule: {:?}", &schedule);

    Ok(schedule)
}

/// One past the highest input channel with a connection into `id`, i.e. the
/// number of positional input buses the unit sees.
fn highest_connected_channel(connections: &[Connection], id: UnitId) -> usize {
    let mut in_channels = 0;
    for conn in connections.iter().filter(|c| c.dest == id) {
        in_channels = in_channels.max(conn.channel.index() + 1);
    }
    in_channels
}

use thiserror::Error;

use crate::graph::{ChannelIdx, UnitId};

/// An error occurred while constructing or mutating the graph.
///
/// `run` never returns an error: a graph that cannot be executed emits
/// silence instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A fixed-capacity resource is exhausted: the unit pool on the
    /// real-time insertion path, the sink list, or the bus pool during
    /// rescheduling.
    #[error("graph capacity exceeded")]
    OutOfCapacity,

    /// Connecting a unit to itself is rejected at connect time. Larger
    /// cycles are not detected; executing a graph that contains one is
    /// undefined.
    #[error("connecting {0:?} to itself would form a feedback loop")]
    FeedbackLoop(UnitId),

    /// The engine latched an unrecoverable inconsistency while scheduling.
    /// `run` emits silence until a later `reschedule` succeeds.
    #[error("the graph is in an invalid state")]
    InvalidGraph,

    /// The referenced unit is not (or is no longer) in the graph.
    #[error("unit {0:?} does not exist in the graph")]
    UnitNotFound(UnitId),

    /// The channel index is outside the destination unit's input range.
    #[error("channel {0:?} is out of range")]
    ChannelOutOfRange(ChannelIdx),
}

//! The audio graph engine: units wired by connections, compiled into a run
//! order by a reverse breadth-first traversal from the sinks, and executed
//! block by block over a shared, pre-allocated bus pool.

mod error;
pub mod graph;
pub mod units;

pub use error::GraphError;
pub use graph::{ChannelIdx, Connection, Graph, GraphConfig, Schedule, UnitId};

//! Shared building blocks for the hexdsp crates: the unit contract, the
//! generational unit pool, the bandlimited-step correction table, and small
//! conversion utilities.

mod hexblep;
mod pool;
mod unit;
pub mod util;

pub use hexblep::{HexBlep, MAX_BLEP_WIDTH};
pub use pool::{Pool, PoolKey};
pub use unit::{Unit, UnitInfo};

/// The maximum number of input channels on a single unit, and therefore the
/// highest channel index a connection may use.
pub const MAX_CHANNELS: usize = 16;

/// The default maximum number of frames that can appear in a processing
/// block.
///
/// This number is a balance between processing overhead and cache
/// efficiency: every bus in the pool is this many samples long, so larger
/// blocks trade memory and cache pressure for fewer passes over the
/// schedule.
pub const DEFAULT_MAX_BLOCK_FRAMES: usize = 128;

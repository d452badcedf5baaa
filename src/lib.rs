pub use hexdsp_core::*;
pub use hexdsp_graph::*;
pub use hexdsp_player::WavPlayerUnit;

pub use hexdsp_wav as wav;

mod apdhsr;
mod gain;
mod hexwave;
mod noise;
mod output;
mod phasor;
mod polyblep;
mod ramp;
mod square;
mod triangle;

pub use apdhsr::{ApdhsrParams, ApdhsrUnit};
pub use gain::GainUnit;
pub use hexwave::{HexwaveParams, HexwaveUnit};
pub use noise::NoiseUnit;
pub use output::OutputUnit;
pub use phasor::PhasorUnit;
pub use ramp::RampUnit;
pub use square::SquareUnit;
pub use triangle::TriangleUnit;

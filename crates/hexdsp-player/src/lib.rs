//! Plays a decoded WAV stream into the graph.
//!
//! Decoding happens entirely at construction time on the host thread; the
//! audio path only reads from the planar sample storage, so `run` stays
//! allocation-free.

use std::io::Read;

use hexdsp_core::{Unit, UnitInfo};
use hexdsp_wav::{WavError, WavFile};

/// A sample-playback unit. Emits the decoded stream from the beginning,
/// then latches `is_finished` and goes silent.
///
/// When the unit feeds more destinations than the file has channels, the
/// last channel is replicated across the extra outputs.
pub struct WavPlayerUnit {
    channels: Vec<Vec<f32>>,
    playhead: usize,
    finished: bool,
}

impl WavPlayerUnit {
    /// Decode a WAV file from a byte slice.
    pub fn from_memory(bytes: &[u8]) -> Result<Self, WavError> {
        Ok(Self::from_wav(&WavFile::from_memory(bytes)?))
    }

    /// Decode a WAV file from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, WavError> {
        Ok(Self::from_wav(&WavFile::from_reader(reader)?))
    }

    /// Build a player from an already decoded file.
    pub fn from_wav(wav: &WavFile) -> Self {
        let channels = (0..wav.num_channels() as usize)
            .map(|ch| wav.channel_to_f32(ch))
            .collect();

        Self {
            channels,
            playhead: 0,
            finished: false,
        }
    }

    /// `true` once the stream is exhausted; later blocks emit silence.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Rewind to the beginning and clear the finished latch.
    pub fn restart(&mut self) {
        self.playhead = 0;
        self.finished = false;
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }
}

impl Unit for WavPlayerUnit {
    fn debug_name(&self) -> &'static str {
        "wav_player"
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            num_max_inputs: 0,
            num_max_outputs: 16,
            is_sink: false,
        }
    }

    fn run(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let Some(frames) = outputs.first().map(|o| o.len()) else {
            return;
        };
        if self.finished {
            return;
        }

        let total = self.num_frames();
        if total == 0 {
            self.finished = true;
            return;
        }

        for i in 0..frames {
            if self.playhead >= total {
                break;
            }
            for (j, out) in outputs.iter_mut().enumerate() {
                let ch = j.min(self.channels.len() - 1);
                out[i] += self.channels[ch][self.playhead];
            }
            self.playhead += 1;
        }

        if self.playhead >= total {
            self.finished = true;
        }
    }
}

impl From<WavPlayerUnit> for Box<dyn Unit> {
    fn from(unit: WavPlayerUnit) -> Self {
        Box::new(unit)
    }
}

//! A strict decoder for the WAV subset the engine plays back: uncompressed
//! PCM, 8-bit unsigned or 16-bit signed, mono or stereo, little-endian
//! throughout.
//!
//! The layout is `RIFF` header, a 16-byte `fmt ` subchunk, then the `data`
//! subchunk. Anything else is rejected with a specific [`WavError`] rather
//! than decoded on a best-effort basis.

mod error;

pub use error::WavError;

use std::io::Read;

/// Sample storage format of the decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Unsigned 8-bit PCM.
    Pcm8,
    /// Signed 16-bit PCM.
    Pcm16,
}

enum WavData {
    Pcm8(Vec<u8>),
    Pcm16(Vec<i16>),
}

/// A fully decoded WAV file: the format fields exactly as read from the
/// `fmt ` subchunk, plus the interleaved sample data.
pub struct WavFile {
    format: SampleFormat,
    num_channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
    data: WavData,
}

/// Convert a signed 16-bit PCM sample to float.
#[inline]
pub fn pcm_i16_to_f32(x: i16) -> f32 {
    x as f32 / 32767.0
}

/// Convert an unsigned 8-bit PCM sample to float.
#[inline]
pub fn pcm_u8_to_f32(x: u8) -> f32 {
    (x as f32 / 255.0) * 2.0 - 1.0
}

impl WavFile {
    /// Decode a WAV file from a byte slice.
    pub fn from_memory(bytes: &[u8]) -> Result<Self, WavError> {
        Self::from_reader(bytes)
    }

    /// Decode a WAV file from a reader. The reader is consumed up to the end
    /// of the data subchunk.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, WavError> {
        let mut header = [0u8; 12];
        read_exact(&mut reader, &mut header)?;
        if &header[0..4] != b"RIFF" {
            return Err(WavError::NotARiffFile);
        }
        if &header[8..12] != b"WAVE" {
            return Err(WavError::NotAWavFile);
        }

        let mut fmt_header = [0u8; 8];
        read_exact(&mut reader, &mut fmt_header)?;
        if &fmt_header[0..4] != b"fmt " {
            return Err(WavError::NotAWavFile);
        }
        let fmt_len = le_u32(&fmt_header[4..8]);
        if fmt_len != 16 {
            return Err(WavError::UnsupportedFormatLength(fmt_len));
        }

        let mut fmt = [0u8; 16];
        read_exact(&mut reader, &mut fmt)?;
        let audio_format = le_u16(&fmt[0..2]);
        let num_channels = le_u16(&fmt[2..4]);
        let sample_rate = le_u32(&fmt[4..8]);
        let byte_rate = le_u32(&fmt[8..12]);
        let block_align = le_u16(&fmt[12..14]);
        let bits_per_sample = le_u16(&fmt[14..16]);

        if audio_format != 1 {
            return Err(WavError::CompressedWavFile(audio_format));
        }

        let format = match bits_per_sample {
            8 => SampleFormat::Pcm8,
            16 => SampleFormat::Pcm16,
            _ => {
                return Err(WavError::Unsupported {
                    bits_per_sample,
                    num_channels,
                })
            }
        };
        if num_channels != 1 && num_channels != 2 {
            return Err(WavError::Unsupported {
                bits_per_sample,
                num_channels,
            });
        }

        let expected_align = num_channels * (bits_per_sample / 8);
        if block_align != expected_align {
            return Err(WavError::MismatchedBlockAlign {
                expected: expected_align,
                found: block_align,
            });
        }
        let expected_rate = sample_rate * expected_align as u32;
        if byte_rate != expected_rate {
            return Err(WavError::MismatchedByteRate {
                expected: expected_rate,
                found: byte_rate,
            });
        }

        let mut data_header = [0u8; 8];
        read_exact(&mut reader, &mut data_header)?;
        if &data_header[0..4] != b"data" {
            return Err(WavError::InvalidDataHeader);
        }
        let data_len = le_u32(&data_header[4..8]) as usize;

        let mut raw = vec![0u8; data_len];
        read_exact(&mut reader, &mut raw)?;

        let data = match format {
            SampleFormat::Pcm8 => WavData::Pcm8(raw),
            SampleFormat::Pcm16 => WavData::Pcm16(
                raw.chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect(),
            ),
        };

        Ok(Self {
            format,
            num_channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
            data,
        })
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn byte_rate(&self) -> u32 {
        self.byte_rate
    }

    pub fn block_align(&self) -> u16 {
        self.block_align
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// The number of frames per channel: the data length divided by the
    /// block alignment.
    pub fn num_frames(&self) -> usize {
        let total = match &self.data {
            WavData::Pcm8(d) => d.len(),
            WavData::Pcm16(d) => d.len() * 2,
        };
        total / self.block_align as usize
    }

    /// The sample at `(channel, frame)` converted to float in `[-1, 1]`.
    ///
    /// Panics when `channel` or `frame` is out of range.
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        assert!(channel < self.num_channels as usize);
        let index = frame * self.num_channels as usize + channel;
        match &self.data {
            WavData::Pcm8(d) => pcm_u8_to_f32(d[index]),
            WavData::Pcm16(d) => pcm_i16_to_f32(d[index]),
        }
    }

    /// Decode one channel into a freshly allocated float buffer.
    pub fn channel_to_f32(&self, channel: usize) -> Vec<f32> {
        (0..self.num_frames())
            .map(|frame| self.sample(channel, frame))
            .collect()
    }

    /// Decode one channel into `dest`, returning the number of frames
    /// written.
    pub fn copy_channel_into(&self, channel: usize, dest: &mut [f32]) -> Result<usize, WavError> {
        let frames = self.num_frames();
        if dest.len() < frames {
            return Err(WavError::InsufficientBuffer {
                needed: frames,
                got: dest.len(),
            });
        }

        for (frame, out) in dest.iter_mut().take(frames).enumerate() {
            *out = self.sample(channel, frame);
        }
        Ok(frames)
    }
}

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), WavError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WavError::UnexpectedEOF
        } else {
            WavError::Io(e)
        }
    })
}

use thiserror::Error;

/// An error occurred while decoding a WAV container.
#[derive(Debug, Error)]
pub enum WavError {
    #[error("stream does not start with a RIFF header")]
    NotARiffFile,

    #[error("RIFF stream is not a WAVE file")]
    NotAWavFile,

    #[error("fmt chunk length {0} is unsupported (expected 16)")]
    UnsupportedFormatLength(u32),

    #[error("compressed WAV data is not supported (audio format {0})")]
    CompressedWavFile(u16),

    #[error("byte rate {found} does not match the declared format (expected {expected})")]
    MismatchedByteRate { expected: u32, found: u32 },

    #[error("block alignment {found} does not match the declared format (expected {expected})")]
    MismatchedBlockAlign { expected: u16, found: u16 },

    #[error("expected a data chunk header")]
    InvalidDataHeader,

    #[error("stream ended before the declared data length")]
    UnexpectedEOF,

    #[error("unsupported sample layout ({bits_per_sample} bits per sample, {num_channels} channels)")]
    Unsupported {
        bits_per_sample: u16,
        num_channels: u16,
    },

    #[error("destination buffer holds {got} frames but the channel has {needed}")]
    InsufficientBuffer { needed: usize, got: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! PCM buffers and the WAV container used between pipeline stages.

pub mod buffer;
pub mod wav;

pub use buffer::AudioBuffer;
pub use wav::{decode_wav, encode_wav, read_wav, write_wav};

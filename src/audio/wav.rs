//! WAV container encode/decode for pipeline artifacts.
//!
//! Every container the pipeline writes or reads is 24kHz 16-bit mono PCM.
//! Reading goes through a real RIFF parser rather than skipping a fixed
//! header, and rejects anything in a different format.

use crate::audio::buffer::{AudioBuffer, describe_format};
use crate::defaults::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use crate::error::{MeditoneError, Result};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

/// The one container format used throughout the pipeline.
pub fn pipeline_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Write `buffer` as a standalone WAV file at `path`, replacing any existing file.
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let writer = hound::WavWriter::create(path, pipeline_spec())?;
    write_samples(writer, buffer)
}

/// Encode `buffer` as WAV bytes in memory.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    let writer = hound::WavWriter::new(&mut cursor, pipeline_spec())?;
    write_samples(writer, buffer)?;
    Ok(cursor.into_inner())
}

fn write_samples<W: Write + Seek>(
    mut writer: hound::WavWriter<W>,
    buffer: &AudioBuffer,
) -> Result<()> {
    for &sample in buffer.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read the sample data of the WAV file at `path`.
///
/// # Errors
/// - `Io` if the file cannot be opened
/// - `Wav` if the container is malformed
/// - `AudioFormatMismatch` if it is not 24kHz 16-bit mono integer PCM
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let file = File::open(path)?;
    decode_wav(BufReader::new(file), &path.display().to_string())
}

/// Decode WAV data from any reader. `source` names the data in errors.
pub fn decode_wav<R: Read>(reader: R, source: &str) -> Result<AudioBuffer> {
    let mut wav_reader = hound::WavReader::new(reader)?;

    let spec = wav_reader.spec();
    if spec.sample_rate != SAMPLE_RATE
        || spec.channels != CHANNELS
        || spec.bits_per_sample != BITS_PER_SAMPLE
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(MeditoneError::AudioFormatMismatch {
            path: source.to_string(),
            expected: AudioBuffer::format_description(),
            actual: describe_format(spec.sample_rate, spec.bits_per_sample, spec.channels),
        });
    }

    let samples = wav_reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(AudioBuffer::from_samples(samples))
}

//! Timeline reconstruction: segment audio plus computed silence.
//!
//! Each segment should start at its target offset. Silence fills the gap
//! between what has been emitted so far and the next target; when earlier
//! speech already ran past the target, the segment starts immediately
//! instead. Transitions are hard cuts.

use crate::audio::{AudioBuffer, read_wav};
use crate::defaults::{MAX_TIMELINE_SAMPLES, SAMPLE_RATE};
use crate::error::{MeditoneError, Result};
use crate::script::Segment;
use std::path::PathBuf;
use tracing::debug;

/// Where one segment ended up in the assembled recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub target_offset_seconds: u32,
    /// Actual speech start.
    pub start_secs: f64,
    /// Silence inserted immediately before this segment.
    pub silence_secs: f64,
    pub speech_secs: f64,
}

impl Placement {
    /// How far behind its target the segment started (0 when on time).
    pub fn lateness_secs(&self) -> f64 {
        (self.start_secs - self.target_offset_seconds as f64).max(0.0)
    }
}

/// The assembled recording and the per-segment layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub buffer: AudioBuffer,
    pub placements: Vec<Placement>,
}

impl Assembly {
    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }
}

/// Running output with an `elapsed` cursor counted in samples.
struct Timeline {
    output: AudioBuffer,
    elapsed: u64,
    placements: Vec<Placement>,
}

impl Timeline {
    fn with_capacity(samples: usize) -> Self {
        Self {
            output: AudioBuffer::with_capacity(samples),
            elapsed: 0,
            placements: Vec::new(),
        }
    }

    fn place(
        &mut self,
        index: usize,
        target_offset_seconds: u32,
        speech: AudioBuffer,
    ) -> Result<()> {
        let target = target_offset_seconds as u64 * SAMPLE_RATE as u64;
        let silence = target.saturating_sub(self.elapsed);

        let end = self.elapsed + silence + speech.len() as u64;
        if end > MAX_TIMELINE_SAMPLES {
            return Err(MeditoneError::InvalidInput {
                message: format!(
                    "segment {index} at {target_offset_seconds}s would end at {:.0}s, \
                     past the {}s a WAV file can hold",
                    samples_to_secs(end),
                    MAX_TIMELINE_SAMPLES / SAMPLE_RATE as u64
                ),
            });
        }

        if silence > 0 {
            self.output.append(AudioBuffer::silence_samples(silence));
            self.elapsed = target;
        }

        let start = self.elapsed;
        let speech_secs = speech.duration_secs();
        self.elapsed += speech.len() as u64;
        self.output.append(speech);

        let placement = Placement {
            index,
            target_offset_seconds,
            start_secs: samples_to_secs(start),
            silence_secs: samples_to_secs(silence),
            speech_secs,
        };
        debug!(
            segment = index,
            target = target_offset_seconds,
            start_secs = placement.start_secs,
            silence_secs = placement.silence_secs,
            speech_secs,
            "segment placed"
        );
        self.placements.push(placement);
        Ok(())
    }

    fn finish(self) -> Assembly {
        Assembly {
            buffer: self.output,
            placements: self.placements,
        }
    }
}

fn samples_to_secs(samples: u64) -> f64 {
    samples as f64 / SAMPLE_RATE as f64
}

/// Reject scripts whose cue times alone already overflow a WAV file.
///
/// Speech lengths are unknown before synthesis, so [`assemble`] checks
/// again with the real audio.
pub fn check_targets(segments: &[Segment]) -> Result<()> {
    let limit_secs = MAX_TIMELINE_SAMPLES / SAMPLE_RATE as u64;
    match segments
        .iter()
        .enumerate()
        .find(|(_, s)| s.target_offset_seconds() as u64 > limit_secs)
    {
        Some((index, segment)) => Err(MeditoneError::InvalidInput {
            message: format!(
                "segment {index} cue {} is past the {limit_secs}s a WAV file can hold",
                segment.label()
            ),
        }),
        None => Ok(()),
    }
}

/// Assemble the persisted segment files into one continuous buffer.
///
/// `artifact_paths[i]` must hold the audio for `segments[i]`.
pub fn assemble(segments: &[Segment], artifact_paths: &[PathBuf]) -> Result<Assembly> {
    check_lengths(segments.len(), artifact_paths.len())?;

    let mut timeline = Timeline::with_capacity(0);
    for (index, (segment, path)) in segments.iter().zip(artifact_paths).enumerate() {
        let speech = read_wav(path)?;
        timeline.place(index, segment.target_offset_seconds(), speech)?;
    }

    Ok(timeline.finish())
}

/// Assemble already-decoded segment buffers.
pub fn assemble_buffers(segments: &[Segment], buffers: Vec<AudioBuffer>) -> Result<Assembly> {
    check_lengths(segments.len(), buffers.len())?;

    let capacity = buffers.iter().map(AudioBuffer::len).sum();
    let mut timeline = Timeline::with_capacity(capacity);
    for (index, (segment, speech)) in segments.iter().zip(buffers).enumerate() {
        timeline.place(index, segment.target_offset_seconds(), speech)?;
    }

    Ok(timeline.finish())
}

fn check_lengths(segments: usize, audio: usize) -> Result<()> {
    if segments != audio {
        return Err(MeditoneError::InvalidInput {
            message: format!("{segments} segments but {audio} audio artifacts"),
        });
    }
    Ok(())
}

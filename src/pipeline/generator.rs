//! Sequential per-segment synthesis under the request pacing policy.

use crate::audio::write_wav;
use crate::defaults::AUDIO_EXTENSION;
use crate::error::Result;
use crate::pacing::RequestPacer;
use crate::script::Segment;
use crate::tts::SpeechSynthesizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Progress notification emitted after each segment is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProgress {
    /// 0-based index of the finished segment.
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub duration_secs: f64,
    pub path: PathBuf,
}

type ProgressFn = Box<dyn Fn(&SegmentProgress) + Send + Sync>;

/// Drives the synthesizer over every segment, one request at a time.
pub struct SegmentGenerator {
    synthesizer: SpeechSynthesizer,
    pacer: Arc<dyn RequestPacer>,
    on_progress: Option<ProgressFn>,
}

impl SegmentGenerator {
    pub fn new(synthesizer: SpeechSynthesizer, pacer: Arc<dyn RequestPacer>) -> Self {
        Self {
            synthesizer,
            pacer,
            on_progress: None,
        }
    }

    /// Register a callback invoked after each segment file is written.
    pub fn with_progress(
        mut self,
        on_progress: impl Fn(&SegmentProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// Synthesize every segment in order and persist each as its own WAV file
    /// in `work_dir`.
    ///
    /// Returns the file paths in segment order. The first failure is
    /// returned as-is; files already written are left in `work_dir`.
    pub async fn generate_all(
        &self,
        segments: &[Segment],
        voice: &str,
        work_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let total = segments.len();
        let mut paths = Vec::with_capacity(total);

        for (index, segment) in segments.iter().enumerate() {
            self.pacer.wait_turn(index).await;

            let audio = self.synthesizer.synthesize(segment.text(), voice).await?;
            let path = work_dir.join(segment_file_name(index));
            write_wav(&path, &audio)?;

            let progress = SegmentProgress {
                index,
                total,
                label: segment.label().to_string(),
                duration_secs: audio.duration_secs(),
                path: path.clone(),
            };
            info!(
                segment = index + 1,
                total,
                label = segment.label(),
                duration_secs = progress.duration_secs,
                "segment synthesized"
            );
            if let Some(on_progress) = &self.on_progress {
                on_progress(&progress);
            }

            paths.push(path);
        }

        Ok(paths)
    }
}

/// File name for segment `index`: `segment_000.wav`, `segment_001.wav`, ...
pub fn segment_file_name(index: usize) -> String {
    format!("segment_{index:03}.{AUDIO_EXTENSION}")
}

//! End-to-end run: parse → generate → assemble → publish → clean up.

use crate::audio::{AudioBuffer, write_wav};
use crate::defaults::{self, AUDIO_EXTENSION};
use crate::error::{MeditoneError, Result};
use crate::pipeline::assembler::{assemble, check_targets};
use crate::pipeline::generator::SegmentGenerator;
use crate::pipeline::scratch::ScratchDir;
use crate::script::{Segment, parse_script, script_duration_hint};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where runs keep scratch files and publish results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Parent of the per-run scratch directories.
    pub scratch_root: PathBuf,
    /// Directory that receives `<run_id>.wav`.
    pub public_dir: PathBuf,
    /// URL prefix under which `public_dir` is served, e.g. `/meditations`.
    pub public_url_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir().join("meditone"),
            public_dir: PathBuf::from("public").join("meditations"),
            public_url_prefix: defaults::PUBLIC_URL_PREFIX.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Filesystem path of the final recording for `run_id`.
    pub fn artifact_path(&self, run_id: &str) -> PathBuf {
        self.public_dir.join(format!("{run_id}.{AUDIO_EXTENSION}"))
    }

    /// Public URL of the final recording for `run_id`.
    pub fn artifact_url(&self, run_id: &str) -> String {
        format!(
            "{}/{run_id}.{AUDIO_EXTENSION}",
            self.public_url_prefix.trim_end_matches('/')
        )
    }
}

/// Run lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStage {
    Idle,
    Parsed,
    Generating,
    Assembling,
    Done,
    Failed,
}

impl RunStage {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: RunStage) -> bool {
        use RunStage::*;
        matches!(
            (self, next),
            (Idle, Parsed)
                | (Parsed, Generating)
                | (Generating, Assembling)
                | (Assembling, Done)
                | (Parsed | Generating | Assembling, Failed)
        )
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::Parsed => "parsed",
            RunStage::Generating => "generating",
            RunStage::Assembling => "assembling",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Logs stage transitions for one run.
struct StageTracker<'a> {
    run_id: &'a str,
    stage: RunStage,
}

impl<'a> StageTracker<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            stage: RunStage::Idle,
        }
    }

    fn advance(&mut self, next: RunStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        info!(run_id = self.run_id, from = %self.stage, to = %next, "run stage");
        self.stage = next;
    }

    fn fail(&mut self, error: &MeditoneError) {
        warn!(
            run_id = self.run_id,
            stage = %self.stage,
            kind = error.kind_label(),
            error = %error,
            "run failed"
        );
        self.stage = RunStage::Failed;
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Public reference, `/<prefix>/<run_id>.wav`.
    pub artifact_url: String,
    pub artifact_path: PathBuf,
    /// Parsed script, for caller-side display.
    pub segments: Vec<Segment>,
    pub duration_secs: f64,
}

/// The meditation audio pipeline.
pub struct MeditationPipeline {
    config: PipelineConfig,
    generator: SegmentGenerator,
}

impl MeditationPipeline {
    pub fn new(config: PipelineConfig, generator: SegmentGenerator) -> Self {
        Self { config, generator }
    }

    /// Turn `raw_content` into one recording published under `run_id`.
    ///
    /// On failure the scratch directory is removed and no artifact is left
    /// behind; the original error is returned.
    pub async fn run(&self, raw_content: &str, run_id: &str, voice: &str) -> Result<RunOutput> {
        validate_run_id(run_id)?;

        let mut stage = StageTracker::new(run_id);
        let segments = parse_script(raw_content)?;
        check_targets(&segments)?;
        stage.advance(RunStage::Parsed);
        info!(
            run_id,
            segments = segments.len(),
            script_secs = script_duration_hint(&segments),
            voice,
            "script parsed"
        );

        let scratch = match ScratchDir::create(&self.config.scratch_root, run_id) {
            Ok(scratch) => scratch,
            Err(e) => {
                stage.fail(&e);
                return Err(e);
            }
        };

        let produced = self
            .produce(&segments, run_id, voice, &scratch, &mut stage)
            .await;

        match produced {
            Ok((artifact_path, duration_secs)) => {
                scratch.close();
                stage.advance(RunStage::Done);
                let artifact_url = self.config.artifact_url(run_id);
                info!(run_id, url = %artifact_url, duration_secs, "recording published");
                Ok(RunOutput {
                    artifact_url,
                    artifact_path,
                    segments,
                    duration_secs,
                })
            }
            Err(e) => {
                stage.fail(&e);
                scratch.close();
                Err(e)
            }
        }
    }

    async fn produce(
        &self,
        segments: &[Segment],
        run_id: &str,
        voice: &str,
        scratch: &ScratchDir,
        stage: &mut StageTracker<'_>,
    ) -> Result<(PathBuf, f64)> {
        stage.advance(RunStage::Generating);
        let paths = self
            .generator
            .generate_all(segments, voice, scratch.path())
            .await?;

        stage.advance(RunStage::Assembling);
        let assembly = assemble(segments, &paths)?;
        let late = assembly
            .placements
            .iter()
            .filter(|p| p.lateness_secs() > 0.0)
            .count();
        if late > 0 {
            info!(run_id, late, "segments started after their target offset");
        }

        let duration_secs = assembly.duration_secs();
        let artifact_path = self.config.artifact_path(run_id);
        publish(&artifact_path, &assembly.buffer)?;
        Ok((artifact_path, duration_secs))
    }
}

/// Write the final recording; a partially written file is removed.
fn publish(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Err(e) = write_wav(path, buffer) {
        if let Err(cleanup) = fs::remove_file(path)
            && cleanup.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial recording");
        }
        return Err(e);
    }
    Ok(())
}

/// Run ids name files and directories, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_run_id(run_id: &str) -> Result<()> {
    let invalid = |message: &str| MeditoneError::InvalidRunId {
        run_id: run_id.to_string(),
        message: message.to_string(),
    };

    if run_id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if run_id.len() > 128 {
        return Err(invalid("must be at most 128 characters"));
    }
    if !run_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only ASCII letters, digits, '-' and '_' are allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::read_wav;
    use crate::pacing::{NoDelayPacer, RecordingSleeper};
    use crate::tts::{BackendError, ScriptedBackend, SpeechSynthesizer};
    use std::sync::Arc;

    struct Fixture {
        _root: tempfile::TempDir,
        config: PipelineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let config = PipelineConfig {
                scratch_root: root.path().join("scratch"),
                public_dir: root.path().join("public").join("meditations"),
                public_url_prefix: "/meditations".to_string(),
            };
            Self {
                _root: root,
                config,
            }
        }

        fn pipeline(&self, backend: Arc<ScriptedBackend>) -> MeditationPipeline {
            let synthesizer =
                SpeechSynthesizer::new(backend).with_sleeper(Arc::new(RecordingSleeper::new()));
            let generator = SegmentGenerator::new(synthesizer, Arc::new(NoDelayPacer));
            MeditationPipeline::new(self.config.clone(), generator)
        }

        fn scratch_dir(&self, run_id: &str) -> PathBuf {
            self.config.scratch_root.join(run_id)
        }
    }

    fn seconds(secs: u64) -> AudioBuffer {
        AudioBuffer::from_samples(vec![500; (secs * defaults::SAMPLE_RATE as u64) as usize])
    }

    #[test]
    fn stage_transitions_follow_the_run_lifecycle() {
        use RunStage::*;
        assert!(Idle.can_transition_to(Parsed));
        assert!(Parsed.can_transition_to(Generating));
        assert!(Generating.can_transition_to(Assembling));
        assert!(Assembling.can_transition_to(Done));
        for from in [Parsed, Generating, Assembling] {
            assert!(from.can_transition_to(Failed), "{from} -> failed");
        }
        assert!(!Idle.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Generating));
        assert!(!Generating.can_transition_to(Done));
    }

    #[test]
    fn artifact_url_and_path_use_run_id() {
        let config = PipelineConfig {
            scratch_root: PathBuf::from("/tmp/s"),
            public_dir: PathBuf::from("/srv/public/meditations"),
            public_url_prefix: "/meditations/".to_string(),
        };
        assert_eq!(config.artifact_url("abc-1"), "/meditations/abc-1.wav");
        assert_eq!(
            config.artifact_path("abc-1"),
            PathBuf::from("/srv/public/meditations/abc-1.wav")
        );
    }

    #[test]
    fn run_id_validation() {
        assert!(validate_run_id("run_2024-01").is_ok());
        assert!(validate_run_id("").is_err());
        assert!(validate_run_id("../escape").is_err());
        assert!(validate_run_id("a/b").is_err());
        assert!(validate_run_id("with space").is_err());
        assert!(validate_run_id(&"x".repeat(129)).is_err());
    }

    #[tokio::test]
    async fn successful_run_publishes_and_cleans_up() {
        let fixture = Fixture::new();
        let backend = Arc::new(
            ScriptedBackend::new()
                .then_audio(&seconds(3))
                .then_audio(&seconds(3)),
        );

        let output = fixture
            .pipeline(backend)
            .run("[00:00] Welcome.\n[00:10] Breathe in.\n", "run-1", "Kore")
            .await
            .unwrap();

        assert_eq!(output.artifact_url, "/meditations/run-1.wav");
        assert_eq!(output.segments.len(), 2);
        assert!((output.duration_secs - 13.0).abs() < 1e-9);
        assert_eq!(
            read_wav(&output.artifact_path).unwrap().len(),
            13 * defaults::SAMPLE_RATE as usize
        );
        assert!(!fixture.scratch_dir("run-1").exists());
    }

    #[tokio::test]
    async fn parse_failure_creates_nothing() {
        let fixture = Fixture::new();
        let backend = Arc::new(ScriptedBackend::new());

        let result = fixture
            .pipeline(backend.clone())
            .run("no timestamps here", "run-1", "Kore")
            .await;

        assert!(matches!(result, Err(MeditoneError::NoSegments)));
        assert_eq!(backend.calls(), 0);
        assert!(!fixture.scratch_dir("run-1").exists());
        assert!(!fixture.config.artifact_path("run-1").exists());
    }

    #[tokio::test]
    async fn generation_failure_removes_scratch_and_publishes_nothing() {
        let fixture = Fixture::new();
        let backend = Arc::new(
            ScriptedBackend::new()
                .then_audio(&seconds(1))
                .then_error(BackendError::classify(Some(500), "internal")),
        );

        let result = fixture
            .pipeline(backend)
            .run("[00:00] a\n[00:05] b\n", "run-1", "Kore")
            .await;

        assert!(matches!(result, Err(MeditoneError::Tts { .. })));
        assert!(!fixture.scratch_dir("run-1").exists());
        assert!(!fixture.config.artifact_path("run-1").exists());
    }

    #[tokio::test]
    async fn invalid_run_id_is_rejected_before_any_work() {
        let fixture = Fixture::new();
        let backend = Arc::new(ScriptedBackend::new());

        let result = fixture
            .pipeline(backend.clone())
            .run("[00:00] a", "../../etc", "Kore")
            .await;

        assert!(matches!(result, Err(MeditoneError::InvalidRunId { .. })));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn script_longer_than_a_wav_file_fails_before_synthesis() {
        let fixture = Fixture::new();
        let backend = Arc::new(ScriptedBackend::new());

        let result = fixture
            .pipeline(backend.clone())
            .run("[00:00] Welcome.\n[1500:00] Rest.", "long", "Kore")
            .await;

        assert!(matches!(result, Err(MeditoneError::InvalidInput { .. })));
        assert_eq!(backend.calls(), 0);
        assert!(!fixture.scratch_dir("long").exists());
    }

    #[test]
    fn publish_into_file_parent_fails_without_artifact() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("public");
        fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("run.wav");

        let result = publish(&path, &seconds(1));

        assert!(matches!(result, Err(MeditoneError::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn publish_failure_on_existing_directory_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("run.wav");
        fs::create_dir(&path).unwrap();

        let result = publish(&path, &seconds(1));

        assert!(result.is_err());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn concurrent_run_id_collision_is_rejected_without_touching_existing_dir() {
        let fixture = Fixture::new();
        fs::create_dir_all(fixture.scratch_dir("busy")).unwrap();
        let backend = Arc::new(ScriptedBackend::new());

        let result = fixture
            .pipeline(backend.clone())
            .run("[00:00] a", "busy", "Kore")
            .await;

        assert!(matches!(result, Err(MeditoneError::ScratchDirExists { .. })));
        assert!(fixture.scratch_dir("busy").is_dir());
        assert_eq!(backend.calls(), 0);
    }
}

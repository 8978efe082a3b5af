//! Meditation audio pipeline.
//!
//! Stages run strictly in sequence on the caller's task:
//! parse → generate (one paced TTS call per segment) → assemble → publish.

pub mod assembler;
pub mod generator;
pub mod orchestrator;
pub mod scratch;

pub use assembler::{Assembly, Placement, assemble, assemble_buffers, check_targets};
pub use generator::{SegmentGenerator, SegmentProgress, segment_file_name};
pub use orchestrator::{MeditationPipeline, PipelineConfig, RunOutput, RunStage, validate_run_id};
pub use scratch::ScratchDir;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use meditone::cli::{Cli, Commands, ConfigAction};
use meditone::config::{Config, PacingStrategy};
use meditone::pacing::{FixedDelayPacer, RequestPacer, TokenBucketPacer};
use meditone::pipeline::{MeditationPipeline, SegmentGenerator, SegmentProgress};
use meditone::script::{parse_script, script_duration_hint};
use meditone::tts::{GeminiBackend, SpeechSynthesizer};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment variables checked, in order, for the TTS API key.
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "MEDITONE_API_KEY"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Render {
            script,
            run_id,
            voice,
            interval,
        } => {
            let config = load_config(cli.config.as_deref())?;
            handle_render(config, &script, &run_id, voice, interval, cli.quiet).await?;
        }
        Commands::Parse { script, json } => {
            handle_parse(&script, json)?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "meditone",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr. `RUST_LOG` wins over `-v`/`-q`.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "meditone=info,warn",
        (false, _) => "meditone=debug,info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from a file or defaults, then apply environment overrides.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn resolve_api_key() -> Result<String> {
    for var in API_KEY_VARS {
        if let Ok(key) = std::env::var(var)
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
    }
    bail!(
        "no TTS API key found; set {} (or {})",
        API_KEY_VARS[0],
        API_KEY_VARS[1]
    )
}

async fn handle_render(
    config: Config,
    script_path: &Path,
    run_id: &str,
    voice: Option<String>,
    interval: Option<Duration>,
    quiet: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;
    let api_key = resolve_api_key()?;

    let backend = GeminiBackend::new(api_key, &config.tts.endpoint, config.request_timeout())?;
    let synthesizer = SpeechSynthesizer::new(Arc::new(backend))
        .with_policy(config.retry_policy())
        .with_model(config.tts.model.clone())
        .with_instruction(config.tts.instruction.clone());

    let interval = interval.unwrap_or_else(|| config.request_interval());
    let pacer: Arc<dyn RequestPacer> = match config.pacing.strategy {
        PacingStrategy::FixedDelay => Arc::new(FixedDelayPacer::new(interval)),
        PacingStrategy::TokenBucket => Arc::new(TokenBucketPacer::new(interval)),
    };

    let mut generator = SegmentGenerator::new(synthesizer, pacer);
    if !quiet {
        generator = generator.with_progress(print_progress);
    }

    let voice = voice.unwrap_or_else(|| config.tts.voice.clone());
    let pipeline = MeditationPipeline::new(config.pipeline_config(), generator);
    let output = pipeline.run(&raw, run_id, &voice).await?;

    if !quiet {
        eprintln!(
            "{} {} segments, {:.1}s → {}",
            "Done:".green().bold(),
            output.segments.len(),
            output.duration_secs,
            output.artifact_path.display()
        );
    }
    println!("{}", output.artifact_url);
    Ok(())
}

fn print_progress(progress: &SegmentProgress) {
    eprintln!(
        "  {} [{}] {:.1}s",
        format!("{}/{}", progress.index + 1, progress.total).dimmed(),
        progress.label.cyan(),
        progress.duration_secs
    );
}

fn handle_parse(script_path: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;
    let segments = parse_script(&raw)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    for (index, segment) in segments.iter().enumerate() {
        println!(
            "{:>3}  {}  {}",
            index,
            segment.format_offset().cyan(),
            segment.text()
        );
    }
    println!(
        "{} segments, last cue at {}",
        segments.len(),
        meditone::script::format_offset(script_duration_hint(&segments))
    );
    Ok(())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

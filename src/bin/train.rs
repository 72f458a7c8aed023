use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use maddpg_driver::checkpoint::{CheckpointManager, CheckpointManagerConfig, RunDescriptor};
use maddpg_driver::config::AppConfig;
use maddpg_driver::env::scenarios;
use maddpg_driver::render::{Camera, FfmpegWriter, FRAME_SIZE};
use maddpg_driver::trainer::build_random_trainers;
use maddpg_driver::training::{ControlLoop, RunOutcome, ShuffleMode};
use maddpg_driver::ui::TerminalViewer;

/// Train, benchmark, display or record multi-agent policies on a particle scenario.
#[derive(Parser)]
#[command(name = "train", about = "Reinforcement learning experiments for multiagent environments")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Name of the scenario script
    #[arg(long)]
    scenario: Option<String>,

    /// Maximum episode length
    #[arg(long)]
    max_episode_len: Option<usize>,

    /// Number of episodes
    #[arg(long)]
    num_episodes: Option<usize>,

    /// Number of adversaries
    #[arg(long)]
    num_adversaries: Option<usize>,

    /// Learning rate for Adam optimizer
    #[arg(long)]
    lr: Option<f64>,

    /// Discount factor
    #[arg(long)]
    gamma: Option<f64>,

    /// Number of episodes to optimize at the same time
    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of units in the mlp
    #[arg(long)]
    num_units: Option<usize>,

    /// Shuffle the agent roster every episode or every timestep
    #[arg(long, value_enum)]
    shuffle: Option<ShuffleMode>,

    /// Agents of the same side share one set of parameters
    #[arg(long)]
    shared: bool,

    /// Name of the experiment
    #[arg(long)]
    exp_name: Option<String>,

    /// Directory in which training state and model should be saved
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Save model once every time this many episodes are completed
    #[arg(long)]
    save_rate: Option<usize>,

    /// Directory in which training state and model are loaded
    #[arg(long)]
    load_dir: Option<PathBuf>,

    /// Restore the saved state before training
    #[arg(long)]
    restore: bool,

    /// Render the environment in the terminal
    #[arg(long)]
    display: bool,

    /// Evaluate saved policies and dump diagnostics instead of training
    #[arg(long)]
    benchmark: bool,

    /// Number of iterations run for benchmarking
    #[arg(long)]
    benchmark_iters: Option<u64>,

    /// Directory where benchmark data is saved
    #[arg(long)]
    benchmark_dir: Option<PathBuf>,

    /// Directory where plot data is saved
    #[arg(long)]
    plots_dir: Option<PathBuf>,

    /// Append every trainer's replay buffer to the benchmark file
    #[arg(long)]
    save_replay: bool,

    /// Deterministic policies seeded from --seed
    #[arg(long)]
    deterministic: bool,

    /// Record the first displayed episode to <PATH>.avi
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "recording")]
    record: Option<PathBuf>,

    /// Seed for the environment, trainers and roster shuffles
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        let env = &mut config.environment;
        if let Some(v) = self.scenario {
            env.scenario = v;
        }
        if let Some(v) = self.max_episode_len {
            env.max_episode_len = v;
        }
        if let Some(v) = self.num_episodes {
            env.num_episodes = v;
        }
        if let Some(v) = self.num_adversaries {
            env.num_adversaries = v;
        }

        let training = &mut config.training;
        if let Some(v) = self.lr {
            training.lr = v;
        }
        if let Some(v) = self.gamma {
            training.gamma = v;
        }
        if let Some(v) = self.batch_size {
            training.batch_size = v;
        }
        if let Some(v) = self.num_units {
            training.num_units = v;
        }
        if self.shuffle.is_some() {
            training.shuffle = self.shuffle;
        }
        training.shared |= self.shared;
        if self.seed.is_some() {
            training.seed = self.seed;
        }

        let checkpoint = &mut config.checkpoint;
        if let Some(v) = self.exp_name {
            checkpoint.exp_name = v;
        }
        if let Some(v) = self.save_dir {
            checkpoint.save_dir = v;
        }
        if let Some(v) = self.save_rate {
            checkpoint.save_rate = v;
        }
        if self.load_dir.is_some() {
            checkpoint.load_dir = self.load_dir;
        }
        checkpoint.restore |= self.restore;

        let eval = &mut config.evaluation;
        eval.display |= self.display;
        eval.benchmark |= self.benchmark;
        if let Some(v) = self.benchmark_iters {
            eval.benchmark_iters = v;
        }
        if let Some(v) = self.benchmark_dir {
            eval.benchmark_dir = v;
        }
        if let Some(v) = self.plots_dir {
            eval.plots_dir = v;
        }
        eval.save_replay |= self.save_replay;
        eval.deterministic |= self.deterministic;
        if self.record.is_some() {
            eval.record = self.record;
        }
    }
}

/// Logs go to stderr, or to a file while the terminal viewer owns the screen.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone();
    let config_found = config_path.exists();
    let mut config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    // Apply CLI overrides
    cli.apply(&mut config);
    config.validate().context("validating configuration")?;

    for dir in [&config.evaluation.benchmark_dir, &config.evaluation.plots_dir] {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let log_file = config
        .display()
        .then(|| config.evaluation.plots_dir.join(format!("{}.log", config.exp_name())));
    init_logging(log_file.as_deref())?;
    if !config_found {
        warn!(path = %config_path.display(), "config file not found, using defaults");
    }

    let outcome = run(&config)?;
    match outcome {
        RunOutcome::TrainingFinished {
            episodes,
            rewards_file,
            agrewards_file,
        } => {
            info!(
                episodes,
                rewards = %rewards_file.display(),
                agrewards = %agrewards_file.display(),
                "training finished"
            );
        }
        RunOutcome::BenchmarkFinished { path } => {
            println!("Benchmark data saved to {}", path.display());
        }
        RunOutcome::RecordingFinished { frames } => {
            if let Some(record) = &config.evaluation.record {
                let output = maddpg_driver::render::video::video_path(record);
                println!("Recorded {frames} frames to {}", output.display());
            }
        }
    }
    Ok(())
}

/// Build the environment, trainers and loop from `config` and run to completion.
/// The viewer, if any, is dropped (restoring the terminal) before returning.
fn run(config: &AppConfig) -> Result<RunOutcome> {
    let scenario = &config.environment.scenario;
    let env = scenarios::load(scenario, config.evaluation.benchmark, config.training.seed)
        .with_context(|| format!("loading scenario '{scenario}'"))?;

    let params = config.trainer_params();
    let mut trainers = build_random_trainers(&env, config.environment.num_adversaries, &params);
    info!(
        scenario = %scenario,
        agents = trainers.len(),
        adversaries = config.environment.num_adversaries,
        shared = params.shared,
        "trainers built"
    );

    if config.should_load() {
        let dir = config.load_dir();
        println!("Loading previous state...");
        let metadata = CheckpointManager::restore(dir, &mut trainers)
            .with_context(|| format!("loading checkpoint from {}", dir.display()))?;
        info!(
            train_step = metadata.train_step,
            episodes = metadata.episodes,
            "resuming from checkpoint"
        );
    }

    let manager = CheckpointManager::new(
        CheckpointManagerConfig {
            save_dir: config.checkpoint.save_dir.clone(),
        },
        RunDescriptor {
            scenario: scenario.clone(),
            exp_name: config.exp_name().to_string(),
            hyperparameters: params,
        },
    );

    let mut control = ControlLoop::new(env, trainers, config.loop_settings(), manager);
    if let Some(seed) = config.training.seed {
        control = control.with_seed(seed);
    }
    if let Some(record) = &config.evaluation.record {
        let writer = FfmpegWriter::open(record, FRAME_SIZE, FRAME_SIZE)
            .with_context(|| format!("opening video writer for {}", record.display()))?;
        control = control.with_recorder(Box::new(writer), Camera::new(FRAME_SIZE, FRAME_SIZE));
    }
    if config.display() {
        let viewer = TerminalViewer::stdout().context("opening terminal viewer")?;
        control = control.with_viewer(Box::new(viewer));
    }

    control.run().context("control loop failed")
}

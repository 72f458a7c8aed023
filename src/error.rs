use std::path::PathBuf;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no checkpoint metadata found in {0}")]
    MissingMetadata(PathBuf),

    #[error("checkpoint in {dir} has no state for trainer '{name}'")]
    MissingTrainer { dir: PathBuf, name: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to restore trainer '{name}': {reason}")]
    Restore { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by environments and the scenario registry.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("expected {expected} actions, got {got}")]
    ActionCount { expected: usize, got: usize },

    #[error("agent {agent} action has dimension {got}, expected {expected}")]
    ActionDim {
        agent: usize,
        expected: usize,
        got: usize,
    },
}

/// Errors writing benchmark traces and learning curves.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Pickle {
        path: PathBuf,
        source: serde_pickle::Error,
    },
}

/// Errors from the video recorder.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("failed to start encoder '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("frame is {got_w}x{got_h}, recorder expects {want_w}x{want_h}")]
    FrameSize {
        want_w: usize,
        want_h: usize,
        got_w: usize,
        got_h: usize,
    },

    #[error("encoder exited with {0}")]
    EncoderFailed(std::process::ExitStatus),

    #[error("recorder already closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a training or benchmark run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("viewer error: {0}")]
    Viewer(std::io::Error),

    #[error("trainer '{name}' failed: {reason}")]
    Trainer { name: String, reason: String },
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

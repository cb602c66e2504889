use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid track index {index} (have {len} tracks)")]
    InvalidTrack { index: usize, len: usize },

    #[error("invalid line index {index} (have {len} lines)")]
    InvalidLine { index: usize, len: usize },

    #[error("invalid beat index {index} (grid length {len})")]
    InvalidBeat { index: usize, len: usize },

    #[error("beat divisor must be >= 1, got {0}")]
    InvalidBeatDivisor(u64),

    #[error("invalid grid geometry {beats_per_bar}x{num_bars}")]
    InvalidGeometry { beats_per_bar: usize, num_bars: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to initialise MIDI client: {0}")]
    Init(String),

    #[error("failed to open output '{name}': {reason}")]
    Open { name: String, reason: String },

    #[error("failed to write to output '{name}': {reason}")]
    Write { name: String, reason: String },

    #[error("no open output named '{0}'")]
    Unregistered(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("config serialise error: {0}")]
    Serialize(#[from] ron::Error),
}
